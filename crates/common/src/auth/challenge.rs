//! PKCE (Proof Key for Code Exchange) challenge material
//!
//! Implements RFC 7636 for secure OAuth authorization without client secrets.
//! The Schulnetz provider takes the verifier at the maximum RFC length of 128
//! characters, drawn from the alphanumeric charset, and expects a matching
//! 32-character `state` and `nonce` on the authorization request.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

/// Code verifier length sent to the provider (RFC 7636 maximum)
pub const CODE_VERIFIER_LENGTH: usize = 128;
/// Length of the CSRF `state` value
pub const STATE_LENGTH: usize = 32;
/// Length of the OpenID Connect `nonce` value
pub const NONCE_LENGTH: usize = 32;
/// Challenge method advertised on the authorization request
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// Generate a random string of `length` characters from `[A-Za-z0-9]`
///
/// Uses the thread-local CSPRNG; suitable for verifier/state/nonce material.
pub fn generate_random_string(length: usize) -> String {
    thread_rng().sample_iter(&Alphanumeric).take(length).map(char::from).collect()
}

/// Generate code challenge from verifier using SHA256
///
/// Per RFC 7636, the challenge is BASE64URL(SHA256(ASCII(code_verifier)))
/// without padding.
pub fn generate_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Challenge material for one authorization attempt
///
/// Created once per attempt and discarded after token exchange. The verifier
/// never leaves the process except inside the token-exchange request body.
#[derive(Debug, Clone)]
pub struct ChallengeSet {
    /// Random secret, 128 alphanumeric chars, kept until token exchange
    pub code_verifier: String,

    /// SHA256 hash of `code_verifier` (base64url, no padding)
    /// Sent in the authorization request for server validation
    pub code_challenge: String,

    /// Random CSRF protection token echoed back by the provider
    pub state: String,

    /// Replay-protection value for OpenID Connect
    pub nonce: String,
}

impl ChallengeSet {
    /// Generate a fresh challenge set with cryptographically secure random
    /// values
    ///
    /// # Examples
    /// ```
    /// use schulgate_common::auth::challenge::ChallengeSet;
    ///
    /// let challenge = ChallengeSet::generate();
    /// assert_eq!(challenge.code_verifier.len(), 128);
    /// assert_eq!(challenge.state.len(), 32);
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = generate_random_string(CODE_VERIFIER_LENGTH);
        let code_challenge = generate_code_challenge(&code_verifier);
        let state = generate_random_string(STATE_LENGTH);
        let nonce = generate_random_string(NONCE_LENGTH);

        Self { code_verifier, code_challenge, state, nonce }
    }

    /// Get the challenge method (always "S256" for SHA256)
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        CODE_CHALLENGE_METHOD
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::challenge.
    use regex::Regex;

    use super::*;

    /// Validates `ChallengeSet::generate` behavior for the field length
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `challenge.code_verifier.len()` equals `128`.
    /// - Confirms `challenge.state.len()` equals `32`.
    /// - Confirms `challenge.nonce.len()` equals `32`.
    /// - Ensures `!challenge.code_challenge.is_empty()` evaluates to true.
    #[test]
    fn test_generate_challenge_set_lengths() {
        let challenge = ChallengeSet::generate();

        assert_eq!(challenge.code_verifier.len(), CODE_VERIFIER_LENGTH);
        assert_eq!(challenge.state.len(), STATE_LENGTH);
        assert_eq!(challenge.nonce.len(), NONCE_LENGTH);
        assert!(!challenge.code_challenge.is_empty());
    }

    /// Validates `generate_random_string` behavior for the charset scenario.
    ///
    /// Assertions:
    /// - Ensures every output over 1000 trials matches `^[A-Za-z0-9]{n}$`.
    #[test]
    fn test_random_string_charset() {
        let pattern = Regex::new("^[A-Za-z0-9]{32}$").unwrap();

        for _ in 0..1000 {
            let value = generate_random_string(32);
            assert!(pattern.is_match(&value), "unexpected characters in: {value}");
        }
    }

    /// Validates `ChallengeSet::generate` behavior for the unique challenges
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `challenge1.code_verifier` differs from
    ///   `challenge2.code_verifier`.
    /// - Confirms `challenge1.state` differs from `challenge2.state`.
    /// - Confirms `challenge1.nonce` differs from `challenge2.nonce`.
    #[test]
    fn test_unique_challenges() {
        // Each generation should produce unique values
        let challenge1 = ChallengeSet::generate();
        let challenge2 = ChallengeSet::generate();

        assert_ne!(challenge1.code_verifier, challenge2.code_verifier);
        assert_ne!(challenge1.state, challenge2.state);
        assert_ne!(challenge1.nonce, challenge2.nonce);
    }

    /// Validates `generate_code_challenge` behavior for the known fixture
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the all-`'A'` verifier of length 128 maps to its
    ///   precomputed challenge string.
    #[test]
    fn test_code_challenge_known_fixture() {
        let verifier = "A".repeat(128);
        let challenge = generate_code_challenge(&verifier);

        assert_eq!(challenge, "tqw8wQOGMxx2XwTwQcFH0PJ48q7Y6qAh4tAFf8b2_54");
    }

    /// Validates `generate_code_challenge` behavior for the base64url
    /// encoding scenario.
    ///
    /// Assertions:
    /// - Ensures `!challenge.code_challenge.contains('=')` evaluates to true.
    /// - Ensures `!challenge.code_challenge.contains('+')` evaluates to true.
    /// - Ensures `!challenge.code_challenge.contains('/')` evaluates to true.
    #[test]
    fn test_base64url_encoding() {
        let challenge = ChallengeSet::generate();

        // Verify no padding characters (base64url should not have padding)
        assert!(!challenge.code_challenge.contains('='));

        // Verify URL-safe characters only (no + or /)
        assert!(!challenge.code_challenge.contains('+'));
        assert!(!challenge.code_challenge.contains('/'));
    }

    /// Validates `generate_code_challenge` behavior for the deterministic
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `challenge.code_challenge` equals `recomputed`.
    #[test]
    fn test_code_challenge_deterministic() {
        // Same verifier should produce same challenge
        let challenge = ChallengeSet::generate();
        let recomputed = generate_code_challenge(&challenge.code_verifier);

        assert_eq!(challenge.code_challenge, recomputed);
    }
}
