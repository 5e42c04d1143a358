//! CSRF state validation
//!
//! The provider usually echoes the `state` back verbatim, but the Microsoft
//! login layer sometimes wraps it in a composite value: an opaque hash
//! prefix followed by the base64-encoded original request parameters. The
//! prefix length varies, so candidate split points are scanned until one
//! decodes to parameters carrying the expected `state`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Shortest observed opaque prefix in a composite state value
pub const STATE_SPLIT_MIN: usize = 32;
/// Upper bound (exclusive) for the opaque prefix length
pub const STATE_SPLIT_MAX: usize = 64;

/// Outcome of comparing an expected state against the received value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOutcome {
    /// Received value equals the expected state
    DirectMatch,
    /// Expected state was recovered from a composite value
    CompositeMatch,
    /// Provider sent no state at all
    Missing,
    /// A state arrived but did not match in any form
    Mismatch,
}

impl StateOutcome {
    /// Whether this outcome counts as a successful validation.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::DirectMatch | Self::CompositeMatch)
    }
}

/// Compare the expected state against the received value
///
/// Direct equality wins. Otherwise, values longer than a plain hash are
/// scanned for an embedded base64 suffix whose decoded parameters contain
/// `state=<expected>`.
#[must_use]
pub fn check_state(expected: &str, received: Option<&str>) -> StateOutcome {
    let Some(received) = received else {
        return StateOutcome::Missing;
    };
    if received.is_empty() {
        return StateOutcome::Missing;
    }

    if received == expected {
        return StateOutcome::DirectMatch;
    }

    // Composite values are longer than a typical hash; shorter strings
    // cannot embed a base64 payload worth scanning.
    if received.len() > STATE_SPLIT_MAX && composite_contains_state(expected, received) {
        return StateOutcome::CompositeMatch;
    }

    StateOutcome::Mismatch
}

/// Boolean view of [`check_state`] for callers that only branch on validity
#[must_use]
pub fn validate_state(expected: &str, received: Option<&str>) -> bool {
    check_state(expected, received).is_valid()
}

fn composite_contains_state(expected: &str, received: &str) -> bool {
    let bytes = received.as_bytes();

    for split_point in STATE_SPLIT_MIN..STATE_SPLIT_MAX.min(bytes.len()) {
        let Ok(decoded) = STANDARD.decode(&bytes[split_point..]) else {
            continue;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            continue;
        };
        if !decoded.contains("state=") {
            continue;
        }

        let extracted = url::form_urlencoded::parse(decoded.as_bytes())
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned());

        if extracted.as_deref() == Some(expected) {
            return true;
        }
    }

    false
}
