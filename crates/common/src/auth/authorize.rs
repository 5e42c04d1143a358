//! Authorization-request assembly
//!
//! Builds the query string for the provider's authorization endpoint. Field
//! order and encoding are part of the de-facto wire contract: the provider
//! has been observed to reject requests without the trailing space in
//! `scope`, and it accepts an empty `redirect_uri`.

use super::challenge::ChallengeSet;

/// Scope requested on every authorization. The trailing space is deliberate.
pub const OAUTH_SCOPE: &str = "openid ";

/// Build the URL-encoded query for the authorization endpoint
///
/// Pure function; the same challenge set always yields the same query.
#[must_use]
pub fn build_authorization_query(
    challenge: &ChallengeSet,
    client_id: &str,
    redirect_uri: &str,
) -> String {
    let params = [
        ("response_type", "code"),
        ("client_id", client_id),
        ("state", challenge.state.as_str()),
        ("redirect_uri", redirect_uri),
        ("scope", OAUTH_SCOPE),
        ("code_challenge", challenge.code_challenge.as_str()),
        ("code_challenge_method", challenge.challenge_method()),
        ("nonce", challenge.nonce.as_str()),
    ];

    params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Join the authorization query onto the configured endpoint
#[must_use]
pub fn build_authorization_url(
    authorize_endpoint: &str,
    challenge: &ChallengeSet,
    client_id: &str,
    redirect_uri: &str,
) -> String {
    format!(
        "{authorize_endpoint}?{}",
        build_authorization_query(challenge, client_id, redirect_uri)
    )
}
