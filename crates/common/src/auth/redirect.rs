//! Redirect-URL parsing
//!
//! The provider hands the authorization code back as a `code` query
//! parameter on whichever callback URL the browser lands on. Capture
//! strategies feed candidate URLs through [`extract_auth_code`]; anything
//! unparseable is simply not a match.

use url::Url;

/// Extract `code` and `state` from a redirect URL
///
/// Returns `(None, None)` unless the literal substring `code=` is present.
/// Parse failures and empty parameter values also yield absent rather than
/// an error; capture loops treat every URL as a candidate.
#[must_use]
pub fn extract_auth_code(url: &str) -> (Option<String>, Option<String>) {
    if !url.contains("code=") {
        return (None, None);
    }

    let Ok(parsed) = Url::parse(url) else {
        return (None, None);
    };

    let mut code = None;
    let mut state = None;
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "code" if code.is_none() => code = Some(value.into_owned()),
            "state" if state.is_none() => state = Some(value.into_owned()),
            _ => {}
        }
    }

    (code.filter(|c| !c.is_empty()), state.filter(|s| !s.is_empty()))
}
