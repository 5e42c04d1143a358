//! Privacy redaction helpers
//!
//! Failure reports and log lines carry a user identifier; only a redacted
//! form ever leaves the process.

/// Redact the local part of an email address, keeping the first two
/// characters and the full domain: `ab***@example.com`.
///
/// Values without an `@` are treated as opaque identifiers and redacted the
/// same way, without a domain suffix.
#[must_use]
pub fn redact_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let prefix: String = local.chars().take(2).collect();
            format!("{prefix}***@{domain}")
        }
        None => {
            let prefix: String = email.chars().take(2).collect();
            format!("{prefix}***")
        }
    }
}
