//! Chromium-backed browser sessions
//!
//! Implements the core browser port over chromiumoxide (Chrome DevTools
//! Protocol). Each launched session owns its own browser process with a
//! fresh profile; nothing is shared between attempts.

pub mod chromium;
pub mod launcher;

use std::fmt::Display;

use schulgate_domain::SchulgateError;

pub use chromium::{ChromiumProvider, ChromiumSession};

/// Map any CDP-layer failure onto the domain browser error.
pub(crate) fn browser_err(err: impl Display) -> SchulgateError {
    SchulgateError::Browser(err.to_string())
}
