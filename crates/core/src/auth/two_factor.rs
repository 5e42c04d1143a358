//! Two-factor code hand-off
//!
//! When the identity provider demands a one-time code mid-flow, the browser
//! side of the attempt blocks while an out-of-band caller (API handler,
//! operator console) supplies the code. The gateway keys every hand-off by
//! attempt id, so concurrent attempts can wait without ever receiving each
//! other's codes.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use schulgate_domain::{AttemptId, Result, SchulgateError};
use tokio::sync::oneshot;

/// Keyed registry of attempts currently waiting for a one-time code
#[derive(Debug, Default)]
pub struct TwoFactorGateway {
    pending: Mutex<HashMap<AttemptId, oneshot::Sender<String>>>,
}

impl TwoFactorGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt ids currently blocked on a code.
    pub fn pending(&self) -> Result<Vec<AttemptId>> {
        Ok(self.lock()?.keys().copied().collect())
    }

    /// Whether the given attempt is waiting for a code right now.
    pub fn is_pending(&self, attempt_id: AttemptId) -> Result<bool> {
        Ok(self.lock()?.contains_key(&attempt_id))
    }

    /// Deliver a code to a waiting attempt.
    ///
    /// Fails when no attempt with this id is waiting, which covers both
    /// unknown ids and codes submitted after the wait timed out.
    pub fn submit(&self, attempt_id: AttemptId, code: impl Into<String>) -> Result<()> {
        let sender = self.lock()?.remove(&attempt_id).ok_or_else(|| {
            SchulgateError::TwoFactorChannel(format!(
                "no attempt waiting for a two-factor code under id {attempt_id}"
            ))
        })?;

        sender.send(code.into()).map_err(|_| {
            SchulgateError::TwoFactorChannel(format!(
                "attempt {attempt_id} stopped waiting before the code arrived"
            ))
        })
    }

    /// Block the calling attempt until a code arrives or the timeout lapses.
    ///
    /// The registration is removed on every exit path, so a late `submit`
    /// after a timeout reports "no attempt waiting" instead of feeding a
    /// dead channel.
    pub async fn wait(&self, attempt_id: AttemptId, timeout: Duration) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.lock()?;
            if pending.contains_key(&attempt_id) {
                return Err(SchulgateError::TwoFactorChannel(format!(
                    "attempt {attempt_id} is already waiting for a two-factor code"
                )));
            }
            pending.insert(attempt_id, tx);
        }

        let outcome = tokio::time::timeout(timeout, rx).await;

        // Drop a leftover registration regardless of how the wait ended.
        let _ = self.lock()?.remove(&attempt_id);

        match outcome {
            Ok(Ok(code)) => Ok(code),
            Ok(Err(_)) => Err(SchulgateError::TwoFactorChannel(format!(
                "two-factor channel for attempt {attempt_id} closed without a code"
            ))),
            Err(_) => Err(SchulgateError::TwoFactorTimeout(format!(
                "no two-factor code arrived for attempt {attempt_id} within {}s",
                timeout.as_secs()
            ))),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<AttemptId, oneshot::Sender<String>>>> {
        self.pending
            .lock()
            .map_err(|_| SchulgateError::Internal("two-factor registry lock poisoned".into()))
    }
}
