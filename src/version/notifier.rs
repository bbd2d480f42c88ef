use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use tracing::debug;

use crate::github::HostError;

/// A fire-and-forget update check running on its own thread.
///
/// Nothing here ever blocks the caller: [`UpdateNotifier::try_message`] only
/// returns a message that is already available, and the thread is never
/// joined. Errors from the check are logged at debug level and dropped.
pub struct UpdateNotifier {
    rx: Receiver<String>,
    cancelled: Arc<AtomicBool>,
}

impl UpdateNotifier {
    pub fn spawn<F>(check: F) -> Self
    where
        F: FnOnce() -> Result<Option<String>, HostError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let spawned = thread::Builder::new()
            .name("update-check".into())
            .spawn(move || match check() {
                Ok(Some(msg)) if !flag.load(Ordering::SeqCst) => {
                    let _ = tx.send(msg);
                }
                Ok(_) => {}
                Err(e) => debug!(error = %e, "update check failed"),
            });
        if let Err(e) = spawned {
            debug!(error = %e, "could not start update check");
        }

        Self { rx, cancelled }
    }

    /// Discard whatever the check produces from now on.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// The advisory message, if the check has already finished with one.
    pub fn try_message(&self) -> Option<String> {
        if self.cancelled.load(Ordering::SeqCst) {
            return None;
        }
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn wait_for(n: &UpdateNotifier) -> Option<String> {
        for _ in 0..200 {
            if let Some(m) = n.try_message() {
                return Some(m);
            }
            thread::sleep(Duration::from_millis(10));
        }
        None
    }

    #[test]
    fn delivers_message_once_ready() {
        let n = UpdateNotifier::spawn(|| Ok(Some("new version".to_string())));
        assert_eq!(wait_for(&n).as_deref(), Some("new version"));
    }

    #[test]
    fn errors_are_swallowed() {
        let n = UpdateNotifier::spawn(|| Err(HostError::NotFound("releases/latest".into())));
        assert_eq!(wait_for(&n), None);
    }

    #[test]
    fn does_not_block_on_slow_check() {
        let n = UpdateNotifier::spawn(|| {
            thread::sleep(Duration::from_secs(5));
            Ok(Some("late".to_string()))
        });
        assert_eq!(n.try_message(), None);
    }

    #[test]
    fn cancelled_notifier_reports_nothing() {
        let n = UpdateNotifier::spawn(|| Ok(Some("new version".to_string())));
        n.cancel();
        assert_eq!(wait_for(&n), None);
    }
}
