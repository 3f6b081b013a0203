//! User-facing error surface

use tracing::error;

/// Shows an error message to whoever is watching the stream
pub trait UserNotifier: Send + Sync {
    fn alert(&self, message: &str);
}

impl<F> UserNotifier for F
where
    F: Fn(&str) + Send + Sync,
{
    fn alert(&self, message: &str) {
        self(message)
    }
}

/// Notifier for headless hosts: the alert goes to the error log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl UserNotifier for LogNotifier {
    fn alert(&self, message: &str) {
        error!("{}", message);
    }
}
