/// User notifications.
///
/// The controller reports outcomes (logo added, export written, failures) as typed
/// [`Notification`]s over a channel; the front-end decides how to show them.
use std::fmt;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

/// Creates a notifier and the receiving end the front-end drains.
pub fn channel() -> (Notifier, mpsc::UnboundedReceiver<Notification>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Notifier { tx }, rx)
}

impl Notifier {
    pub fn notify(&self, level: Level, message: impl Into<String>) {
        let message = message.into();
        match level {
            Level::Error => error!(%message, "notification"),
            Level::Warning => warn!(%message, "notification"),
            Level::Info | Level::Success => info!(%message, "notification"),
        }
        // Nobody listening is fine.
        let _ = self.tx.send(Notification { level, message });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(Level::Info, message)
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(Level::Success, message)
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.notify(Level::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(Level::Error, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifications_are_delivered_in_order() {
        let (notifier, mut rx) = channel();
        notifier.success("Logo added successfully");
        notifier.warning("No QR code to download");

        let first = rx.try_recv().unwrap();
        assert_eq!(first.level, Level::Success);
        assert_eq!(first.to_string(), "[success] Logo added successfully");
        assert_eq!(rx.try_recv().unwrap().level, Level::Warning);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (notifier, rx) = channel();
        drop(rx);
        notifier.error("Failed to download QR code");
    }
}
