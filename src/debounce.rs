/// Debouncing of input edits.
///
/// Values pushed into a [`Debouncer`] are held until no new value has arrived for
/// the quiescence window; then only the last one is emitted. A burst of keystrokes
/// therefore yields a single format-and-render cycle.
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

/// Quiescence window for form edits.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

/// Sending half of a debounced channel.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Debouncer<T> {
    /// Queues `value`, restarting the window. Returns false once the output side
    /// has been dropped.
    pub fn push(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

/// Spawns the debouncing task on the current runtime and returns its input and
/// output ends. A pending value is flushed when every [`Debouncer`] is dropped.
pub fn debounce<T: Send + 'static>(window: Duration) -> (Debouncer<T>, mpsc::UnboundedReceiver<T>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<T>();
    let (out_tx, out_rx) = mpsc::unbounded_channel::<T>();

    tokio::spawn(async move {
        while let Some(mut latest) = rx.recv().await {
            let closed = loop {
                tokio::select! {
                    next = rx.recv() => match next {
                        Some(value) => latest = value,
                        None => break true,
                    },
                    _ = sleep(window) => break false,
                }
            };
            if out_tx.send(latest).is_err() || closed {
                return;
            }
        }
    });

    (Debouncer { tx }, out_rx)
}
