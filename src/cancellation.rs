//! Minimal cancellation signal: a hand-rolled watch-backed token
//! rather than pulling in `tokio-util` for one type.

use tokio::sync::watch;

/// A cooperative cancellation signal. Cloning shares the same underlying
/// flag; any clone's [`CancellationToken::cancel`] is observed by every
/// other clone's [`CancellationToken::is_cancelled`].
#[derive(Clone)]
pub struct CancellationToken {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Intended for use inside `tokio::select!`
    /// alongside the dispatcher call it should interrupt.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
