use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cancellation signal shared by every activity of a session.
///
/// Cancelling is idempotent and may be requested any number of times from
/// any number of threads.  Once cancelled a token can never be reset.
///
/// Note that this type is cheaply cloneable, all clones observe the same signal.
///
/// # Example
///
/// ```
/// use pinger_core::CancellationToken;
///
/// let token = CancellationToken::new();
/// let other = token.clone();
/// assert!(other.cancel());
/// assert!(!token.cancel());
/// assert!(token.is_cancelled());
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

struct Inner {
    cancelled: AtomicBool,
    signal: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        let (signal, receiver) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                signal: Mutex::new(Some(signal)),
                receiver,
            }),
        }
    }

    /// Request cancellation.
    ///
    /// Returns `true` if this call cancelled the token and `false` if it was
    /// already cancelled.
    pub fn cancel(&self) -> bool {
        let first = !self.inner.cancelled.swap(true, Ordering::AcqRel);
        if first {
            tracing::debug!("cancellation requested");
        }
        // dropping the sender disconnects the channel and wakes every waiting receiver
        drop(self.inner.signal.lock().take());
        first
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// A channel which becomes ready, by disconnecting, once the token is cancelled.
    ///
    /// No message is ever sent on this channel, it is intended to be used as
    /// one arm of a `crossbeam::select!`.
    #[must_use]
    pub fn receiver(&self) -> &Receiver<()> {
        &self.inner.receiver
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for CancellationToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::{after, select};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_cancel_is_idempotent() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.cancel());
        assert!(!token.cancel());
        assert!(!token.cancel());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancel_from_many_threads() {
        let token = CancellationToken::new();
        let handles = (0..8)
            .map(|_| {
                let token = token.clone();
                thread::spawn(move || token.cancel())
            })
            .collect::<Vec<_>>();
        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|first| *first)
            .count();
        assert_eq!(1, winners);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_receiver_ready_after_cancel() {
        let token = CancellationToken::new();
        assert!(token.receiver().try_recv().is_err());
        token.cancel();
        let woken = select! {
            recv(token.receiver()) -> _ => true,
            recv(after(Duration::from_secs(5))) -> _ => false,
        };
        assert!(woken);
    }

    #[test]
    fn test_cancel_wakes_waiting_thread() {
        let token = CancellationToken::new();
        let waiter = {
            let token = token.clone();
            thread::spawn(move || token.receiver().recv().is_err())
        };
        thread::sleep(Duration::from_millis(20));
        token.cancel();
        assert!(waiter.join().unwrap());
    }
}
