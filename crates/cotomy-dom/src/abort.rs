//! AbortController / AbortSignal
//!
//! A signal can be checked synchronously or awaited. Awaiting resolves
//! once the owning controller aborts; a controller dropped without
//! aborting leaves the wait pending forever.

use std::cell::Cell;
use std::rc::Rc;

use smol::channel::{Receiver, Sender, bounded};

/// Owner side of an abort signal
#[derive(Debug)]
pub struct AbortController {
    signal: AbortSignal,
    sender: Sender<()>,
}

#[derive(Debug)]
struct SignalState {
    aborted: Cell<bool>,
    receiver: Receiver<()>,
}

/// Observer side; clones share state and compare by identity
#[derive(Debug, Clone)]
pub struct AbortSignal {
    state: Rc<SignalState>,
}

impl AbortController {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(1);
        Self {
            signal: AbortSignal {
                state: Rc::new(SignalState {
                    aborted: Cell::new(false),
                    receiver,
                }),
            },
            sender,
        }
    }

    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Abort; repeated calls are no-ops
    pub fn abort(&self) {
        if self.signal.state.aborted.replace(true) {
            return;
        }
        tracing::debug!("AbortController aborted");
        self.sender.close();
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        self.state.aborted.get()
    }

    /// Resolve once the signal is aborted
    pub async fn aborted(&self) {
        if self.is_aborted() {
            return;
        }
        // recv only returns once the channel is closed
        let _ = self.state.receiver.recv().await;
        if !self.is_aborted() {
            smol::future::pending::<()>().await;
        }
    }
}

impl PartialEq for AbortSignal {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl Eq for AbortSignal {}

#[cfg(test)]
mod tests {
    use super::*;
    use smol::future::FutureExt;

    #[test]
    fn test_abort_flag_and_identity() {
        let controller = AbortController::new();
        let a = controller.signal();
        let b = controller.signal();
        assert_eq!(a, b);
        assert_ne!(a, AbortController::new().signal());

        assert!(!a.is_aborted());
        controller.abort();
        controller.abort();
        assert!(b.is_aborted());
    }

    #[test]
    fn test_aborted_future_resolves() {
        let controller = AbortController::new();
        let signal = controller.signal();
        let result = smol::block_on(async {
            let wait = async {
                signal.aborted().await;
                true
            };
            let trigger = async {
                smol::future::yield_now().await;
                controller.abort();
                smol::future::pending::<bool>().await
            };
            wait.or(trigger).await
        });
        assert!(result);
    }

    #[test]
    fn test_dropped_controller_does_not_abort() {
        let signal = AbortController::new().signal();
        let result = smol::block_on(async {
            let wait = async {
                signal.aborted().await;
                "aborted"
            };
            let other = async { "ready" };
            wait.or(other).await
        });
        assert_eq!(result, "ready");
        assert!(!signal.is_aborted());
    }
}
