#![allow(clippy::redundant_pub_crate)]

use tokio::sync::oneshot;

pub(crate) type ShutdownAck = oneshot::Sender<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShutdownState {
    Active,
    Draining,
    Closed,
}

/// What the caller must do after registering a shutdown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShutdownDecision {
    /// Queue is empty: release resources and call [`ShutdownCoordinator::finalize`].
    FinalizeNow,
    /// Finalisation happens once the queue drains.
    Deferred,
    /// Already closed; the acknowledgement has been sent.
    AlreadyClosed,
}

/// Tracks shutdown progress and the callers waiting for it.
#[derive(Debug)]
pub(crate) struct ShutdownCoordinator {
    state: ShutdownState,
    waiters: Vec<ShutdownAck>,
}

impl ShutdownCoordinator {
    pub(crate) const fn new() -> Self {
        Self {
            state: ShutdownState::Active,
            waiters: Vec::new(),
        }
    }

    pub(crate) fn request(&mut self, ack: Option<ShutdownAck>, queue_empty: bool) -> ShutdownDecision {
        if self.state == ShutdownState::Closed {
            if let Some(ack) = ack {
                let _ = ack.send(());
            }
            return ShutdownDecision::AlreadyClosed;
        }
        self.waiters.extend(ack);
        if self.state == ShutdownState::Draining {
            return ShutdownDecision::Deferred;
        }
        if queue_empty {
            ShutdownDecision::FinalizeNow
        } else {
            self.state = ShutdownState::Draining;
            ShutdownDecision::Deferred
        }
    }

    pub(crate) fn is_draining(&self) -> bool {
        self.state == ShutdownState::Draining
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state == ShutdownState::Closed
    }

    /// Enter the terminal state and acknowledge every waiter. Call after the
    /// stream has been released.
    pub(crate) fn finalize(&mut self) -> usize {
        self.state = ShutdownState::Closed;
        let waiters = std::mem::take(&mut self.waiters);
        let count = waiters.len();
        for ack in waiters {
            let _ = ack.send(());
        }
        count
    }

    #[cfg(test)]
    pub(crate) const fn state(&self) -> ShutdownState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_queue_finalizes_immediately() {
        let mut shutdown = ShutdownCoordinator::new();
        let (tx, mut rx) = oneshot::channel();
        assert_eq!(shutdown.request(Some(tx), true), ShutdownDecision::FinalizeNow);
        assert!(rx.try_recv().is_err());
        assert_eq!(shutdown.finalize(), 1);
        assert!(rx.try_recv().is_ok());
        assert!(shutdown.is_closed());
    }

    #[test]
    fn busy_queue_drains_first() {
        let mut shutdown = ShutdownCoordinator::new();
        let (tx, mut rx) = oneshot::channel();
        assert_eq!(shutdown.request(Some(tx), false), ShutdownDecision::Deferred);
        assert_eq!(shutdown.state(), ShutdownState::Draining);
        assert!(shutdown.is_draining());
        assert!(rx.try_recv().is_err());
        shutdown.finalize();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn reentrant_requests_join_the_same_finalisation() {
        let mut shutdown = ShutdownCoordinator::new();
        let (first, mut first_rx) = oneshot::channel();
        let (second, mut second_rx) = oneshot::channel();
        shutdown.request(Some(first), false);
        assert_eq!(shutdown.request(Some(second), true), ShutdownDecision::Deferred);
        assert_eq!(shutdown.state(), ShutdownState::Draining);
        assert_eq!(shutdown.finalize(), 2);
        assert!(first_rx.try_recv().is_ok());
        assert!(second_rx.try_recv().is_ok());
    }

    #[test]
    fn requests_after_close_are_acknowledged_at_once() {
        let mut shutdown = ShutdownCoordinator::new();
        shutdown.request(None, true);
        shutdown.finalize();
        let (tx, mut rx) = oneshot::channel();
        assert_eq!(shutdown.request(Some(tx), false), ShutdownDecision::AlreadyClosed);
        assert!(rx.try_recv().is_ok());
        assert_eq!(shutdown.state(), ShutdownState::Closed);
    }
}
