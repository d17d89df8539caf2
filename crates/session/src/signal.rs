//! Start/stop and push-ready signalling between the stepper and push workers
//!
//! One [`CalcSignal`] is created per run. The stepper side gets a
//! [`StepNotifier`], the push side a [`PushListener`]. The push-ready channel
//! holds at most one pending notification, so a slow pusher throttles the
//! stepper instead of queueing stale snapshots.

use tokio::sync::{mpsc, watch};

/// Controller half, kept by the hub for the lifetime of a run.
#[derive(Debug)]
pub struct CalcSignal {
    stop_tx: watch::Sender<bool>,
}

/// Stepper half: checks for stop and announces finished steps.
#[derive(Debug)]
pub struct StepNotifier {
    stop_rx: watch::Receiver<bool>,
    ready_tx: mpsc::Sender<()>,
}

/// Push half: waits for the next finished step or for stop.
#[derive(Debug)]
pub struct PushListener {
    stop_rx: watch::Receiver<bool>,
    ready_rx: mpsc::Receiver<()>,
}

impl CalcSignal {
    /// Create a fresh signal set for one run.
    pub fn start() -> (Self, StepNotifier, PushListener) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = mpsc::channel(1);
        (
            Self { stop_tx },
            StepNotifier {
                stop_rx: stop_rx.clone(),
                ready_tx,
            },
            PushListener { stop_rx, ready_rx },
        )
    }

    /// Ask both workers to finish.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }
}

impl StepNotifier {
    pub fn is_stopped(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Announce a finished step, blocking while a previous one is still pending.
    ///
    /// Must be called from a blocking thread. Returns `false` once the run is
    /// stopped or the push side has gone away.
    pub fn push_ready_blocking(&self) -> bool {
        if self.is_stopped() {
            return false;
        }
        self.ready_tx.blocking_send(()).is_ok()
    }
}

impl PushListener {
    /// Wait for the next push-ready notification.
    ///
    /// Returns `false` once stop has been signalled.
    pub async fn next(&mut self) -> bool {
        loop {
            if *self.stop_rx.borrow() {
                return false;
            }
            tokio::select! {
                changed = self.stop_rx.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
                ready = self.ready_rx.recv() => return ready.is_some(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_then_stop() {
        let (signal, notifier, mut listener) = CalcSignal::start();

        let stepper = tokio::task::spawn_blocking(move || notifier.push_ready_blocking());
        assert!(stepper.await.unwrap());
        assert!(listener.next().await);

        signal.stop();
        assert!(signal.is_stopped());
        assert!(!listener.next().await);
    }

    #[tokio::test]
    async fn test_stop_releases_blocked_stepper() {
        let (signal, notifier, mut listener) = CalcSignal::start();

        let stepper = tokio::task::spawn_blocking(move || {
            // The first fills the slot, the second blocks until the listener drops
            let first = notifier.push_ready_blocking();
            let second = notifier.push_ready_blocking();
            (first, second)
        });

        signal.stop();
        assert!(!listener.next().await);
        drop(listener);

        // The first notification may or may not have raced the stop
        let (_, second) = stepper.await.unwrap();
        assert!(!second);
    }
}
