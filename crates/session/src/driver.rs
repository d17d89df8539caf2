//! Stepper worker
//!
//! Runs on a blocking thread. Each iteration takes the field write lock,
//! applies any pending tail request, advances the stepper once and then
//! notifies the push worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use caster_sim_core::{CastingParameters, FieldStore, SliceStepper, StepOutcome, StoreError};
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, error, info};

use crate::error::SessionError;
use crate::protocol::origin;
use crate::signal::StepNotifier;

/// Events raised by the run workers, tagged with the run they belong to.
#[derive(Debug)]
pub(crate) enum WorkerEvent {
    /// Tail casting drained the field
    Exhausted { run: u64 },
    /// The stepper reported a store error
    StepFailed { run: u64, error: StoreError },
    /// The push worker hit a fatal error
    PushFailed { run: u64, error: SessionError },
    /// A worker unwound without returning; `worker` is its [`origin`] tag
    Panicked { run: u64, worker: &'static str },
}

impl WorkerEvent {
    pub(crate) fn run(&self) -> u64 {
        match self {
            WorkerEvent::Exhausted { run }
            | WorkerEvent::StepFailed { run, .. }
            | WorkerEvent::PushFailed { run, .. }
            | WorkerEvent::Panicked { run, .. } => *run,
        }
    }
}

/// Sends [`WorkerEvent::Panicked`] if dropped before [`disarm`](Self::disarm).
///
/// Workers create one on entry and disarm it on every normal exit, so a
/// panic anywhere in between still reaches the hub.
pub(crate) struct ExitReporter {
    run: u64,
    worker: &'static str,
    events: mpsc::UnboundedSender<WorkerEvent>,
    armed: bool,
}

impl ExitReporter {
    pub(crate) fn new(run: u64, worker: &'static str, events: mpsc::UnboundedSender<WorkerEvent>) -> Self {
        Self {
            run,
            worker,
            events,
            armed: true,
        }
    }

    pub(crate) fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ExitReporter {
    fn drop(&mut self) {
        if self.armed {
            error!("{} worker of run {} exited abnormally", self.worker, self.run);
            let _ = self.events.send(WorkerEvent::Panicked {
                run: self.run,
                worker: self.worker,
            });
        }
    }
}

pub(crate) struct DriverContext {
    pub run: u64,
    pub field: Arc<RwLock<FieldStore>>,
    pub params: watch::Receiver<CastingParameters>,
    /// Set by a deferred `tail` command, consumed at the next step
    pub tail_request: Arc<AtomicBool>,
    pub notifier: StepNotifier,
    pub events: mpsc::UnboundedSender<WorkerEvent>,
}

/// Step until stopped, exhausted or failed; hands the stepper back.
pub(crate) fn run_driver(mut stepper: Box<dyn SliceStepper>, ctx: DriverContext) -> Box<dyn SliceStepper> {
    let reporter = ExitReporter::new(ctx.run, origin::STEP, ctx.events.clone());
    let mut steps: u64 = 0;
    info!("Stepper started (run {})", ctx.run);

    while !ctx.notifier.is_stopped() {
        let params = *ctx.params.borrow();
        let outcome = {
            let mut field = ctx.field.blocking_write();
            if ctx.tail_request.swap(false, Ordering::AcqRel) {
                field.set_tail(true);
                info!("Tail casting engaged at step {}", steps);
            }
            stepper.step(&params, &mut field)
        };

        match outcome {
            Ok(StepOutcome::Advanced) => {
                steps += 1;
                if !ctx.notifier.push_ready_blocking() {
                    break;
                }
            }
            Ok(StepOutcome::Exhausted) => {
                info!("Field drained after {} steps", steps);
                let _ = ctx.events.send(WorkerEvent::Exhausted { run: ctx.run });
                break;
            }
            Err(err) => {
                error!("Stepper failed after {} steps: {}", steps, err);
                let _ = ctx.events.send(WorkerEvent::StepFailed {
                    run: ctx.run,
                    error: err,
                });
                break;
            }
        }
    }

    debug!("Stepper finished (run {}, {} steps)", ctx.run, steps);
    reporter.disarm();
    stepper
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::CalcSignal;
    use caster_sim_core::Geometry;
    use std::sync::Mutex;
    use std::time::Duration;

    /// How the recording stepper raises tail casting during its run
    #[derive(Clone, Copy)]
    enum TailAt {
        Never,
        /// Through the deferred request flag, as the hub does for `NextStep`
        Request(usize),
        /// Through the field write lock, as the hub does for `Immediate`
        Lock(usize),
    }

    /// Appends one slice per step, drains in tail mode and records the tail
    /// flag it sees on entry. The tail command is raised from inside the
    /// chosen step, so it always lands while that step is in flight.
    struct RecordingStepper {
        seen: Arc<Mutex<Vec<bool>>>,
        field: Arc<RwLock<FieldStore>>,
        tail_request: Arc<AtomicBool>,
        tail_at: TailAt,
    }

    impl SliceStepper for RecordingStepper {
        fn configure(&mut self, _geometry: &Geometry, _params: &CastingParameters) {}

        fn step(&mut self, params: &CastingParameters, field: &mut FieldStore) -> Result<StepOutcome, StoreError> {
            let step = {
                let mut seen = self.seen.lock().unwrap();
                seen.push(field.is_tail());
                seen.len()
            };
            match self.tail_at {
                TailAt::Request(at) if at == step => self.tail_request.store(true, Ordering::Release),
                TailAt::Lock(at) if at == step => {
                    let shared = Arc::clone(&self.field);
                    std::thread::spawn(move || shared.blocking_write().set_tail(true));
                    // Let the writer queue up behind this step's guard
                    std::thread::sleep(Duration::from_millis(50));
                }
                _ => {}
            }

            if field.is_tail() {
                if field.is_empty() {
                    return Ok(StepOutcome::Exhausted);
                }
                field.remove_last()?;
                return Ok(StepOutcome::Advanced);
            }
            if step > 8 {
                return Ok(StepOutcome::Exhausted);
            }
            field.add_first_uniform(params.start_temperature)?;
            Ok(StepOutcome::Advanced)
        }
    }

    struct Run {
        seen: Vec<bool>,
        field: Arc<RwLock<FieldStore>>,
        tail_request: Arc<AtomicBool>,
        events: Vec<WorkerEvent>,
    }

    /// Run a driver over a capacity-2 field until the stepper exhausts.
    async fn drive(tail_at: TailAt, tail_before_start: bool) -> Run {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let tail_request = Arc::new(AtomicBool::new(false));
        let mut store = FieldStore::with_shape(2, 1, 1);
        store.set_tail(tail_before_start);
        let field = Arc::new(RwLock::new(store));
        let (_params_tx, params) = watch::channel(CastingParameters::default());
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (_signal, notifier, mut listener) = CalcSignal::start();

        let stepper = Box::new(RecordingStepper {
            seen: Arc::clone(&seen),
            field: Arc::clone(&field),
            tail_request: Arc::clone(&tail_request),
            tail_at,
        });
        let ctx = DriverContext {
            run: 1,
            field: Arc::clone(&field),
            params,
            tail_request: Arc::clone(&tail_request),
            notifier,
            events: events_tx,
        };
        let driver = tokio::task::spawn_blocking(move || run_driver(stepper, ctx));

        while listener.next().await {}
        driver.await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = events_rx.try_recv() {
            events.push(event);
        }
        let seen = seen.lock().unwrap().clone();
        Run {
            seen,
            field,
            tail_request,
            events,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_deferred_tail_applies_at_next_step() {
        let run = drive(TailAt::Request(3), false).await;

        // Step 3 was in flight when tail was requested: it still cast
        // normally and evicted the oldest slice. Step 4 started in tail mode.
        assert_eq!(run.seen, vec![false, false, false, true, true, true]);
        assert!(matches!(run.events.as_slice(), [WorkerEvent::Exhausted { run: 1 }]));
        assert!(!run.tail_request.load(Ordering::Acquire));

        let field = run.field.read().await;
        assert!(field.is_tail());
        assert!(field.is_empty());
        // Three slices entered, one evicted by step 3, two drained
        assert_eq!((field.start(), field.end()), (3, 3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_immediate_tail_waits_for_in_flight_step() {
        let run = drive(TailAt::Lock(3), false).await;

        // The writer gets the field between steps 3 and 4, without the
        // request flag ever being raised.
        assert_eq!(run.seen, vec![false, false, false, true, true, true]);
        assert!(matches!(run.events.as_slice(), [WorkerEvent::Exhausted { run: 1 }]));
        assert!(!run.tail_request.load(Ordering::Acquire));

        let field = run.field.read().await;
        assert_eq!((field.start(), field.end()), (3, 3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_tail_set_before_start_drains_from_first_step() {
        let run = drive(TailAt::Never, true).await;

        assert_eq!(run.seen, vec![true]);
        assert!(matches!(run.events.as_slice(), [WorkerEvent::Exhausted { run: 1 }]));
        assert_eq!(run.field.read().await.end(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_without_tail_no_flag_is_seen() {
        let run = drive(TailAt::Never, false).await;

        assert_eq!(run.seen.len(), 9);
        assert!(run.seen.iter().all(|&tail| !tail));
        let field = run.field.read().await;
        assert_eq!((field.start(), field.end()), (6, 8));
    }

    #[test]
    fn test_reporter_fires_only_when_armed() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        ExitReporter::new(4, origin::PUSH, tx.clone()).disarm();
        assert!(rx.try_recv().is_err());

        drop(ExitReporter::new(5, origin::STEP, tx));
        match rx.try_recv().unwrap() {
            WorkerEvent::Panicked { run, worker } => assert_eq!((run, worker), (5, "step")),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
