//! Session hub
//!
//! One [`Hub`] serves one client connection. Inbound messages are parsed by
//! an intake task and executed one at a time by the hub's own loop, which
//! owns the session state. While running, a blocking stepper worker and an
//! async push worker share the field through an `RwLock`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use caster_sim_core::{
    CastingParameters, FieldStore, FieldView, Geometry, PhaseThresholds, SliceStepper, SteelCatalog,
};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::command::Command;
use crate::config::{HubConfig, TailPolicy};
use crate::driver::{run_driver, DriverContext, WorkerEvent};
use crate::error::SessionError;
use crate::protocol::{inbound, origin, reply, Env, Msg, VerticalRequest};
use crate::push::{run_push, PushContext};
use crate::signal::CalcSignal;
use crate::state::Phase;
use crate::transport::{MessageSink, Outbox};

/// Per-connection session coordinator.
pub struct Hub<S> {
    config: HubConfig,
    sink: S,
    stepper: Box<dyn SliceStepper>,
    catalog: Arc<dyn SteelCatalog>,
}

impl<S: MessageSink> Hub<S> {
    /// Create a hub for one connection.
    ///
    /// # Arguments
    ///
    /// * `config` - Queue sizes, caster directory, tail policy and view settings
    /// * `sink` - Outbound transport; all writes to it are serialized
    /// * `stepper` - Physics backend driven while the session runs
    /// * `catalog` - Steel grade lookup used by `env`
    pub fn new(config: HubConfig, sink: S, stepper: Box<dyn SliceStepper>, catalog: Arc<dyn SteelCatalog>) -> Self {
        Self {
            config,
            sink,
            stepper,
            catalog,
        }
    }

    /// Serve the session until `inbound` closes or a fatal error occurs.
    ///
    /// Running workers are stopped before this returns.
    ///
    /// # Errors
    ///
    /// Returns the fatal [`SessionError`] that ended the session: a store
    /// error from the stepper, repeated transport failures or a worker crash.
    pub async fn run(self, inbound: mpsc::Receiver<Msg>) -> Result<(), SessionError> {
        let outbox = Outbox::new(self.sink, self.config.max_transport_failures);
        let (command_tx, command_rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let intake = tokio::spawn(run_intake(inbound, command_tx, outbox.clone()));

        let mut executor = Executor {
            config: self.config,
            outbox,
            stepper: Some(self.stepper),
            catalog: self.catalog,
            phase: Phase::Idle,
            session: None,
            running: None,
            runs: 0,
            tail_request: Arc::new(AtomicBool::new(false)),
            events: events_tx,
        };

        info!("Session opened");
        let result = executor.serve(command_rx, events_rx).await;
        executor.shutdown().await;
        intake.abort();

        match &result {
            Ok(()) => info!("Session closed"),
            Err(err) => error!("Session terminated: {}", err),
        }
        result
    }
}

/// Parse raw messages into commands, answering malformed ones directly.
async fn run_intake<S: MessageSink>(
    mut inbound: mpsc::Receiver<Msg>,
    commands: mpsc::Sender<Command>,
    outbox: Outbox<S>,
) {
    while let Some(msg) = inbound.recv().await {
        match Command::parse(&msg) {
            Ok(command) => {
                debug!("Queued '{}'", command.name());
                if commands.send(command).await.is_err() {
                    break;
                }
            }
            Err(err) => {
                warn!("Rejected '{}' message: {}", msg.kind, err);
                if outbox.error(&msg.kind, &err).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Intake finished");
}

/// State created by `env`.
struct ConfiguredSession {
    geometry: Geometry,
    thresholds: PhaseThresholds,
    field: Arc<RwLock<FieldStore>>,
    params: watch::Sender<CastingParameters>,
}

impl ConfiguredSession {
    fn view<'a>(&'a self, field: &'a FieldStore, config: &HubConfig) -> FieldView<'a> {
        FieldView::new(field, &self.geometry, self.thresholds)
            .with_scale(config.view_scale)
            .with_curve_stride(config.curve_stride)
    }
}

/// Handles of an active run.
struct RunningSession {
    run: u64,
    signal: CalcSignal,
    driver: JoinHandle<Box<dyn SliceStepper>>,
    push: JoinHandle<()>,
}

/// The command-executing half of a hub. Owns all session state.
struct Executor<S> {
    config: HubConfig,
    outbox: Outbox<S>,
    /// Parked here whenever no run holds it
    stepper: Option<Box<dyn SliceStepper>>,
    catalog: Arc<dyn SteelCatalog>,
    phase: Phase,
    session: Option<ConfiguredSession>,
    running: Option<RunningSession>,
    runs: u64,
    tail_request: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<WorkerEvent>,
}

impl<S: MessageSink> Executor<S> {
    async fn serve(
        &mut self,
        mut commands: mpsc::Receiver<Command>,
        mut events: mpsc::UnboundedReceiver<WorkerEvent>,
    ) -> Result<(), SessionError> {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.dispatch(command).await?,
                    None => {
                        debug!("Inbound queue closed");
                        return Ok(());
                    }
                },
                Some(event) = events.recv() => self.handle_event(event).await?,
            }
        }
    }

    async fn dispatch(&mut self, command: Command) -> Result<(), SessionError> {
        let name = command.name();
        match self.execute(command).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_recoverable() => {
                warn!("Rejected '{}': {}", name, err);
                self.outbox.error(name, &err).await
            }
            Err(err) => {
                let _ = self.outbox.error(name, &err).await;
                Err(err)
            }
        }
    }

    async fn execute(&mut self, command: Command) -> Result<(), SessionError> {
        self.phase.check(&command)?;

        match command {
            Command::SelectCaster(name) => self.select_caster(&name).await,
            Command::Env(env) => self.configure(&env).await,
            Command::ChangeInitialTemp(temperature) => {
                self.update_params(inbound::CHANGE_INITIAL_TEMP, |p| p.start_temperature = temperature)?;
                self.acknowledge(reply::INITIAL_TEMP_SET, reply::INITIAL_TEMP_SET).await
            }
            Command::ChangeNarrowSurface(flow) => {
                self.update_params(inbound::CHANGE_NARROW_SURFACE, |p| p.narrow_surface = flow)?;
                self.acknowledge(reply::NARROW_SURFACE_TEMP_SET, reply::NARROW_SURFACE_TEMP_SET).await
            }
            Command::ChangeWideSurface(flow) => {
                self.update_params(inbound::CHANGE_WIDE_SURFACE, |p| p.wide_surface = flow)?;
                self.acknowledge(reply::WIDE_SURFACE_TEMP_SET, reply::WIDE_SURFACE_TEMP_SET).await
            }
            Command::ChangeV(speed) => {
                self.update_params(inbound::CHANGE_V, |p| p.drag_speed = speed)?;
                self.acknowledge(reply::V_SET, reply::V_SET).await
            }
            Command::Start => self.start().await,
            Command::Stop => self.stop().await,
            Command::Tail => self.tail().await,
            Command::GenerateSlice(index) => self.generate_slice(index).await,
            Command::GenerateVerticalSlice1 => self.generate_vertical_curve().await,
            Command::GenerateVerticalSlice2(request) => self.generate_vertical_map(request).await,
        }
    }

    async fn acknowledge(&self, kind: &'static str, content: &str) -> Result<(), SessionError> {
        self.outbox.send(Msg::new(kind, content)).await
    }

    fn configured(&self, command: &'static str) -> Result<&ConfiguredSession, SessionError> {
        self.session.as_ref().ok_or(SessionError::Configuration {
            command,
            phase: self.phase,
        })
    }

    // =========================================================================
    // CONFIGURATION
    // =========================================================================

    async fn select_caster(&self, name: &str) -> Result<(), SessionError> {
        let path = self.config.caster_home.join(format!("{name}.json"));
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            SessionError::validation(inbound::SELECT_CASTER, format!("caster '{name}' unavailable: {e}"))
        })?;
        info!("Selected caster '{}'", name);
        self.acknowledge(reply::CASTER_INFO, &text).await
    }

    async fn configure(&mut self, env: &Env) -> Result<(), SessionError> {
        let command = inbound::ENV;
        let geometry = Geometry::from_coordinate(&env.coordinate).map_err(|e| SessionError::geometry(command, &e))?;
        let thresholds = self
            .catalog
            .thresholds(env.steel_value)
            .ok_or_else(|| SessionError::validation(command, format!("unknown steel grade {}", env.steel_value)))?;
        let params = env.casting_parameters();

        let stepper = self
            .stepper
            .as_mut()
            .ok_or_else(|| SessionError::Worker("stepper not returned by the previous run".into()))?;
        stepper.configure(&geometry, &params);

        let field = FieldStore::new(&geometry);
        info!(
            "Configured strand: {}x{} samples per slice, {} slices, steel {} (solidus {:.0}, liquidus {:.0})",
            geometry.rows(),
            geometry.cols(),
            field.capacity(),
            env.steel_value,
            thresholds.solidus,
            thresholds.liquidus
        );

        let (params_tx, _) = watch::channel(params);
        self.session = Some(ConfiguredSession {
            geometry,
            thresholds,
            field: Arc::new(RwLock::new(field)),
            params: params_tx,
        });
        self.tail_request.store(false, Ordering::Release);
        self.phase = Phase::Configured;

        self.acknowledge(reply::ENV_SET, "env is set").await
    }

    fn update_params(
        &self,
        command: &'static str,
        apply: impl FnOnce(&mut CastingParameters),
    ) -> Result<(), SessionError> {
        let session = self.configured(command)?;
        session.params.send_modify(apply);
        debug!("Casting parameters now {:?}", *session.params.borrow());
        Ok(())
    }

    // =========================================================================
    // RUN CONTROL
    // =========================================================================

    async fn start(&mut self) -> Result<(), SessionError> {
        let (field, params, geometry, thresholds) = {
            let session = self.configured(inbound::START)?;
            (
                Arc::clone(&session.field),
                session.params.subscribe(),
                session.geometry,
                session.thresholds,
            )
        };
        let stepper = self
            .stepper
            .take()
            .ok_or_else(|| SessionError::Worker("stepper not returned by the previous run".into()))?;

        self.runs += 1;
        let run = self.runs;
        let (signal, notifier, listener) = CalcSignal::start();

        let driver_ctx = DriverContext {
            run,
            field: Arc::clone(&field),
            params,
            tail_request: Arc::clone(&self.tail_request),
            notifier,
            events: self.events.clone(),
        };
        let driver = tokio::task::spawn_blocking(move || run_driver(stepper, driver_ctx));

        let push = tokio::spawn(run_push(PushContext {
            run,
            field,
            geometry,
            thresholds,
            scale: self.config.view_scale,
            listener,
            outbox: self.outbox.clone(),
            events: self.events.clone(),
        }));

        self.running = Some(RunningSession {
            run,
            signal,
            driver,
            push,
        });
        self.phase = Phase::Running;
        info!("Run {} started", run);

        self.acknowledge(reply::STARTED, "Started").await
    }

    async fn stop(&mut self) -> Result<(), SessionError> {
        let running = self.running.take().ok_or(SessionError::Configuration {
            command: inbound::STOP,
            phase: self.phase,
        })?;
        let run = running.run;
        self.halt(running).await?;
        self.phase = Phase::Stopped;
        info!("Run {} stopped", run);

        self.acknowledge(reply::STOPPED, "stopped").await
    }

    /// Signal stop, wait for both workers and take the stepper back.
    ///
    /// Both workers are awaited even if one of them failed; the stepper is
    /// only parked again when its worker returned it.
    async fn halt(&mut self, running: RunningSession) -> Result<(), SessionError> {
        running.signal.stop();
        let driver = running.driver.await;
        let push = running.push.await;

        match driver {
            Ok(stepper) => self.stepper = Some(stepper),
            Err(e) => return Err(SessionError::Worker(format!("stepper worker: {e}"))),
        }
        push.map_err(|e| SessionError::Worker(format!("push worker: {e}")))
    }

    async fn tail(&self) -> Result<(), SessionError> {
        let session = self.configured(inbound::TAIL)?;
        let deferred = self.phase == Phase::Running && self.config.tail_policy == TailPolicy::NextStep;

        if deferred {
            self.tail_request.store(true, Ordering::Release);
            info!("Tail casting requested for the next step");
        } else {
            session.field.write().await.set_tail(true);
            info!("Tail casting engaged");
        }

        self.acknowledge(reply::TAIL_START, "started to tail").await
    }

    async fn handle_event(&mut self, event: WorkerEvent) -> Result<(), SessionError> {
        let current = self.running.as_ref().map(|r| r.run);
        if current != Some(event.run()) {
            debug!("Ignoring event from finished run {}", event.run());
            return Ok(());
        }
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        match event {
            WorkerEvent::Exhausted { run } => {
                self.halt(running).await?;
                self.phase = Phase::Stopped;
                info!("Run {} ended: field drained", run);
                self.acknowledge(reply::STOPPED, "stopped").await
            }
            WorkerEvent::StepFailed { error, .. } => {
                let err = SessionError::Store(error);
                let _ = self.halt(running).await;
                let _ = self.outbox.error(origin::STEP, &err).await;
                Err(err)
            }
            WorkerEvent::PushFailed { error, .. } => {
                let _ = self.halt(running).await;
                let _ = self.outbox.error(origin::PUSH, &error).await;
                Err(error)
            }
            WorkerEvent::Panicked { run, worker } => {
                let err = SessionError::Worker(format!("{worker} worker of run {run} panicked"));
                let _ = self.halt(running).await;
                let _ = self.outbox.error(worker, &err).await;
                Err(err)
            }
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    async fn generate_slice(&self, index: usize) -> Result<(), SessionError> {
        let command = inbound::GENERATE_SLICE;
        let session = self.configured(command)?;
        let info = {
            let field = session.field.read().await;
            let size = field.size();
            if index >= size {
                return Err(SessionError::validation(
                    command,
                    format!("slice index {index} out of range [0, {size})"),
                ));
            }
            session
                .view(&field, &self.config)
                .slice_info(index)
                .map_err(|e| SessionError::validation(command, e.to_string()))?
        };
        self.outbox.reply(reply::SLICE_GENERATED, &info).await
    }

    async fn generate_vertical_curve(&self) -> Result<(), SessionError> {
        let command = inbound::GENERATE_VERTICAL_SLICE1;
        let session = self.configured(command)?;
        let curve = {
            let field = session.field.read().await;
            if field.is_empty() {
                return Err(SessionError::validation(command, "field holds no slices yet"));
            }
            session.view(&field, &self.config).vertical_curve()
        };
        self.outbox.reply(reply::VERTICAL_SLICE1_GENERATED, &curve).await
    }

    async fn generate_vertical_map(&self, request: VerticalRequest) -> Result<(), SessionError> {
        let command = inbound::GENERATE_VERTICAL_SLICE2;
        let session = self.configured(command)?;
        let map = {
            let field = session.field.read().await;
            if field.is_empty() {
                return Err(SessionError::validation(command, "field holds no slices yet"));
            }
            session
                .view(&field, &self.config)
                .vertical_map(request.index, request.z_scale)
                .map_err(|e| SessionError::query(command, &e))?
        };
        self.outbox.reply(reply::VERTICAL_SLICE2_GENERATED, &map).await
    }

    async fn shutdown(&mut self) {
        if let Some(running) = self.running.take() {
            if let Err(err) = self.halt(running).await {
                warn!("Workers did not stop cleanly: {}", err);
            }
        }
    }
}
