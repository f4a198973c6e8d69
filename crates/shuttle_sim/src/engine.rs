//! The simulation engine.
//!
//! The engine is a single tokio task that owns the active [`Run`] and its
//! tick timer. Everything that mutates the run (`start`, `stop`, `advance`,
//! `reset`, and the timer itself) is serialised through that task:
//!
//! 1. Control calls on the [`Engine`] handle become commands on an mpsc queue.
//! 2. The task `select!`s between the queue and the run's interval, commands
//!    first, so a tick never interleaves with a command.
//! 3. After every mutation the task publishes a status snapshot into a
//!    `watch` channel, which [`Engine::status`] reads without waiting.
//! 4. Events go out through the [`Broadcaster`] and never wait on observers.
//!
//! The interval lives inside the active run, so discarding the run cancels
//! the timer with it.
//!
//! ```text
//!  Idle ──start──▶ Running ──tick (at final stop)──▶ Completed ──▶ Idle
//!    ▲                │
//!    └─────stop───────┘
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use shuttle_net::messages::RunStatus;
use shuttle_route::RouteCatalog;

use crate::broadcast::{Broadcaster, SimEvent, Subscription};
use crate::config::SimConfig;
use crate::error::{SimError, TickFault};
use crate::run::{Run, TickOutcome};

/// Result of [`Engine::stop`]. Stopping is idempotent; neither case is an
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// A run was active and has been discarded.
    Stopped { bus_id: String },
    /// Nothing was running.
    AlreadyIdle,
}

enum Command {
    Start {
        route_id: String,
        reply: oneshot::Sender<Result<RunStatus, SimError>>,
    },
    Stop {
        reply: oneshot::Sender<StopOutcome>,
    },
    Advance {
        reply: oneshot::Sender<Result<bool, SimError>>,
    },
    Reset {
        reply: oneshot::Sender<Result<RunStatus, SimError>>,
    },
}

/// The status snapshot shared with [`Engine::status`]. Uptime is derived on
/// read so the snapshot never goes stale between ticks.
#[derive(Debug, Clone)]
struct StatusCell {
    status: RunStatus,
    started_at: Instant,
}

/// Handle to a running simulation engine. Cheap to clone; the engine task
/// shuts down when the last handle is dropped.
#[derive(Clone)]
pub struct Engine {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<Option<StatusCell>>,
    broadcaster: Broadcaster,
    catalog: Arc<dyn RouteCatalog>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("running", &self.is_running())
            .field("observers", &self.broadcaster.observer_count())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Spawn a new engine task on the current tokio runtime.
    ///
    /// Each call creates an independent engine with its own run, timer and
    /// observers.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn(catalog: Arc<dyn RouteCatalog>, config: SimConfig) -> Self {
        let config = config.clamped();
        let (commands, command_rx) = mpsc::channel(config.command_capacity);
        let (status_tx, status) = watch::channel(None);
        let broadcaster = Broadcaster::new(config.broadcast_capacity);

        let actor = EngineActor {
            catalog: Arc::clone(&catalog),
            config,
            broadcaster: broadcaster.clone(),
            status: status_tx,
            active: None,
        };
        tokio::spawn(actor.run(command_rx));

        Self {
            commands,
            status,
            broadcaster,
            catalog,
        }
    }

    /// Start simulating `route_id`, replacing any active run.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::RouteNotFound`] if the catalog has no such route;
    /// any active run is left untouched in that case.
    pub async fn start(&self, route_id: &str) -> Result<RunStatus, SimError> {
        let route_id = route_id.to_string();
        self.request(|reply| Command::Start { route_id, reply })
            .await?
    }

    /// Stop the active run, if any. Emits no final bus update.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EngineClosed`] if the engine task is gone.
    pub async fn stop(&self) -> Result<StopOutcome, SimError> {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Jump the bus to the next stop. Returns `false` at the final stop.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoActiveRun`] when idle.
    pub async fn advance(&self) -> Result<bool, SimError> {
        self.request(|reply| Command::Advance { reply }).await?
    }

    /// Rewind the active run to its first stop, keeping its bus id. The
    /// next tick is one full period after the reset.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoActiveRun`] when idle.
    pub async fn reset(&self) -> Result<RunStatus, SimError> {
        self.request(|reply| Command::Reset { reply }).await?
    }

    /// Snapshot of the active run, or `None` when idle. Never blocks.
    #[must_use]
    pub fn status(&self) -> Option<RunStatus> {
        self.status.borrow().as_ref().map(|cell| {
            let mut status = cell.status.clone();
            status.uptime_secs = cell.started_at.elapsed().as_secs();
            status
        })
    }

    /// Returns `true` while a run is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status.borrow().is_some()
    }

    /// Attach an observer. Its first event is the current status, if a run
    /// is active, followed by every event broadcast from then on.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.broadcaster.subscribe(|| self.status())
    }

    /// The catalog runs are started from.
    #[must_use]
    pub fn catalog(&self) -> &Arc<dyn RouteCatalog> {
        &self.catalog
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SimError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SimError::EngineClosed)?;
        response.await.map_err(|_| SimError::EngineClosed)
    }
}

struct ActiveRun {
    run: Run,
    ticker: Interval,
}

enum Wake {
    Command(Option<Command>),
    Tick,
}

struct EngineActor {
    catalog: Arc<dyn RouteCatalog>,
    config: SimConfig,
    broadcaster: Broadcaster,
    status: watch::Sender<Option<StatusCell>>,
    active: Option<ActiveRun>,
}

impl EngineActor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        debug!("simulation engine started");
        loop {
            let wake = tokio::select! {
                biased;
                command = commands.recv() => Wake::Command(command),
                () = next_tick(&mut self.active) => Wake::Tick,
            };

            match wake {
                Wake::Command(Some(command)) => self.handle(command),
                Wake::Command(None) => break,
                Wake::Tick => self.tick(),
            }
        }
        if self.active.is_some() {
            self.teardown("engine shut down");
        }
        debug!("simulation engine stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start { route_id, reply } => {
                let _ = reply.send(self.start(&route_id));
            }
            Command::Stop { reply } => {
                let outcome = match self.teardown("stopped by operator") {
                    Some(bus_id) => StopOutcome::Stopped { bus_id },
                    None => StopOutcome::AlreadyIdle,
                };
                let _ = reply.send(outcome);
            }
            Command::Advance { reply } => {
                let _ = reply.send(self.advance());
            }
            Command::Reset { reply } => {
                let _ = reply.send(self.reset());
            }
        }
    }

    fn start(&mut self, route_id: &str) -> Result<RunStatus, SimError> {
        let route = self.catalog.get_route(route_id)?;

        if self.active.is_some() {
            self.teardown("replaced by a new run");
        }

        let run = Run::new(route);
        let period = self.config.tick_period;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            route_id = %run.route().id,
            route_name = %run.route().name,
            bus_id = run.bus_id(),
            stops = run.route().len(),
            "starting simulation"
        );

        self.active = Some(ActiveRun { run, ticker });
        self.emit_current()?;

        self.active
            .as_ref()
            .map(|active| active.run.status(&self.config))
            .ok_or(SimError::NoActiveRun)
    }

    fn advance(&mut self) -> Result<bool, SimError> {
        let active = self.active.as_mut().ok_or(SimError::NoActiveRun)?;
        if !active.run.advance_stop() {
            return Ok(false);
        }
        info!(
            bus_id = active.run.bus_id(),
            stop_index = active.run.current_stop_index(),
            "forced bus to next stop"
        );
        self.emit_current()?;
        Ok(true)
    }

    fn reset(&mut self) -> Result<RunStatus, SimError> {
        let active = self.active.as_mut().ok_or(SimError::NoActiveRun)?;
        active.run.reset();
        // Restart the cadence with the run clock.
        active.ticker.reset();
        info!(bus_id = active.run.bus_id(), "simulation reset to first stop");
        self.emit_current()?;

        self.active
            .as_ref()
            .map(|active| active.run.status(&self.config))
            .ok_or(SimError::NoActiveRun)
    }

    fn tick(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        match active.run.tick(&self.config) {
            Ok(TickOutcome::Advanced(update)) => {
                let arrived = update.segment_progress == 0;
                if arrived {
                    info!(
                        bus_id = %update.bus_id,
                        stop_index = update.current_stop_index,
                        stop = %update.current_stop_name,
                        "bus arrived at stop"
                    );
                } else {
                    debug!(
                        bus_id = %update.bus_id,
                        stop_index = update.current_stop_index,
                        segment_progress = update.segment_progress,
                        "bus moving"
                    );
                }
                let metadata = active.run.metadata(true);
                self.sync_status();
                self.broadcaster
                    .publish(SimEvent::BusUpdate(Arc::new(update)));
                self.broadcaster.publish(SimEvent::Status(Arc::new(metadata)));
            }
            Ok(TickOutcome::Completed { update, completed }) => {
                info!(
                    bus_id = %completed.bus_id,
                    route_id = %completed.route_id,
                    stop = %update.current_stop_name,
                    "bus reached final stop; simulation completed"
                );
                // Go idle before anyone hears about completion.
                let metadata = active.run.metadata(false);
                self.active = None;
                self.sync_status();
                self.broadcaster
                    .publish(SimEvent::BusUpdate(Arc::new(update)));
                self.broadcaster
                    .publish(SimEvent::Completed(Arc::new(completed)));
                self.broadcaster.publish(SimEvent::Status(Arc::new(metadata)));
            }
            Err(fault) => self.fault(&fault),
        }
    }

    /// Broadcast the active run's current state.
    fn emit_current(&mut self) -> Result<(), TickFault> {
        let Some(active) = self.active.as_ref() else {
            return Ok(());
        };
        match active.run.update(&self.config) {
            Ok(update) => {
                let metadata = active.run.metadata(true);
                self.sync_status();
                self.broadcaster
                    .publish(SimEvent::BusUpdate(Arc::new(update)));
                self.broadcaster.publish(SimEvent::Status(Arc::new(metadata)));
                Ok(())
            }
            Err(fault) => {
                self.fault(&fault);
                Err(fault)
            }
        }
    }

    fn fault(&mut self, fault: &TickFault) {
        let bus_id = self
            .active
            .as_ref()
            .map(|a| a.run.bus_id().to_string())
            .unwrap_or_default();
        error!(%fault, %bus_id, "simulation fault; stopping run");
        self.teardown("internal fault");
    }

    /// Discard the active run and its timer. Returns the discarded bus id.
    fn teardown(&mut self, reason: &str) -> Option<String> {
        let active = self.active.take()?;
        let bus_id = active.run.bus_id().to_string();
        info!(
            %bus_id,
            route_id = %active.run.route().id,
            reason,
            "simulation stopped"
        );
        self.sync_status();
        self.broadcaster
            .publish(SimEvent::Status(Arc::new(active.run.metadata(false))));
        Some(bus_id)
    }

    fn sync_status(&self) {
        let cell = self.active.as_ref().map(|active| StatusCell {
            status: active.run.status(&self.config),
            started_at: active.run.started_at(),
        });
        self.status.send_replace(cell);
    }
}

/// Resolves on the active run's next tick; pends forever when idle.
async fn next_tick(active: &mut Option<ActiveRun>) {
    match active {
        Some(active) => {
            let scheduled = active.ticker.tick().await;
            let late = scheduled.elapsed();
            if late > active.ticker.period() {
                warn!(late_ms = late.as_millis() as u64, "tick fired late");
            }
        }
        None => std::future::pending().await,
    }
}
