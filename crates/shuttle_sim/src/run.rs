//! A single traversal of a route.
//!
//! [`Run`] is the pure state machine behind the engine: it knows where the
//! bus is and how to advance it, but owns no timer and publishes nothing.
//! The engine drives it one [`Run::tick`] at a time.
//!
//! Progress within a segment is kept as a whole number of ticks, so the bus
//! sits exactly on a stop's coordinate whenever the count is zero.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use uuid::Uuid;

use shuttle_net::messages::{BusStatus, BusUpdate, RunStatus, SimulationCompleted, SimulationStatus};
use shuttle_route::{Coordinate, Route};

use crate::config::SimConfig;
use crate::error::TickFault;

/// What a tick did to the run.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// The bus moved (or arrived at a stop) and the run continues.
    Advanced(BusUpdate),
    /// The bus was already at the final stop. The run is over.
    Completed {
        update: BusUpdate,
        completed: SimulationCompleted,
    },
}

/// One active traversal of a route.
#[derive(Debug, Clone)]
pub struct Run {
    route: Arc<Route>,
    bus_id: String,
    current_stop_index: usize,
    /// Ticks spent in the current segment, `0..ticks_per_segment`.
    segment_ticks: u32,
    start_time: DateTime<Utc>,
    started_at: Instant,
}

impl Run {
    /// Begin a run at the first stop of `route`.
    #[must_use]
    pub fn new(route: Arc<Route>) -> Self {
        let start_time = Utc::now();
        let nonce = Uuid::new_v4().simple().to_string();
        let bus_id = format!(
            "BUS-{}-{}-{}",
            route.id,
            start_time.timestamp_millis(),
            &nonce[..8]
        );
        Self {
            route,
            bus_id,
            current_stop_index: 0,
            segment_ticks: 0,
            start_time,
            started_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    #[must_use]
    pub fn bus_id(&self) -> &str {
        &self.bus_id
    }

    #[must_use]
    pub fn current_stop_index(&self) -> usize {
        self.current_stop_index
    }

    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// When the run (or its last reset) began, on the runtime clock.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Fraction of the way to the next stop, in `[0.0, 1.0)`.
    #[must_use]
    pub fn progress(&self, config: &SimConfig) -> f64 {
        f64::from(self.segment_ticks) / f64::from(config.ticks_per_segment)
    }

    /// Returns `true` once the bus stands at the final stop.
    #[must_use]
    pub fn at_final_stop(&self) -> bool {
        self.current_stop_index >= self.route.last_index()
    }

    /// Advance the run by one tick.
    ///
    /// # Errors
    ///
    /// Returns a [`TickFault`] if the resulting state cannot be rendered.
    pub fn tick(&mut self, config: &SimConfig) -> Result<TickOutcome, TickFault> {
        if self.at_final_stop() {
            return Ok(TickOutcome::Completed {
                update: self.final_update(),
                completed: SimulationCompleted {
                    route_id: self.route.id.clone(),
                    route_name: self.route.name.clone(),
                    bus_id: self.bus_id.clone(),
                    completed_at: Utc::now(),
                },
            });
        }

        self.segment_ticks += 1;
        if self.segment_ticks >= config.ticks_per_segment {
            self.current_stop_index += 1;
            self.segment_ticks = 0;
        }

        self.update(config).map(TickOutcome::Advanced)
    }

    /// Jump straight to the next stop. Returns `false` at the final stop.
    pub fn advance_stop(&mut self) -> bool {
        if self.at_final_stop() {
            return false;
        }
        self.current_stop_index += 1;
        self.segment_ticks = 0;
        true
    }

    /// Rewind to the first stop and restart the run clock. The bus id is kept.
    pub fn reset(&mut self) {
        self.current_stop_index = 0;
        self.segment_ticks = 0;
        self.start_time = Utc::now();
        self.started_at = Instant::now();
    }

    /// Interpolated position of the bus.
    ///
    /// # Errors
    ///
    /// Returns a [`TickFault`] if the index is out of range or the result is
    /// not a valid coordinate.
    pub fn position(&self, config: &SimConfig) -> Result<Coordinate, TickFault> {
        let current = self.route.stop(self.current_stop_index).ok_or_else(|| {
            TickFault::StopOutOfRange {
                route_id: self.route.id.clone(),
                index: self.current_stop_index,
                len: self.route.len(),
            }
        })?;

        let progress = self.progress(config);
        let location = match self.route.stop(self.current_stop_index + 1) {
            Some(next) if progress > 0.0 => current.coordinate.lerp(next.coordinate, progress),
            _ => current.coordinate,
        };

        if !location.is_valid() {
            return Err(TickFault::InvalidPosition {
                route_id: self.route.id.clone(),
                lat: location.lat,
                lng: location.lng,
            });
        }
        Ok(location)
    }

    /// Estimated minutes to the final stop.
    ///
    /// Whole stops remaining after the current one, plus the unfinished part
    /// of the current segment, each weighted by `minutes_per_stop`.
    #[must_use]
    pub fn eta_minutes(&self, config: &SimConfig) -> f64 {
        let remaining_stops = self.route.last_index().saturating_sub(self.current_stop_index);
        let mut minutes = remaining_stops as f64 * config.minutes_per_stop;
        if !self.at_final_stop() {
            minutes += (1.0 - self.progress(config)) * config.minutes_per_stop;
        }
        minutes.max(0.0)
    }

    /// Whole-route progress, in rounded percent.
    #[must_use]
    pub fn route_percent(&self, config: &SimConfig) -> u8 {
        let covered = self.current_stop_index as f64 + self.progress(config);
        percent(covered / self.route.len() as f64)
    }

    /// Render the current state as a [`BusUpdate`].
    ///
    /// # Errors
    ///
    /// Returns a [`TickFault`] if the position cannot be computed.
    pub fn update(&self, config: &SimConfig) -> Result<BusUpdate, TickFault> {
        let location = self.position(config)?;
        let progress = self.progress(config);
        // `position` has already checked the index.
        let current = &self.route.stops()[self.current_stop_index];
        let next = self.route.stop(self.current_stop_index + 1);

        Ok(BusUpdate {
            route_id: self.route.id.clone(),
            route_name: self.route.name.clone(),
            bus_id: self.bus_id.clone(),
            location,
            current_stop_index: self.current_stop_index,
            current_stop_name: current.name.clone(),
            next_stop_name: next.map(|s| s.name.clone()),
            total_stops: self.route.len(),
            progress: self.route_percent(config),
            segment_progress: percent(progress),
            eta: format_eta(self.eta_minutes(config)),
            status: if progress > 0.0 {
                BusStatus::Moving
            } else {
                BusStatus::AtStop
            },
            timestamp: Utc::now(),
            uptime_secs: self.started_at.elapsed().as_secs(),
        })
    }

    /// The terminal update: pinned to the final stop, 100% complete.
    #[must_use]
    pub fn final_update(&self) -> BusUpdate {
        let last = self.route.final_stop();
        BusUpdate {
            route_id: self.route.id.clone(),
            route_name: self.route.name.clone(),
            bus_id: self.bus_id.clone(),
            location: last.coordinate,
            current_stop_index: self.route.last_index(),
            current_stop_name: last.name.clone(),
            next_stop_name: None,
            total_stops: self.route.len(),
            progress: 100,
            segment_progress: 100,
            eta: format_eta(0.0),
            status: BusStatus::Completed,
            timestamp: Utc::now(),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }

    /// Run metadata for control-panel views.
    #[must_use]
    pub fn metadata(&self, is_active: bool) -> SimulationStatus {
        SimulationStatus {
            route_id: self.route.id.clone(),
            route_name: self.route.name.clone(),
            current_stop_index: self.current_stop_index,
            total_stops: self.route.len(),
            is_active,
            start_time: self.start_time,
        }
    }

    /// Point-in-time status of the run.
    #[must_use]
    pub fn status(&self, config: &SimConfig) -> RunStatus {
        let current_stop_name = self
            .route
            .stop(self.current_stop_index)
            .map(|s| s.name.clone())
            .unwrap_or_default();
        RunStatus {
            route_id: self.route.id.clone(),
            route_name: self.route.name.clone(),
            bus_id: self.bus_id.clone(),
            current_stop_index: self.current_stop_index,
            current_stop_name,
            total_stops: self.route.len(),
            progress: self.route_percent(config),
            is_active: true,
            start_time: self.start_time,
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }
}

fn percent(fraction: f64) -> u8 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}

/// `"<n> min"` while minutes remain, `"Arrived"` otherwise.
#[must_use]
pub fn format_eta(minutes: f64) -> String {
    if minutes > 0.0 {
        format!("{} min", minutes.round() as u64)
    } else {
        "Arrived".to_string()
    }
}
