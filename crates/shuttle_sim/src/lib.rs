//! # shuttle_sim: shuttle position simulator
//!
//! Simulates one college shuttle driving a fixed route. At most one run is
//! active at a time; each tick moves the bus a fixed fraction of the way to
//! the next stop and broadcasts its interpolated position, progress and ETA
//! to every connected observer.
//!
//! ## Layout
//!
//! - [`engine`] owns the single active run and its tick timer.
//! - [`run`] holds the per-run state and the position/progress/ETA math.
//! - [`broadcast`] fans events out to observers, replaying the current
//!   status on connect.
//! - [`control`] answers start/stop/status requests over NATS.
//! - [`bridge`] republishes broadcast events on NATS subjects.

pub mod bridge;
pub mod broadcast;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod run;

pub use bridge::NatsBridge;
pub use broadcast::{Broadcaster, SimEvent, Subscription};
pub use config::SimConfig;
pub use control::ControlApi;
pub use engine::{Engine, StopOutcome};
pub use error::{SimError, TickFault};
