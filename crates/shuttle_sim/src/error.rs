//! Simulator error types.

use shuttle_route::RouteError;

/// Errors returned by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// `start` was asked for a route the catalog does not have.
    #[error("route not found: {0}")]
    RouteNotFound(String),

    /// The catalog failed for a reason other than a missing route.
    #[error("route catalog error: {0}")]
    Catalog(RouteError),

    /// The operation needs a running simulation and there is none.
    #[error("no active simulation")]
    NoActiveRun,

    /// Computing the run's state failed; the run was torn down.
    #[error(transparent)]
    Fault(#[from] TickFault),

    /// The engine task has shut down.
    #[error("simulation engine is not running")]
    EngineClosed,
}

impl SimError {
    /// Stable machine-readable kind used in control replies.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RouteNotFound(_) => "route_not_found",
            Self::Catalog(_) | Self::Fault(_) => "internal",
            Self::NoActiveRun => "no_active_run",
            Self::EngineClosed => "unavailable",
        }
    }
}

impl From<RouteError> for SimError {
    fn from(e: RouteError) -> Self {
        match e {
            RouteError::NotFound(id) => Self::RouteNotFound(id),
            other => Self::Catalog(other),
        }
    }
}

/// A fault while computing a run's state. Never surfaced from a tick; the
/// engine logs it and stops the run instead of emitting corrupt state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TickFault {
    /// The run's stop index points outside its route.
    #[error("stop index {index} out of range for route {route_id} ({len} stops)")]
    StopOutOfRange {
        route_id: String,
        index: usize,
        len: usize,
    },

    /// Interpolation produced a non-finite or out-of-range position.
    #[error("invalid position ({lat}, {lng}) on route {route_id}")]
    InvalidPosition { route_id: String, lat: f64, lng: f64 },
}
