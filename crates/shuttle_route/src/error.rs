//! Route catalog error types.

use std::path::PathBuf;

/// Errors raised while loading or querying the route catalog.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// No route with the requested identifier exists.
    #[error("route not found: {0}")]
    NotFound(String),

    /// The catalog file could not be read.
    #[error("failed to read route catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog file is not valid JSON for the expected layout.
    #[error("failed to parse route catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two routes share the same identifier.
    #[error("duplicate route id: {0}")]
    DuplicateRoute(String),

    /// A route was defined without any stops.
    #[error("route {0} has no stops")]
    EmptyRoute(String),

    /// A stop name has no entry in the coordinate table.
    #[error("route {route_id}: no coordinate for stop {stop}")]
    UnknownStop { route_id: String, stop: String },

    /// A coordinate is NaN, infinite, or outside the valid degree range.
    #[error("invalid coordinate for stop {0}")]
    InvalidCoordinate(String),
}
