//! Route and stop definitions.

use serde::Serialize;

use crate::coordinate::Coordinate;
use crate::error::RouteError;

/// A named waypoint on a route.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Stop {
    /// Display name, also the key into the catalog's coordinate table.
    pub name: String,
    /// Nominal time-of-day label (e.g. `"08:35"`). Informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Where the stop is.
    pub coordinate: Coordinate,
}

impl Stop {
    /// Create a stop without a time label.
    #[must_use]
    pub fn new(name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            name: name.into(),
            time: None,
            coordinate,
        }
    }

    /// Attach a nominal time-of-day label.
    #[must_use]
    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }
}

/// An ordered, non-empty sequence of stops. Stop order is traversal order.
///
/// Routes are immutable once built; the simulator shares them behind an
/// `Arc` for the lifetime of a run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Route {
    /// Unique route identifier (e.g. `"R01"`).
    pub id: String,
    /// Human-readable route name.
    pub name: String,
    stops: Vec<Stop>,
}

impl Route {
    /// Build a route.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::EmptyRoute`] if `stops` is empty.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        stops: Vec<Stop>,
    ) -> Result<Self, RouteError> {
        let id = id.into();
        if stops.is_empty() {
            return Err(RouteError::EmptyRoute(id));
        }
        Ok(Self {
            id,
            name: name.into(),
            stops,
        })
    }

    /// All stops, in traversal order.
    #[must_use]
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Number of stops. Always at least one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Always `false`; routes are validated non-empty on construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Index of the final stop.
    #[must_use]
    pub fn last_index(&self) -> usize {
        self.stops.len() - 1
    }

    /// The stop at `index`, if any.
    #[must_use]
    pub fn stop(&self, index: usize) -> Option<&Stop> {
        self.stops.get(index)
    }

    /// The final stop of the route.
    #[must_use]
    pub fn final_stop(&self) -> &Stop {
        &self.stops[self.last_index()]
    }

    /// Stable per-stop identifier, `"<route id>-stop-<index>"`.
    #[must_use]
    pub fn stop_id(&self, index: usize) -> String {
        format!("{}-stop-{index}", self.id)
    }
}
