//! The route catalog.
//!
//! The simulator only ever reads routes through the [`RouteCatalog`] trait.
//! [`StaticCatalog`] is the file-backed implementation: it parses a JSON
//! document holding a stop coordinate table and a list of routes, resolves
//! every stop against the table, and hands out routes as `Arc<Route>` so a
//! running simulation keeps its own snapshot even if the catalog is swapped.
//!
//! ```json
//! {
//!   "coordinates": { "N.R Circle": { "lat": 13.3339, "lng": 74.7423 } },
//!   "routes": [
//!     { "id": "R01", "name": "Route 01", "stops": [{ "name": "N.R Circle", "time": "08:30" }] }
//!   ]
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::coordinate::Coordinate;
use crate::error::RouteError;
use crate::route::{Route, Stop};

/// Read-only access to route definitions.
pub trait RouteCatalog: Send + Sync {
    /// All routes, in catalog order.
    fn list_routes(&self) -> Vec<Arc<Route>>;

    /// Look up a single route by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::NotFound`] if no route has this id.
    fn get_route(&self, id: &str) -> Result<Arc<Route>, RouteError>;
}

#[derive(Deserialize)]
struct CatalogFile {
    coordinates: HashMap<String, Coordinate>,
    routes: Vec<RouteRecord>,
}

#[derive(Deserialize)]
struct RouteRecord {
    id: String,
    name: String,
    stops: Vec<StopRecord>,
}

#[derive(Deserialize)]
struct StopRecord {
    name: String,
    #[serde(default)]
    time: Option<String>,
}

/// An immutable, in-memory route catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    routes: Vec<Arc<Route>>,
}

impl StaticCatalog {
    /// Build a catalog from already-constructed routes.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::DuplicateRoute`] if two routes share an id.
    pub fn new(routes: Vec<Route>) -> Result<Self, RouteError> {
        let mut seen = HashSet::new();
        for route in &routes {
            if !seen.insert(route.id.as_str()) {
                return Err(RouteError::DuplicateRoute(route.id.clone()));
            }
        }
        Ok(Self {
            routes: routes.into_iter().map(Arc::new).collect(),
        })
    }

    /// Parse a catalog from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, a route is empty or
    /// duplicated, a stop has no coordinate, or a coordinate is invalid.
    pub fn from_json_str(json: &str) -> Result<Self, RouteError> {
        let file: CatalogFile = serde_json::from_str(json)?;

        for (name, coordinate) in &file.coordinates {
            if !coordinate.is_valid() {
                return Err(RouteError::InvalidCoordinate(name.clone()));
            }
        }

        let routes = file
            .routes
            .into_iter()
            .map(|record| resolve_route(record, &file.coordinates))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(routes)
    }

    /// Load a catalog from a JSON file on disk.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Io`] if the file cannot be read, or any error
    /// from [`StaticCatalog::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RouteError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| RouteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&json)?;
        info!(
            path = %path.display(),
            routes = catalog.routes.len(),
            "loaded route catalog"
        );
        Ok(catalog)
    }

    /// Number of routes in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if the catalog has no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl RouteCatalog for StaticCatalog {
    fn list_routes(&self) -> Vec<Arc<Route>> {
        self.routes.clone()
    }

    fn get_route(&self, id: &str) -> Result<Arc<Route>, RouteError> {
        self.routes
            .iter()
            .find(|route| route.id == id)
            .cloned()
            .ok_or_else(|| RouteError::NotFound(id.to_string()))
    }
}

fn resolve_route(
    record: RouteRecord,
    coordinates: &HashMap<String, Coordinate>,
) -> Result<Route, RouteError> {
    let stops = record
        .stops
        .into_iter()
        .map(|stop| {
            let coordinate =
                coordinates
                    .get(&stop.name)
                    .copied()
                    .ok_or_else(|| RouteError::UnknownStop {
                        route_id: record.id.clone(),
                        stop: stop.name.clone(),
                    })?;
            Ok(Stop {
                name: stop.name,
                time: stop.time,
                coordinate,
            })
        })
        .collect::<Result<Vec<_>, RouteError>>()?;

    Route::new(record.id, record.name, stops)
}
