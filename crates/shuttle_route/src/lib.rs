//! # shuttle_route
//!
//! The route catalog consumed by the shuttle simulator.
//!
//! This crate provides:
//!
//! - [`Coordinate`]: a latitude/longitude pair with linear interpolation.
//! - [`Stop`] and [`Route`]: immutable route definitions.
//! - [`RouteCatalog`]: the lookup contract the simulator reads routes through.
//! - [`StaticCatalog`]: a catalog loaded once from a JSON file.
//!
//! Stop coordinates are resolved from a single coordinate table when the
//! catalog is loaded. Nothing downstream keeps its own copy.

pub mod catalog;
pub mod coordinate;
pub mod error;
pub mod route;

pub use catalog::{RouteCatalog, StaticCatalog};
pub use coordinate::Coordinate;
pub use error::RouteError;
pub use route::{Route, Stop};
