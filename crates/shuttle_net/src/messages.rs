//! Message types exchanged between the simulator and its observers.
//!
//! Broadcast events ([`BusUpdate`], [`SimulationStatus`],
//! [`SimulationCompleted`]) and control payloads all derive `Serialize` and
//! `Deserialize` and travel as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shuttle_route::{Coordinate, Route};

// ── Broadcast events ────────────────────────────────────────────────────────

/// Where the bus is relative to its stops.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BusStatus {
    /// Standing at `current_stop_index`.
    AtStop,
    /// Between `current_stop_index` and the next stop.
    Moving,
    /// The run reached its final stop and has ended.
    Completed,
}

/// A snapshot of the simulated bus, emitted on every tick.
///
/// Published on [`Subjects::bus_update`](crate::subjects::Subjects::bus_update).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusUpdate {
    pub route_id: String,
    pub route_name: String,
    /// Run-scoped identifier correlating every message of one run.
    pub bus_id: String,
    /// Interpolated position.
    pub location: Coordinate,
    pub current_stop_index: usize,
    pub current_stop_name: String,
    /// `None` at the final stop.
    pub next_stop_name: Option<String>,
    pub total_stops: usize,
    /// Whole-route progress, in percent.
    pub progress: u8,
    /// Progress within the current stop-to-stop segment, in percent.
    pub segment_progress: u8,
    /// Display ETA, `"<n> min"` or `"Arrived"`.
    pub eta: String,
    pub status: BusStatus,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the run started.
    pub uptime_secs: u64,
}

/// Lightweight run metadata for control-panel views.
///
/// Published on [`Subjects::status`](crate::subjects::Subjects::status)
/// alongside every bus update, and with `is_active = false` when a run is
/// stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationStatus {
    pub route_id: String,
    pub route_name: String,
    pub current_stop_index: usize,
    pub total_stops: usize,
    pub is_active: bool,
    pub start_time: DateTime<Utc>,
}

/// Published once when a run reaches its final stop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationCompleted {
    pub route_id: String,
    pub route_name: String,
    pub bus_id: String,
    pub completed_at: DateTime<Utc>,
}

/// Point-in-time view of the active run, returned by `status()` and
/// replayed to observers when they connect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunStatus {
    pub route_id: String,
    pub route_name: String,
    pub bus_id: String,
    pub current_stop_index: usize,
    pub current_stop_name: String,
    pub total_stops: usize,
    /// Whole-route progress, in percent.
    pub progress: u8,
    pub is_active: bool,
    pub start_time: DateTime<Utc>,
    pub uptime_secs: u64,
}

// ── Control requests ────────────────────────────────────────────────────────

/// Body of `control.start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub route_id: String,
}

/// Body of `routes.get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    #[serde(default)]
    pub route_id: String,
}

/// Reply body of `control.stop`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StopResponse {
    /// `false` if no run was active.
    pub stopped: bool,
}

/// Reply body of `control.advance`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdvanceResponse {
    /// `false` if the bus was already at its final stop.
    pub moved: bool,
}

/// Reply body of `health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub routes: usize,
    pub simulation_active: bool,
}

// ── Route listings ──────────────────────────────────────────────────────────

/// A stop as presented to dashboards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StopView {
    /// `"<route id>-stop-<index>"`.
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub coordinates: Coordinate,
}

/// A route as presented to dashboards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteView {
    pub id: String,
    pub name: String,
    pub total_stops: usize,
    pub stops: Vec<StopView>,
}

impl From<&Route> for RouteView {
    fn from(route: &Route) -> Self {
        Self {
            id: route.id.clone(),
            name: route.name.clone(),
            total_stops: route.len(),
            stops: route
                .stops()
                .iter()
                .enumerate()
                .map(|(index, stop)| StopView {
                    id: route.stop_id(index),
                    name: stop.name.clone(),
                    time: stop.time.clone(),
                    coordinates: stop.coordinate,
                })
                .collect(),
        }
    }
}

// ── Reply envelope ──────────────────────────────────────────────────────────

/// Structured error carried in a reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    /// Stable machine-readable kind, e.g. `"route_not_found"`.
    pub kind: String,
    pub message: String,
}

/// Envelope for every request/reply answer: exactly one of `ok` or `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    /// `Some(Value::Null)` for a successful reply with no body, e.g. an idle
    /// status. Only an absent field reads back as `None`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub ok: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl ApiResponse {
    /// A successful reply carrying `value` (which may be `null`).
    #[must_use]
    pub fn ok(value: Value) -> Self {
        Self {
            ok: Some(value),
            error: None,
        }
    }

    /// A successful reply built from any serialisable value.
    #[must_use]
    pub fn ok_from<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => Self::ok(v),
            Err(e) => Self::error("internal", format!("failed to encode reply: {e}")),
        }
    }

    /// A failed reply.
    #[must_use]
    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: None,
            error: Some(ApiError {
                kind: kind.into(),
                message: message.into(),
            }),
        }
    }

    /// Serialise the envelope to JSON bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_else(|_| b"{}".to_vec())
    }
}

#[cfg(test)]
mod tests {
    use shuttle_route::Stop;

    use super::*;

    #[test]
    fn test_bus_status_wire_names() {
        assert_eq!(
            serde_json::to_value(BusStatus::AtStop).unwrap(),
            "at_stop"
        );
        assert_eq!(serde_json::to_value(BusStatus::Moving).unwrap(), "moving");
        assert_eq!(
            serde_json::to_value(BusStatus::Completed).unwrap(),
            "completed"
        );
    }

    #[test]
    fn test_route_view_assigns_stop_ids() {
        let route = Route::new(
            "R2",
            "Route 02",
            vec![
                Stop::new("Stadium", Coordinate::new(13.3351, 74.7446)).with_time("08:40"),
                Stop::new("College", Coordinate::new(13.3471, 74.7558)),
            ],
        )
        .unwrap();

        let view = RouteView::from(&route);
        assert_eq!(view.total_stops, 2);
        assert_eq!(view.stops[0].id, "R2-stop-0");
        assert_eq!(view.stops[1].id, "R2-stop-1");
        assert_eq!(view.stops[0].time.as_deref(), Some("08:40"));

        let json = serde_json::to_value(&view).unwrap();
        assert!(json["stops"][1].get("time").is_none());
        assert_eq!(json["stops"][1]["coordinates"]["lat"], 13.3471);
    }

    #[test]
    fn test_api_response_shape() {
        let ok = serde_json::to_value(ApiResponse::ok(Value::Null)).unwrap();
        assert_eq!(ok, serde_json::json!({ "ok": null }));

        let err = serde_json::to_value(ApiResponse::error("route_not_found", "no R9")).unwrap();
        assert_eq!(
            err,
            serde_json::json!({ "error": { "kind": "route_not_found", "message": "no R9" } })
        );
    }

    #[test]
    fn test_api_response_null_ok_reads_back() {
        let idle: ApiResponse =
            serde_json::from_slice(&ApiResponse::ok(Value::Null).to_bytes()).unwrap();
        assert_eq!(idle.ok, Some(Value::Null));
        assert!(idle.error.is_none());

        let err: ApiResponse =
            serde_json::from_slice(&ApiResponse::error("no_active_run", "idle").to_bytes()).unwrap();
        assert!(err.ok.is_none());
        assert_eq!(err.error.unwrap().kind, "no_active_run");

        let empty: ApiResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.ok.is_none());
    }

    #[test]
    fn test_start_request_missing_route_defaults_empty() {
        let req: StartRequest = serde_json::from_str("{}").unwrap();
        assert!(req.route_id.is_empty());
    }
}
