//! NATS control surface: request/reply operations on the engine.
//!
//! Subjects (all under the configured prefix, default `shuttle`):
//!
//!   Control:
//!     {prefix}.control.start      `{"route_id": "R01"}` → run status
//!     {prefix}.control.stop       → `{"stopped": bool}`
//!     {prefix}.control.status     → run status or `null`
//!     {prefix}.control.advance    jump to the next stop → `{"moved": bool}`
//!     {prefix}.control.reset      rewind to the first stop → run status
//!
//!   Routes:
//!     {prefix}.routes.list        all routes with stop coordinates
//!     {prefix}.routes.get         `{"route_id": "R01"}` → one route
//!
//!   Observers:
//!     {prefix}.observer.connect   current status, sent once on connect
//!     {prefix}.observer.status    current status, on demand
//!
//!   {prefix}.health               service health report
//!
//! Replies are JSON envelopes: `{"ok": ...}` or
//! `{"error": {"kind": ..., "message": ...}}`.

use chrono::Utc;
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use shuttle_net::messages::{
    AdvanceResponse, ApiResponse, HealthReport, RouteRequest, RouteView, StartRequest,
    StopResponse,
};
use shuttle_net::subjects::Subjects;
use shuttle_net::{NatsConnection, NetError, decode_json};

use crate::engine::{Engine, StopOutcome};
use crate::error::SimError;

/// Dispatches control requests to an [`Engine`].
#[derive(Debug, Clone)]
pub struct ControlApi {
    engine: Engine,
}

impl ControlApi {
    #[must_use]
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    /// Answer requests on NATS until the connection closes.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if subscribing fails.
    pub async fn serve(&self, conn: &NatsConnection, subjects: &Subjects) -> Result<(), NetError> {
        let mut subscriptions = Vec::new();
        for subject in subjects.request_subjects() {
            info!(subject = %subject, "subscribing to control subject");
            subscriptions.push(conn.subscribe(&subject).await?);
        }
        let mut requests = futures::stream::select_all(subscriptions);

        info!("control surface ready, listening for requests");

        while let Some(msg) = requests.next().await {
            let Some(op) = subjects.operation(msg.subject.as_str()) else {
                continue;
            };
            debug!(op = %op, "received request");

            let response = self.handle(op, &msg.payload).await;

            if let Some(reply_to) = msg.reply {
                if let Err(e) = conn.publish_bytes(reply_to.as_str(), response.to_bytes()).await {
                    error!(%e, "failed to publish reply");
                }
            }
        }

        Ok(())
    }

    /// Handle one operation (the subject with its prefix stripped).
    pub async fn handle(&self, op: &str, payload: &[u8]) -> ApiResponse {
        match op {
            "control.start" => self.handle_start(payload).await,
            "control.stop" => self.handle_stop().await,
            "control.status" | "observer.connect" | "observer.status" => self.handle_status(),
            "control.advance" => self.handle_advance().await,
            "control.reset" => self.handle_reset().await,
            "routes.list" => self.handle_routes(),
            "routes.get" => self.handle_route(payload),
            "health" => self.handle_health(),
            _ => {
                warn!(op = %op, "unknown operation");
                ApiResponse::error("unknown_operation", format!("unknown operation: {op}"))
            }
        }
    }

    // -- Handlers --

    async fn handle_start(&self, payload: &[u8]) -> ApiResponse {
        let req: StartRequest = match decode_json::<Option<StartRequest>>(payload) {
            Ok(Some(r)) if !r.route_id.trim().is_empty() => r,
            Ok(_) => return ApiResponse::error("invalid_request", "route_id is required"),
            Err(e) => return ApiResponse::error("invalid_request", format!("invalid request: {e}")),
        };

        match self.engine.start(req.route_id.trim()).await {
            Ok(status) => ApiResponse::ok_from(&status),
            Err(e) => sim_error(&e),
        }
    }

    async fn handle_stop(&self) -> ApiResponse {
        match self.engine.stop().await {
            Ok(StopOutcome::Stopped { .. }) => ApiResponse::ok_from(&StopResponse { stopped: true }),
            Ok(StopOutcome::AlreadyIdle) => ApiResponse::ok_from(&StopResponse { stopped: false }),
            Err(e) => sim_error(&e),
        }
    }

    fn handle_status(&self) -> ApiResponse {
        match self.engine.status() {
            Some(status) => ApiResponse::ok_from(&status),
            None => ApiResponse::ok(Value::Null),
        }
    }

    async fn handle_advance(&self) -> ApiResponse {
        match self.engine.advance().await {
            Ok(moved) => ApiResponse::ok_from(&AdvanceResponse { moved }),
            Err(e) => sim_error(&e),
        }
    }

    async fn handle_reset(&self) -> ApiResponse {
        match self.engine.reset().await {
            Ok(status) => ApiResponse::ok_from(&status),
            Err(e) => sim_error(&e),
        }
    }

    fn handle_routes(&self) -> ApiResponse {
        let routes: Vec<RouteView> = self
            .engine
            .catalog()
            .list_routes()
            .iter()
            .map(|route| RouteView::from(&**route))
            .collect();
        ApiResponse::ok(serde_json::json!({
            "count": routes.len(),
            "routes": routes,
        }))
    }

    fn handle_route(&self, payload: &[u8]) -> ApiResponse {
        let req: RouteRequest = match decode_json::<Option<RouteRequest>>(payload) {
            Ok(Some(r)) if !r.route_id.trim().is_empty() => r,
            Ok(_) => return ApiResponse::error("invalid_request", "route_id is required"),
            Err(e) => return ApiResponse::error("invalid_request", format!("invalid request: {e}")),
        };

        match self.engine.catalog().get_route(req.route_id.trim()) {
            Ok(route) => ApiResponse::ok_from(&RouteView::from(&*route)),
            Err(e) => sim_error(&SimError::from(e)),
        }
    }

    fn handle_health(&self) -> ApiResponse {
        ApiResponse::ok_from(&HealthReport {
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            routes: self.engine.catalog().list_routes().len(),
            simulation_active: self.engine.is_running(),
        })
    }
}

fn sim_error(e: &SimError) -> ApiResponse {
    ApiResponse::error(e.kind(), e.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use shuttle_route::{Coordinate, Route, StaticCatalog, Stop};

    use super::*;
    use crate::config::SimConfig;

    fn api() -> ControlApi {
        let route = Route::new(
            "R01",
            "Route 01",
            vec![
                Stop::new("N.R Circle", Coordinate::new(13.3339, 74.7423)).with_time("08:30"),
                Stop::new("Santhepete", Coordinate::new(13.3355, 74.7445)),
                Stop::new("College", Coordinate::new(13.3471, 74.7558)),
            ],
        )
        .unwrap();
        let catalog = Arc::new(StaticCatalog::new(vec![route]).unwrap());
        ControlApi::new(Engine::spawn(catalog, SimConfig::default()))
    }

    fn ok(response: ApiResponse) -> Value {
        assert!(response.error.is_none(), "unexpected error: {:?}", response.error);
        response.ok.expect("missing ok payload")
    }

    fn error_kind(response: ApiResponse) -> String {
        response.error.expect("expected an error").kind
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_status_stop() {
        let api = api();

        let started = ok(api.handle("control.start", br#"{"route_id":"R01"}"#).await);
        assert_eq!(started["route_id"], "R01");
        assert_eq!(started["current_stop_index"], 0);
        assert_eq!(started["is_active"], true);

        let status = ok(api.handle("control.status", b"").await);
        assert_eq!(status["bus_id"], started["bus_id"]);

        let stopped = ok(api.handle("control.stop", b"").await);
        assert_eq!(stopped["stopped"], true);

        let status = ok(api.handle("control.status", b"").await);
        assert!(status.is_null());

        // Stopping again is still a success.
        let stopped = ok(api.handle("control.stop", b"").await);
        assert_eq!(stopped["stopped"], false);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_validation() {
        let api = api();
        assert_eq!(
            error_kind(api.handle("control.start", b"").await),
            "invalid_request"
        );
        assert_eq!(
            error_kind(api.handle("control.start", br#"{"route_id":"  "}"#).await),
            "invalid_request"
        );
        assert_eq!(
            error_kind(api.handle("control.start", b"not json").await),
            "invalid_request"
        );
        assert_eq!(
            error_kind(api.handle("control.start", br#"{"route_id":"R99"}"#).await),
            "route_not_found"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_advance_and_reset_require_run() {
        let api = api();
        assert_eq!(
            error_kind(api.handle("control.advance", b"").await),
            "no_active_run"
        );
        assert_eq!(
            error_kind(api.handle("control.reset", b"").await),
            "no_active_run"
        );

        ok(api.handle("control.start", br#"{"route_id":"R01"}"#).await);
        let moved = ok(api.handle("control.advance", b"").await);
        assert_eq!(moved["moved"], true);
        let status = ok(api.handle("observer.status", b"").await);
        assert_eq!(status["current_stop_name"], "Santhepete");

        let reset = ok(api.handle("control.reset", b"").await);
        assert_eq!(reset["current_stop_index"], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_routes() {
        let api = api();
        let list = ok(api.handle("routes.list", b"").await);
        assert_eq!(list["count"], 1);
        assert_eq!(list["routes"][0]["stops"][2]["id"], "R01-stop-2");
        assert_eq!(list["routes"][0]["stops"][0]["time"], "08:30");

        let route = ok(api.handle("routes.get", br#"{"route_id":"R01"}"#).await);
        assert_eq!(route["total_stops"], 3);
        assert_eq!(route["stops"][2]["coordinates"]["lat"], 13.3471);

        assert_eq!(
            error_kind(api.handle("routes.get", br#"{"route_id":"R02"}"#).await),
            "route_not_found"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_and_unknown_operation() {
        let api = api();
        let health = ok(api.handle("health", b"").await);
        assert_eq!(health["service"], "shuttle_sim");
        assert_eq!(health["routes"], 1);
        assert_eq!(health["simulation_active"], false);

        assert_eq!(
            error_kind(api.handle("control.teleport", b"").await),
            "unknown_operation"
        );
    }
}
