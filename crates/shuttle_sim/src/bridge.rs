//! Republishes engine events on NATS.
//!
//! The bridge is just another observer: it holds its own [`Subscription`],
//! so a slow NATS link makes the bridge lag and drop events without ever
//! delaying the engine or other observers.

use tracing::{debug, info, warn};

use shuttle_net::subjects::Subjects;
use shuttle_net::{NatsConnection, NetError, WireFormat};

use crate::broadcast::{SimEvent, Subscription};

/// Forwards broadcast events to their NATS subjects.
#[derive(Debug, Clone)]
pub struct NatsBridge {
    subjects: Subjects,
    format: WireFormat,
}

impl NatsBridge {
    #[must_use]
    pub fn new(subjects: Subjects, format: WireFormat) -> Self {
        Self { subjects, format }
    }

    /// The subject and encoded payload for an event. Connect-time snapshots
    /// are private to one observer and are not forwarded.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if the payload cannot be encoded.
    pub fn frame(&self, event: &SimEvent) -> Result<Option<(String, Vec<u8>)>, NetError> {
        let frame = match event {
            SimEvent::Snapshot(_) => return Ok(None),
            SimEvent::BusUpdate(update) => (self.subjects.bus_update(), self.format.encode(&**update)?),
            SimEvent::Status(status) => (self.subjects.status(), self.format.encode(&**status)?),
            SimEvent::Completed(completed) => {
                (self.subjects.completed(), self.format.encode(&**completed)?)
            }
        };
        Ok(Some(frame))
    }

    /// Forward events until the engine shuts down.
    pub async fn run(self, conn: NatsConnection, mut events: Subscription) {
        info!(
            subjects = %self.subjects.events_wildcard(),
            format = %self.format,
            "forwarding simulation events to NATS"
        );
        while let Some(event) = events.recv().await {
            let (subject, payload) = match self.frame(&event) {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e) => {
                    warn!(%e, "failed to encode event");
                    continue;
                }
            };
            if let Err(e) = conn.publish_bytes(&subject, payload).await {
                warn!(%e, subject = %subject, "failed to publish event");
            } else {
                debug!(subject = %subject, "event published");
            }
        }
        info!("event stream closed; bridge stopping");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use shuttle_net::messages::{BusStatus, BusUpdate, RunStatus, SimulationStatus};
    use shuttle_route::Coordinate;

    use super::*;

    fn update() -> BusUpdate {
        BusUpdate {
            route_id: "R01".to_string(),
            route_name: "Route 01".to_string(),
            bus_id: "BUS-R01-1".to_string(),
            location: Coordinate::new(13.3339, 74.7423),
            current_stop_index: 0,
            current_stop_name: "N.R Circle".to_string(),
            next_stop_name: Some("Santhepete".to_string()),
            total_stops: 8,
            progress: 0,
            segment_progress: 0,
            eta: "24 min".to_string(),
            status: BusStatus::AtStop,
            timestamp: Utc::now(),
            uptime_secs: 0,
        }
    }

    #[test]
    fn test_bus_update_frame() {
        let bridge = NatsBridge::new(Subjects::default(), WireFormat::Json);
        let (subject, payload) = bridge
            .frame(&SimEvent::BusUpdate(Arc::new(update())))
            .unwrap()
            .unwrap();
        assert_eq!(subject, "shuttle.events.bus_update");

        let json: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(json["status"], "at_stop");
        assert_eq!(json["location"]["lat"], 13.3339);
        assert_eq!(json["next_stop_name"], "Santhepete");
    }

    #[test]
    fn test_status_frame_msgpack() {
        let bridge = NatsBridge::new(Subjects::new("campus"), WireFormat::MessagePack);
        let status = SimulationStatus {
            route_id: "R01".to_string(),
            route_name: "Route 01".to_string(),
            current_stop_index: 3,
            total_stops: 8,
            is_active: true,
            start_time: Utc::now(),
        };
        let (subject, payload) = bridge
            .frame(&SimEvent::Status(Arc::new(status.clone())))
            .unwrap()
            .unwrap();
        assert_eq!(subject, "campus.events.status");
        let decoded: SimulationStatus = WireFormat::MessagePack.decode(&payload).unwrap();
        assert_eq!(decoded, status);
    }

    #[test]
    fn test_snapshot_not_forwarded() {
        let bridge = NatsBridge::new(Subjects::default(), WireFormat::Json);
        let snapshot = RunStatus {
            route_id: "R01".to_string(),
            route_name: "Route 01".to_string(),
            bus_id: "BUS-R01-1".to_string(),
            current_stop_index: 0,
            current_stop_name: "N.R Circle".to_string(),
            total_stops: 8,
            progress: 0,
            is_active: true,
            start_time: Utc::now(),
            uptime_secs: 0,
        };
        assert!(bridge
            .frame(&SimEvent::Snapshot(Arc::new(snapshot)))
            .unwrap()
            .is_none());
    }
}
