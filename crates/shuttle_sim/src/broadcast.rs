//! Observer fan-out.
//!
//! The [`Broadcaster`] wraps a bounded `tokio::sync::broadcast` channel.
//! Publishing never waits on observers: each observer has its own cursor into
//! the ring buffer, and one that falls more than `capacity` events behind
//! loses the oldest ones instead of holding up the tick loop.
//!
//! A [`Subscription`] is created with the engine's status at the moment of
//! connection and yields it first as [`SimEvent::Snapshot`], so a new
//! observer sees where the bus is without waiting for the next tick.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

use shuttle_net::messages::{BusUpdate, RunStatus, SimulationCompleted, SimulationStatus};

/// An event delivered to observers. Payloads are shared, never mutated.
#[derive(Debug, Clone)]
pub enum SimEvent {
    /// On-connect replay of the current run, delivered to one observer only.
    Snapshot(Arc<RunStatus>),
    /// Full map update, emitted on start and every tick.
    BusUpdate(Arc<BusUpdate>),
    /// Run metadata, emitted with every update and when a run stops.
    Status(Arc<SimulationStatus>),
    /// The run reached its final stop.
    Completed(Arc<SimulationCompleted>),
}

/// Publishing side of the observer channel.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<SimEvent>,
}

impl Broadcaster {
    /// Create a broadcaster buffering up to `capacity` events per observer.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Deliver `event` to every current observer. Returns how many observers
    /// it was queued for; zero observers is not an error.
    pub fn publish(&self, event: SimEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                debug!("no observers connected; event dropped");
                0
            }
        }
    }

    /// Number of connected observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Attach a new observer. `snapshot` is read after the observer is
    /// registered, so nothing published in between is lost; its result is
    /// replayed to this observer first.
    pub fn subscribe(&self, snapshot: impl FnOnce() -> Option<RunStatus>) -> Subscription {
        let rx = self.tx.subscribe();
        Subscription {
            snapshot: snapshot().map(Arc::new),
            rx,
        }
    }
}

/// One observer's view of the event stream.
#[derive(Debug)]
pub struct Subscription {
    snapshot: Option<Arc<RunStatus>>,
    rx: broadcast::Receiver<SimEvent>,
}

impl Subscription {
    /// Wait for the next event. Returns `None` once the engine is gone.
    ///
    /// The connect-time snapshot, if a run was active, is always returned
    /// first. Events missed because this observer lagged are skipped.
    pub async fn recv(&mut self) -> Option<SimEvent> {
        if let Some(snapshot) = self.snapshot.take() {
            return Some(SimEvent::Snapshot(snapshot));
        }
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "observer lagged; dropped oldest events");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<SimEvent> {
        if let Some(snapshot) = self.snapshot.take() {
            return Some(SimEvent::Snapshot(snapshot));
        }
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "observer lagged; dropped oldest events");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn completed(bus_id: &str) -> SimEvent {
        SimEvent::Completed(Arc::new(SimulationCompleted {
            route_id: "R1".to_string(),
            route_name: "Route 1".to_string(),
            bus_id: bus_id.to_string(),
            completed_at: Utc::now(),
        }))
    }

    fn bus_id(event: &SimEvent) -> &str {
        match event {
            SimEvent::Completed(c) => &c.bus_id,
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_publish_without_observers() {
        let hub = Broadcaster::new(4);
        assert_eq!(hub.observer_count(), 0);
        assert_eq!(hub.publish(completed("a")), 0);
    }

    #[test]
    fn test_fan_out_to_all_observers() {
        let hub = Broadcaster::new(4);
        let mut a = hub.subscribe(|| None);
        let mut b = hub.subscribe(|| None);
        assert_eq!(hub.publish(completed("x")), 2);

        assert_eq!(bus_id(&a.try_recv().unwrap()), "x");
        assert_eq!(bus_id(&b.try_recv().unwrap()), "x");
        assert!(a.try_recv().is_none());
    }

    #[test]
    fn test_late_observer_misses_earlier_events() {
        let hub = Broadcaster::new(4);
        let _early = hub.subscribe(|| None);
        hub.publish(completed("before"));
        let mut late = hub.subscribe(|| None);
        hub.publish(completed("after"));

        assert_eq!(bus_id(&late.try_recv().unwrap()), "after");
        assert!(late.try_recv().is_none());
    }

    #[test]
    fn test_lagging_observer_does_not_block_others() {
        let hub = Broadcaster::new(2);
        let mut slow = hub.subscribe(|| None);
        let mut fast = hub.subscribe(|| None);

        for i in 0..5 {
            hub.publish(completed(&i.to_string()));
            assert_eq!(bus_id(&fast.try_recv().unwrap()), i.to_string());
        }

        // Only the newest `capacity` events survive for the slow observer.
        assert_eq!(bus_id(&slow.try_recv().unwrap()), "3");
        assert_eq!(bus_id(&slow.try_recv().unwrap()), "4");
        assert!(slow.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_snapshot_replayed_first() {
        let hub = Broadcaster::new(4);
        let status = RunStatus {
            route_id: "R1".to_string(),
            route_name: "Route 1".to_string(),
            bus_id: "BUS-R1-1".to_string(),
            current_stop_index: 2,
            current_stop_name: "C".to_string(),
            total_stops: 3,
            progress: 67,
            is_active: true,
            start_time: Utc::now(),
            uptime_secs: 0,
        };
        let mut sub = hub.subscribe(|| Some(status));
        hub.publish(completed("BUS-R1-1"));

        match sub.recv().await.unwrap() {
            SimEvent::Snapshot(s) => assert_eq!(s.current_stop_index, 2),
            other => panic!("expected snapshot, got {other:?}"),
        }
        assert_eq!(bus_id(&sub.recv().await.unwrap()), "BUS-R1-1");
    }

    #[tokio::test]
    async fn test_recv_ends_when_broadcaster_dropped() {
        let hub = Broadcaster::new(4);
        let mut sub = hub.subscribe(|| None);
        drop(hub);
        assert!(sub.recv().await.is_none());
    }
}
