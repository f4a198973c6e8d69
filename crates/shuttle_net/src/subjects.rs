//! NATS subject hierarchy.
//!
//! Every subject lives under a configurable prefix (default `shuttle`) so
//! several simulators can share one NATS cluster:
//!
//! ```text
//! <prefix>.events.bus_update     BusUpdate, every tick       Simulator → *
//! <prefix>.events.status         SimulationStatus            Simulator → *
//! <prefix>.events.completed      SimulationCompleted         Simulator → *
//! <prefix>.observer.connect      request → current status    Observer → Simulator
//! <prefix>.observer.status       request → current status    Observer → Simulator
//! <prefix>.control.<op>          start | stop | status | advance | reset
//! <prefix>.routes.<op>           list | get
//! <prefix>.health                request → health report
//! ```

/// Default prefix for all simulator subjects.
pub const DEFAULT_PREFIX: &str = "shuttle";

/// Subject builder bound to a prefix.
#[derive(Debug, Clone)]
pub struct Subjects {
    prefix: String,
}

impl Default for Subjects {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl Subjects {
    /// Create a subject builder for the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    // ── Broadcast events ────────────────────────────────────────────────────

    /// `<prefix>.events.bus_update`
    #[must_use]
    pub fn bus_update(&self) -> String {
        format!("{}.events.bus_update", self.prefix)
    }

    /// `<prefix>.events.status`
    #[must_use]
    pub fn status(&self) -> String {
        format!("{}.events.status", self.prefix)
    }

    /// `<prefix>.events.completed`
    #[must_use]
    pub fn completed(&self) -> String {
        format!("{}.events.completed", self.prefix)
    }

    /// `<prefix>.events.>`: everything an observer needs to follow a run.
    #[must_use]
    pub fn events_wildcard(&self) -> String {
        format!("{}.events.>", self.prefix)
    }

    // ── Request/reply ───────────────────────────────────────────────────────

    /// The wildcard subjects the simulator answers requests on.
    #[must_use]
    pub fn request_subjects(&self) -> Vec<String> {
        vec![
            format!("{}.control.*", self.prefix),
            format!("{}.routes.*", self.prefix),
            format!("{}.observer.*", self.prefix),
            format!("{}.health", self.prefix),
        ]
    }

    /// Strip the prefix from a subject, yielding the operation name
    /// (e.g. `"control.start"`). Returns `None` for foreign subjects.
    #[must_use]
    pub fn operation<'a>(&self, subject: &'a str) -> Option<&'a str> {
        subject
            .strip_prefix(self.prefix.as_str())
            .and_then(|s| s.strip_prefix('.'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_subjects() {
        let s = Subjects::default();
        assert_eq!(s.bus_update(), "shuttle.events.bus_update");
        assert_eq!(s.status(), "shuttle.events.status");
        assert_eq!(s.completed(), "shuttle.events.completed");
        assert_eq!(s.events_wildcard(), "shuttle.events.>");
    }

    #[test]
    fn test_custom_prefix() {
        let s = Subjects::new("campus.east");
        assert_eq!(s.bus_update(), "campus.east.events.bus_update");
        assert_eq!(
            s.operation("campus.east.control.stop"),
            Some("control.stop")
        );
        assert!(s.request_subjects().contains(&"campus.east.health".to_string()));
    }

    #[test]
    fn test_operation_strips_prefix() {
        let s = Subjects::default();
        assert_eq!(s.operation("shuttle.control.start"), Some("control.start"));
        assert_eq!(s.operation("shuttle.health"), Some("health"));
        assert_eq!(s.operation("other.control.start"), None);
        assert_eq!(s.operation("shuttlex.health"), None);
    }
}
