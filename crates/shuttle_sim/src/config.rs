//! Simulator configuration.

use std::time::Duration;

/// Cadence and sizing of the simulation engine.
///
/// Every segment between two stops takes the same number of ticks regardless
/// of the distance between them.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Wall-clock time between ticks.
    pub tick_period: Duration,
    /// Ticks needed to travel from one stop to the next. Progress advances
    /// by `1 / ticks_per_segment` per tick.
    pub ticks_per_segment: u32,
    /// Nominal travel time per stop, used for the ETA estimate.
    pub minutes_per_stop: f64,
    /// Events buffered per observer before the oldest are dropped.
    pub broadcast_capacity: usize,
    /// Control commands buffered ahead of the engine.
    pub command_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(5),
            ticks_per_segment: 5,
            minutes_per_stop: 3.0,
            broadcast_capacity: 64,
            command_capacity: 32,
        }
    }
}

impl SimConfig {
    /// Override the tick period.
    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period.max(Duration::from_millis(1));
        self
    }

    /// Override the number of ticks per stop-to-stop segment (at least 1).
    #[must_use]
    pub fn with_ticks_per_segment(mut self, ticks: u32) -> Self {
        self.ticks_per_segment = ticks.max(1);
        self
    }

    /// Override the per-stop ETA weight.
    #[must_use]
    pub fn with_minutes_per_stop(mut self, minutes: f64) -> Self {
        self.minutes_per_stop = minutes.max(0.0);
        self
    }

    /// Override the per-observer event buffer (at least 1).
    #[must_use]
    pub fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity.max(1);
        self
    }

    /// Apply the builder limits to every field. Fields are public, so the
    /// engine runs its config through this before using it.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            tick_period: self.tick_period.max(Duration::from_millis(1)),
            ticks_per_segment: self.ticks_per_segment.max(1),
            minutes_per_stop: self.minutes_per_stop.max(0.0),
            broadcast_capacity: self.broadcast_capacity.max(1),
            command_capacity: self.command_capacity.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cadence() {
        let config = SimConfig::default();
        assert_eq!(config.tick_period, Duration::from_secs(5));
        assert_eq!(config.ticks_per_segment, 5);
        assert!((config.minutes_per_stop - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_builders_clamp() {
        let config = SimConfig::default()
            .with_ticks_per_segment(0)
            .with_tick_period(Duration::ZERO)
            .with_minutes_per_stop(-1.0)
            .with_broadcast_capacity(0);
        assert_eq!(config.ticks_per_segment, 1);
        assert_eq!(config.tick_period, Duration::from_millis(1));
        assert_eq!(config.minutes_per_stop, 0.0);
        assert_eq!(config.broadcast_capacity, 1);
    }

    #[test]
    fn test_clamped_fixes_literal_config() {
        let config = SimConfig {
            tick_period: Duration::ZERO,
            ticks_per_segment: 0,
            minutes_per_stop: f64::NAN,
            broadcast_capacity: 0,
            command_capacity: 0,
        }
        .clamped();
        assert_eq!(config.tick_period, Duration::from_millis(1));
        assert_eq!(config.ticks_per_segment, 1);
        assert_eq!(config.minutes_per_stop, 0.0);
        assert_eq!(config.broadcast_capacity, 1);
        assert_eq!(config.command_capacity, 1);

        let defaults = SimConfig::default().clamped();
        assert_eq!(defaults.tick_period, Duration::from_secs(5));
        assert_eq!(defaults.ticks_per_segment, 5);
    }
}
