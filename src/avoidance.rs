// Obstacle avoidance policy for the autonomous node
//
// Drive forward until something is closer than the threshold, then run a
// fixed stop -> turn right -> stop sequence before cruising again. The
// sequence is driven by deadlines instead of sleeps so it can be stepped
// against any clock.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{OBSTACLE_THRESHOLD_CM, SAMPLE_PERIOD, STOP_SETTLE, TURN_DURATION};
use crate::messages::Intent;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid avoidance config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for the avoidance routine, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AvoidanceConfig {
    pub threshold_cm: u32,
    pub stop_settle_ms: u64,
    pub turn_duration_ms: u64,
    pub sample_period_ms: u64,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            threshold_cm: OBSTACLE_THRESHOLD_CM,
            stop_settle_ms: STOP_SETTLE.as_millis() as u64,
            turn_duration_ms: TURN_DURATION.as_millis() as u64,
            sample_period_ms: SAMPLE_PERIOD.as_millis() as u64,
        }
    }
}

impl AvoidanceConfig {
    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn stop_settle(&self) -> Duration {
        Duration::from_millis(self.stop_settle_ms)
    }

    pub fn turn_duration(&self) -> Duration {
        Duration::from_millis(self.turn_duration_ms)
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }

    /// A reading of 0 means the sensor timed out and never counts
    pub fn is_obstacle(&self, distance_cm: u32) -> bool {
        distance_cm > 0 && distance_cm < self.threshold_cm
    }
}

/// Step of the avoidance sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvoidPhase {
    Settle,
    Turn,
    Resettle,
}

impl AvoidPhase {
    fn intent(self) -> Intent {
        match self {
            AvoidPhase::Settle | AvoidPhase::Resettle => Intent::Stop,
            AvoidPhase::Turn => Intent::TurnRight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObstacleState {
    #[default]
    Cruising,
    Avoiding(AvoidPhase),
}

pub struct ObstaclePolicy {
    config: AvoidanceConfig,
    state: ObstacleState,
    deadline: Option<Instant>,
}

impl ObstaclePolicy {
    pub fn new(config: AvoidanceConfig) -> Self {
        Self {
            config,
            state: ObstacleState::Cruising,
            deadline: None,
        }
    }

    pub fn state(&self) -> ObstacleState {
        self.state
    }

    pub fn config(&self) -> &AvoidanceConfig {
        &self.config
    }

    /// When the current avoidance phase ends, if one is running
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Decide on a fresh distance sample
    ///
    /// While avoiding, the sample is ignored and the current phase's intent
    /// is returned unchanged.
    pub fn on_distance(&mut self, distance_cm: u32, now: Instant) -> Intent {
        match self.state {
            ObstacleState::Avoiding(phase) => {
                debug!("Ignoring {} cm reading during {:?}", distance_cm, phase);
                phase.intent()
            }
            ObstacleState::Cruising if self.config.is_obstacle(distance_cm) => {
                info!("Obstacle at {} cm, avoiding", distance_cm);
                self.enter(AvoidPhase::Settle, now + self.config.stop_settle())
            }
            ObstacleState::Cruising => Intent::Forward,
        }
    }

    /// Advance the avoidance sequence once its deadline has passed
    ///
    /// Returns the intent for the new phase, or `None` when nothing changes
    /// (deadline not reached, or the sequence just finished).
    pub fn on_deadline(&mut self, now: Instant) -> Option<Intent> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }

        match self.state {
            ObstacleState::Avoiding(AvoidPhase::Settle) => {
                Some(self.enter(AvoidPhase::Turn, deadline + self.config.turn_duration()))
            }
            ObstacleState::Avoiding(AvoidPhase::Turn) => {
                Some(self.enter(AvoidPhase::Resettle, deadline + self.config.stop_settle()))
            }
            ObstacleState::Avoiding(AvoidPhase::Resettle) | ObstacleState::Cruising => {
                debug!("Avoidance finished, cruising");
                self.state = ObstacleState::Cruising;
                self.deadline = None;
                None
            }
        }
    }

    fn enter(&mut self, phase: AvoidPhase, deadline: Instant) -> Intent {
        debug!("Entering {:?}", phase);
        self.state = ObstacleState::Avoiding(phase);
        self.deadline = Some(deadline);
        phase.intent()
    }
}

/// Time source for the control loop
pub trait Clock: Send {
    fn now(&self) -> Instant;

    fn sleep_until(&mut self, deadline: Instant);

    fn sleep(&mut self, duration: Duration) {
        let deadline = self.now() + duration;
        self.sleep_until(deadline);
    }
}

/// Wall clock backed by `std::thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&mut self, deadline: Instant) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
    }
}

/// Clock that jumps straight to every deadline
#[cfg(test)]
pub(crate) struct ManualClock {
    now: Instant,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new() -> Self {
        Self {
            now: Instant::now(),
        }
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now
    }

    fn sleep_until(&mut self, deadline: Instant) {
        if deadline > self.now {
            self.now = deadline;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_clear_path_goes_forward() {
        let mut policy = ObstaclePolicy::new(AvoidanceConfig::default());
        let now = Instant::now();
        assert_eq!(policy.on_distance(50, now), Intent::Forward);
        assert_eq!(policy.on_distance(10, now), Intent::Forward); // threshold is exclusive
        assert_eq!(policy.state(), ObstacleState::Cruising);
        assert_eq!(policy.next_deadline(), None);
    }

    #[test]
    fn test_zero_reading_fails_open() {
        let mut policy = ObstaclePolicy::new(AvoidanceConfig::default());
        assert_eq!(policy.on_distance(0, Instant::now()), Intent::Forward);
        assert_eq!(policy.state(), ObstacleState::Cruising);
    }

    #[test]
    fn test_full_avoidance_sequence() {
        let mut policy = ObstaclePolicy::new(AvoidanceConfig::default());
        let t0 = Instant::now();

        assert_eq!(policy.on_distance(8, t0), Intent::Stop);
        assert_eq!(policy.state(), ObstacleState::Avoiding(AvoidPhase::Settle));
        assert_eq!(policy.next_deadline(), Some(t0 + ms(500)));

        // Too early: nothing happens
        assert_eq!(policy.on_deadline(t0 + ms(499)), None);

        assert_eq!(policy.on_deadline(t0 + ms(500)), Some(Intent::TurnRight));
        assert_eq!(policy.next_deadline(), Some(t0 + ms(1000)));

        assert_eq!(policy.on_deadline(t0 + ms(1000)), Some(Intent::Stop));
        assert_eq!(policy.state(), ObstacleState::Avoiding(AvoidPhase::Resettle));

        assert_eq!(policy.on_deadline(t0 + ms(1500)), None);
        assert_eq!(policy.state(), ObstacleState::Cruising);
        assert_eq!(policy.next_deadline(), None);
    }

    #[test]
    fn test_readings_ignored_while_avoiding() {
        let mut policy = ObstaclePolicy::new(AvoidanceConfig::default());
        let t0 = Instant::now();
        policy.on_distance(5, t0);
        policy.on_deadline(t0 + ms(500));

        assert_eq!(policy.on_distance(100, t0 + ms(600)), Intent::TurnRight);
        assert_eq!(policy.state(), ObstacleState::Avoiding(AvoidPhase::Turn));
        assert_eq!(policy.next_deadline(), Some(t0 + ms(1000)));
    }

    #[test]
    fn test_late_wakeup_keeps_schedule() {
        let mut policy = ObstaclePolicy::new(AvoidanceConfig::default());
        let t0 = Instant::now();
        policy.on_distance(5, t0);

        // Deadlines are chained from the previous deadline, not from `now`
        policy.on_deadline(t0 + ms(700));
        assert_eq!(policy.next_deadline(), Some(t0 + ms(1000)));
    }

    #[test]
    fn test_custom_turn_duration() {
        let config = AvoidanceConfig {
            turn_duration_ms: 1200,
            ..AvoidanceConfig::default()
        };
        let mut policy = ObstaclePolicy::new(config);
        let t0 = Instant::now();
        policy.on_distance(3, t0);
        policy.on_deadline(t0 + ms(500));
        assert_eq!(policy.next_deadline(), Some(t0 + ms(1700)));
    }

    #[test]
    fn test_config_partial_json() {
        let config: AvoidanceConfig = serde_json::from_str(r#"{"threshold_cm": 20}"#).unwrap();
        assert_eq!(config.threshold_cm, 20);
        assert_eq!(config.turn_duration(), TURN_DURATION);
        assert!(config.is_obstacle(15));
        assert!(!config.is_obstacle(0));
    }

    #[test]
    fn test_config_rejects_unknown_field() {
        let err = serde_json::from_str::<AvoidanceConfig>(r#"{"threshold": 20}"#).unwrap_err();
        assert!(err.to_string().contains("threshold"));
    }

    #[test]
    fn test_config_missing_file() {
        let err = AvoidanceConfig::from_file("/nonexistent/avoidance.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_manual_clock_never_goes_back() {
        let mut clock = ManualClock::new();
        let start = clock.now();
        clock.sleep(ms(100));
        clock.sleep_until(start);
        assert_eq!(clock.now(), start + ms(100));
    }
}
