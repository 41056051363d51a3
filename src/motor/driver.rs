// High-level motor driver for the two-wheel base
//
// Combines the actuation model with two wheel outputs to provide a simple
// API for driving the base from an intent.

use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use super::actuation::{compute_wheel_commands, Direction, SpeedProfile, Wheel, WheelCommand};
use super::hbridge::HardwareError;
use crate::messages::{DriveState, Intent};

/// One physical wheel as seen by the driver
pub trait WheelOutput: Send {
    fn set_direction(&mut self, direction: Direction) -> Result<(), HardwareError>;

    /// Duty is on the `0..=DUTY_MAX` scale
    fn set_duty(&mut self, duty: u16) -> Result<(), HardwareError>;
}

/// High-level driver owning both wheels of the base
pub struct DifferentialDrive {
    left: Box<dyn WheelOutput>,
    right: Box<dyn WheelOutput>,
    profile: SpeedProfile,
    last_intent: Option<Intent>,
}

impl DifferentialDrive {
    pub fn new(
        left: Box<dyn WheelOutput>,
        right: Box<dyn WheelOutput>,
        profile: SpeedProfile,
    ) -> Self {
        info!(
            "Drive ready: left duty={}, right duty={}",
            profile.left_duty(),
            profile.right_duty()
        );
        Self {
            left,
            right,
            profile,
            last_intent: None,
        }
    }

    /// Drive both wheels according to `intent`
    ///
    /// Each wheel gets its direction before its duty, so a wheel never runs
    /// the new duty in the old direction.
    pub fn apply(&mut self, intent: Intent) -> Result<DriveState, HardwareError> {
        let (left, right) = compute_wheel_commands(intent, &self.profile);
        debug!(
            "Applying {:?}: left={:?}/{}, right={:?}/{}",
            intent, left.direction, left.duty, right.direction, right.duty
        );

        write_wheel(self.left.as_mut(), &left)?;
        write_wheel(self.right.as_mut(), &right)?;
        self.last_intent = Some(intent);

        Ok(DriveState {
            intent,
            left,
            right,
        })
    }

    /// Stop both wheels immediately
    pub fn stop(&mut self) -> Result<DriveState, HardwareError> {
        self.apply(Intent::Stop)
    }

    /// Last intent successfully applied, if any
    pub fn last_intent(&self) -> Option<Intent> {
        self.last_intent
    }
}

fn write_wheel(output: &mut dyn WheelOutput, cmd: &WheelCommand) -> Result<(), HardwareError> {
    if let Some(direction) = cmd.direction {
        output.set_direction(direction)?;
    }
    output.set_duty(cmd.duty)
}

impl Drop for DifferentialDrive {
    fn drop(&mut self) {
        // Try to stop motors when driver is dropped (safety measure)
        if let Err(e) = self.stop() {
            warn!("Failed to stop motors on drop: {}", e);
        }
    }
}

/// A single write observed by a [`SimWheel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelWrite {
    Direction(Direction),
    Duty(u16),
}

/// Wheel stand-in for running without GPIO (dry runs and tests)
///
/// Every write is logged and kept in a shared journal.
#[derive(Clone)]
pub struct SimWheel {
    wheel: Wheel,
    journal: Arc<Mutex<Vec<WheelWrite>>>,
}

impl SimWheel {
    pub fn new(wheel: Wheel) -> Self {
        Self {
            wheel,
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of every write so far
    pub fn writes(&self) -> Vec<WheelWrite> {
        self.journal
            .lock()
            .map(|journal| journal.clone())
            .unwrap_or_default()
    }

    fn record(&self, write: WheelWrite) {
        debug!("[sim] {:?} wheel <- {:?}", self.wheel, write);
        if let Ok(mut journal) = self.journal.lock() {
            journal.push(write);
        }
    }
}

impl WheelOutput for SimWheel {
    fn set_direction(&mut self, direction: Direction) -> Result<(), HardwareError> {
        self.record(WheelWrite::Direction(direction));
        Ok(())
    }

    fn set_duty(&mut self, duty: u16) -> Result<(), HardwareError> {
        self.record(WheelWrite::Duty(duty));
        Ok(())
    }
}
