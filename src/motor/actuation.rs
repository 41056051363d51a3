// Differential-drive actuation for the two-wheel base
// Maps a motion intent to per-wheel (direction, duty) commands.
//
// Turning is done in place: both wheels keep their configured duty and spin
// in opposite directions.

use serde::{Deserialize, Serialize};

use crate::config::DUTY_MAX;
use crate::messages::Intent;

/// Which side of the base a command is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wheel {
    Left,
    Right,
}

/// Spin direction of a single wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

/// Command for one wheel
///
/// `direction` is `None` when the wheel is only being stopped; the direction
/// pins are left as they were.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelCommand {
    pub wheel: Wheel,
    pub direction: Option<Direction>,
    pub duty: u16,
}

impl WheelCommand {
    pub fn drive(wheel: Wheel, direction: Direction, duty: u16) -> Self {
        Self {
            wheel,
            direction: Some(direction),
            duty,
        }
    }

    pub fn stop(wheel: Wheel) -> Self {
        Self {
            wheel,
            direction: None,
            duty: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("{wheel:?} duty {duty} exceeds maximum {max}")]
    DutyOutOfRange { wheel: Wheel, duty: u16, max: u16 },
}

/// Per-wheel duty used for every moving intent
///
/// Left and right are tuned separately to make up for motor asymmetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedProfile {
    left_duty: u16,
    right_duty: u16,
}

impl SpeedProfile {
    /// Values tuned on the remote-controlled robot (left motor is slower)
    pub const TUNED: SpeedProfile = SpeedProfile {
        left_duty: 220,
        right_duty: 180,
    };

    pub fn new(left_duty: u16, right_duty: u16) -> Result<Self, ProfileError> {
        for (wheel, duty) in [(Wheel::Left, left_duty), (Wheel::Right, right_duty)] {
            if duty > DUTY_MAX {
                return Err(ProfileError::DutyOutOfRange {
                    wheel,
                    duty,
                    max: DUTY_MAX,
                });
            }
        }
        Ok(Self {
            left_duty,
            right_duty,
        })
    }

    /// Same duty on both wheels
    pub fn uniform(duty: u16) -> Result<Self, ProfileError> {
        Self::new(duty, duty)
    }

    pub fn full_speed() -> Self {
        Self {
            left_duty: DUTY_MAX,
            right_duty: DUTY_MAX,
        }
    }

    pub fn left_duty(&self) -> u16 {
        self.left_duty
    }

    pub fn right_duty(&self) -> u16 {
        self.right_duty
    }
}

impl Default for SpeedProfile {
    fn default() -> Self {
        Self::full_speed()
    }
}

/// Convert an intent into commands for the left and right wheel
pub fn compute_wheel_commands(
    intent: Intent,
    profile: &SpeedProfile,
) -> (WheelCommand, WheelCommand) {
    let (left_dir, right_dir) = match intent {
        Intent::Forward => (Direction::Forward, Direction::Forward),
        Intent::Backward => (Direction::Reverse, Direction::Reverse),
        Intent::TurnLeft => (Direction::Reverse, Direction::Forward),
        Intent::TurnRight => (Direction::Forward, Direction::Reverse),
        Intent::Stop => return (WheelCommand::stop(Wheel::Left), WheelCommand::stop(Wheel::Right)),
    };

    (
        WheelCommand::drive(Wheel::Left, left_dir, profile.left_duty),
        WheelCommand::drive(Wheel::Right, right_dir, profile.right_duty),
    )
}
