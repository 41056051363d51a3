// Message types shared by the nodes

use serde::{Deserialize, Serialize};

use crate::motor::WheelCommand;

/// A discrete motion directive, the common currency of every command source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
    Stop,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::Forward,
        Intent::Backward,
        Intent::TurnLeft,
        Intent::TurnRight,
        Intent::Stop,
    ];

    /// Path segment used by the web control panel
    pub fn route(self) -> &'static str {
        match self {
            Intent::Forward => "forward",
            Intent::Backward => "backward",
            Intent::TurnLeft => "left",
            Intent::TurnRight => "right",
            Intent::Stop => "stop",
        }
    }

    /// Inverse of [`Intent::route`]. Unknown names are not mapped to anything.
    pub fn from_route(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|intent| intent.route() == name)
    }
}

// Command from teleop/scripts -> remote node
// Only the two planar fields of a twist are consumed
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VelocityCommand {
    pub linear_x: f64,
    pub angular_z: f64,
}

impl VelocityCommand {
    pub fn new(linear_x: f64, angular_z: f64) -> Self {
        Self {
            linear_x,
            angular_z,
        }
    }

    /// Normalize to an intent. Linear motion wins over rotation; anything
    /// that is neither (zero, NaN) stops the robot.
    pub fn intent(&self) -> Intent {
        if self.linear_x > 0.0 {
            Intent::Forward
        } else if self.linear_x < 0.0 {
            Intent::Backward
        } else if self.angular_z > 0.0 {
            Intent::TurnLeft
        } else if self.angular_z < 0.0 {
            Intent::TurnRight
        } else {
            Intent::Stop
        }
    }
}

// Feedback from remote node -> anyone listening
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveState {
    pub intent: Intent,
    pub left: WheelCommand,
    pub right: WheelCommand,
}
