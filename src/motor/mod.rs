// Motor control module for the two-wheel base
//
// Provides:
// - Intent -> per-wheel (direction, duty) mapping
// - L298N H-bridge wheel outputs on Raspberry Pi GPIO
// - High-level differential drive API

pub mod actuation;
mod driver;
pub mod hbridge;

pub use actuation::{
    compute_wheel_commands, Direction, ProfileError, SpeedProfile, Wheel, WheelCommand,
};
pub use driver::{DifferentialDrive, SimWheel, WheelOutput, WheelWrite};
pub use hbridge::{HBridgePins, HBridgeWheel, HardwareError};
