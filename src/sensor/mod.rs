// Distance sensing for the autonomous node

pub mod ultrasonic;

pub use ultrasonic::{echo_to_cm, EchoPin, HcSr04, RangeFinder, ScriptedRange, TriggerPin};
