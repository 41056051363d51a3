pub mod avoidance;
pub mod config;
pub mod messages;
pub mod motor;
pub mod nodes;
pub mod sensor;
