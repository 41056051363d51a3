// Autonomous node: ultrasonic ranging -> obstacle policy -> motors
//
// One reading per cycle. While the avoidance sequence runs the loop only
// waits out its deadlines; no new readings are taken.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use super::shutdown_signal;
use crate::avoidance::{AvoidanceConfig, Clock, ObstaclePolicy, SystemClock};
use crate::config::STARTUP_DELAY;
use crate::messages::Intent;
use crate::motor::{DifferentialDrive, HardwareError};
use crate::sensor::RangeFinder;

pub struct AutonomousNode<R, C> {
    drive: DifferentialDrive,
    sensor: R,
    clock: C,
    policy: ObstaclePolicy,
}

impl<R: RangeFinder, C: Clock> AutonomousNode<R, C> {
    pub fn new(drive: DifferentialDrive, sensor: R, clock: C, config: AvoidanceConfig) -> Self {
        Self {
            drive,
            sensor,
            clock,
            policy: ObstaclePolicy::new(config),
        }
    }

    /// Stop the motors and give the robot a moment before moving
    pub fn start(&mut self) -> Result<(), HardwareError> {
        info!("Obstacle avoidance robot starting");
        self.drive.stop()?;
        self.clock.sleep(STARTUP_DELAY);
        Ok(())
    }

    /// Run one decision cycle and return every intent applied during it
    pub fn step(&mut self) -> Result<Vec<Intent>, HardwareError> {
        let distance = self.sensor.distance_cm();
        debug!("Measured distance: {} cm", distance);

        let mut applied = vec![self.policy.on_distance(distance, self.clock.now())];
        self.drive.apply(applied[0])?;

        while let Some(deadline) = self.policy.next_deadline() {
            self.clock.sleep_until(deadline);
            if let Some(intent) = self.policy.on_deadline(self.clock.now()) {
                self.drive.apply(intent)?;
                applied.push(intent);
            }
        }

        let period = self.policy.config().sample_period();
        self.clock.sleep(period);
        Ok(applied)
    }

    /// Loop until `stop` is raised, then stop the motors
    pub fn run(&mut self, stop: &AtomicBool) -> Result<(), HardwareError> {
        self.start()?;
        while !stop.load(Ordering::Relaxed) {
            self.step()?;
        }
        self.drive.stop()?;
        Ok(())
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn drive(&self) -> &DifferentialDrive {
        &self.drive
    }
}

/// Run the node on a blocking thread until Ctrl-C
pub async fn run<R>(
    mut node: AutonomousNode<R, SystemClock>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    R: RangeFinder + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let mut worker = tokio::task::spawn_blocking(move || node.run(&flag));

    tokio::select! {
        result = &mut worker => {
            result??;
        }
        _ = shutdown_signal() => {
            stop.store(true, Ordering::Relaxed);
            worker.await??;
        }
    }
    Ok(())
}
