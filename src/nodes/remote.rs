// Remote-controlled node: velocity commands over zenoh -> motors
//
// Every spin drains the subscriber and acts on the newest command only, so a
// burst of stale commands never queues up behind the current one.

use tokio::time::interval;
use tracing::{debug, info, warn};

use super::{retry_until_ok, shutdown_signal};
use crate::config::{CONNECT_RETRY_DELAY, SPIN_PERIOD, TOPIC_CMD_VEL, TOPIC_DRIVE_STATE};
use crate::messages::{Intent, VelocityCommand};
use crate::motor::DifferentialDrive;

/// Latest-wins holder for incoming velocity commands
#[derive(Debug, Default)]
pub struct CommandIntake {
    pending: Option<VelocityCommand>,
}

impl CommandIntake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a bus payload; a good one replaces whatever was pending
    pub fn on_payload(&mut self, payload: &[u8]) {
        match serde_json::from_slice::<VelocityCommand>(payload) {
            Ok(cmd) => {
                debug!("Received command: {:?}", cmd);
                self.pending = Some(cmd);
            }
            Err(e) => {
                warn!("Failed to parse command: {}", e);
            }
        }
    }

    /// Intent for the newest command since the last call, if any arrived
    pub fn take_intent(&mut self) -> Option<Intent> {
        self.pending.take().map(|cmd| cmd.intent())
    }
}

/// Build the zenoh session config
///
/// With an endpoint the node runs as a client of that router, otherwise it
/// uses zenoh's default peer discovery.
pub fn session_config(
    connect: Option<&str>,
) -> Result<zenoh::Config, Box<dyn std::error::Error + Send + Sync>> {
    let mut config = zenoh::Config::default();
    if let Some(endpoint) = connect {
        config.insert_json5("mode", r#""client""#)?;
        config.insert_json5("connect/endpoints", &serde_json::to_string(&[endpoint])?)?;
    }
    Ok(config)
}

pub async fn run(
    mut drive: DifferentialDrive,
    connect: Option<String>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    drive.stop()?;

    let config = session_config(connect.as_deref())?;
    info!("Opening Zenoh session...");
    let session = retry_until_ok("Zenoh session", CONNECT_RETRY_DELAY, || {
        let config = config.clone();
        async move { zenoh::open(config).await }
    })
    .await;

    info!("Setting up publishers and subscribers...");
    let subscriber = session.declare_subscriber(TOPIC_CMD_VEL).await?;
    let pub_state = session.declare_publisher(TOPIC_DRIVE_STATE).await?;

    let mut intake = CommandIntake::new();
    let mut spin = interval(SPIN_PERIOD);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    info!("Remote node started, waiting for {} commands", TOPIC_CMD_VEL);
    info!("Publishing drive state to: {}", TOPIC_DRIVE_STATE);

    loop {
        tokio::select! {
            _ = spin.tick() => {}
            _ = &mut shutdown => break,
        }

        // Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = subscriber.try_recv() {
            let payload = sample.payload().to_bytes();
            intake.on_payload(&payload);
        }

        if let Some(intent) = intake.take_intent() {
            let state = drive.apply(intent)?;
            pub_state.put(serde_json::to_string(&state)?).await?;
        }
    }

    drive.stop()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_command_wins() {
        let mut intake = CommandIntake::new();
        intake.on_payload(br#"{"linear_x": 1.0, "angular_z": 0.0}"#);
        intake.on_payload(br#"{"linear_x": 0.0, "angular_z": 0.3}"#);
        intake.on_payload(br#"{"linear_x": -0.5, "angular_z": 0.0}"#);

        assert_eq!(intake.take_intent(), Some(Intent::Backward));
        assert_eq!(intake.take_intent(), None);
    }

    #[test]
    fn test_malformed_payload_skipped() {
        let mut intake = CommandIntake::new();
        intake.on_payload(br#"{"linear_x": 0.0, "angular_z": -1.0}"#);
        intake.on_payload(b"not json");
        intake.on_payload(br#"{"linear_x": "fast"}"#);

        assert_eq!(intake.take_intent(), Some(Intent::TurnRight));
    }

    #[test]
    fn test_zero_twist_stops() {
        let mut intake = CommandIntake::new();
        intake.on_payload(br#"{"linear_x": 0.0, "angular_z": 0.0}"#);
        assert_eq!(intake.take_intent(), Some(Intent::Stop));
    }

    #[test]
    fn test_session_config_client_mode() {
        assert!(session_config(None).is_ok());
        assert!(session_config(Some("tcp/192.168.0.10:7447")).is_ok());
    }
}
