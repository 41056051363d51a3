// Keyboard teleop for the remote node: W/S drive, A/D turn, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;
use twowd_runtime::config::TOPIC_CMD_VEL;
use twowd_runtime::messages::VelocityCommand;

const LINEAR_SPEED: f64 = 0.2; // m/s, only the sign matters to the robot
const ANGULAR_SPEED: f64 = 1.0; // rad/s
const INPUT_TIMEOUT_MS: u64 = 100; // Stop after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_VEL).await?;

    info!("Controls: W/S=forward/backward, A/D=turn left/right, Q=quit");

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut cmd = VelocityCommand::default();
    let mut last_movement_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    KeyCode::Char('w') if pressed => {
                        cmd = VelocityCommand::new(LINEAR_SPEED, 0.0);
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        cmd = VelocityCommand::new(-LINEAR_SPEED, 0.0);
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('a') if pressed => {
                        cmd = VelocityCommand::new(0.0, ANGULAR_SPEED);
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('d') if pressed => {
                        cmd = VelocityCommand::new(0.0, -ANGULAR_SPEED);
                        last_movement_input = Instant::now();
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        // Zero the command if no movement input for INPUT_TIMEOUT_MS
        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            cmd = VelocityCommand::default();
        }

        // Always publish at ~50Hz
        publisher.put(serde_json::to_string(&cmd)?).await?;
    }

    // Leave the robot stopped
    publisher
        .put(serde_json::to_string(&VelocityCommand::default())?)
        .await?;
    Ok(())
}
