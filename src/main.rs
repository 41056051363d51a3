use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rppal::gpio::Gpio;
use tracing::info;
use tracing_subscriber::EnvFilter;

use twowd_runtime::avoidance::{AvoidanceConfig, SystemClock};
use twowd_runtime::config::{
    DEFAULT_CAMERA_URL, ECHO_PIN, HTTP_PORT, LEFT_MOTOR_PINS, RIGHT_MOTOR_PINS, TRIG_PIN,
};
use twowd_runtime::motor::{
    DifferentialDrive, HBridgePins, HBridgeWheel, SimWheel, SpeedProfile, Wheel,
};
use twowd_runtime::nodes::{autonomous, remote, web};
use twowd_runtime::sensor::{HcSr04, RangeFinder, ScriptedRange};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Two-wheel-drive robot runtime
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    node: Node,

    /// Log motor commands instead of driving GPIO
    #[arg(long, global = true)]
    sim: bool,

    /// Left motor pins: enable,in1,in2 (BCM)
    #[arg(long, global = true, value_delimiter = ',', default_values_t = LEFT_MOTOR_PINS)]
    left_pins: Vec<u8>,

    /// Right motor pins: enable,in1,in2 (BCM)
    #[arg(long, global = true, value_delimiter = ',', default_values_t = RIGHT_MOTOR_PINS)]
    right_pins: Vec<u8>,

    /// Left wheel duty (0-255), defaults depend on the node
    #[arg(long, global = true)]
    left_duty: Option<u16>,

    /// Right wheel duty (0-255), defaults depend on the node
    #[arg(long, global = true)]
    right_duty: Option<u16>,
}

#[derive(Debug, Subcommand)]
enum Node {
    /// Drive from velocity commands on the zenoh bus
    Remote {
        /// Router endpoint, e.g. tcp/192.168.0.10:7447 (client mode)
        #[arg(long)]
        connect: Option<String>,
    },
    /// Serve the web control panel
    Web {
        #[arg(long, default_value_t = HTTP_PORT)]
        port: u16,

        /// Camera stream shown on the panel
        #[arg(long, default_value = DEFAULT_CAMERA_URL)]
        camera_url: String,
    },
    /// Drive forward and avoid obstacles
    Autonomous {
        #[arg(long, default_value_t = TRIG_PIN)]
        trig_pin: u8,

        #[arg(long, default_value_t = ECHO_PIN)]
        echo_pin: u8,

        /// JSON file overriding threshold and timings
        #[arg(long)]
        avoidance: Option<PathBuf>,

        /// Distances (cm) to replay in --sim mode
        #[arg(long, value_delimiter = ',', default_values_t = [50u32, 50, 8, 50])]
        script: Vec<u32>,
    },
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    let default_profile = match cli.node {
        Node::Remote { .. } => SpeedProfile::TUNED,
        Node::Web { .. } | Node::Autonomous { .. } => SpeedProfile::full_speed(),
    };
    let profile = SpeedProfile::new(
        cli.left_duty.unwrap_or(default_profile.left_duty()),
        cli.right_duty.unwrap_or(default_profile.right_duty()),
    )?;
    let drive = open_drive(&cli, profile)?;

    match cli.node {
        Node::Remote { connect } => remote::run(drive, connect).await,
        Node::Web { port, camera_url } => web::run(drive, port, &camera_url).await,
        Node::Autonomous {
            trig_pin,
            echo_pin,
            avoidance,
            script,
        } => {
            let config = match avoidance {
                Some(path) => AvoidanceConfig::from_file(path)?,
                None => AvoidanceConfig::default(),
            };
            info!("Avoidance config: {:?}", config);

            let sensor: Box<dyn RangeFinder> = if cli.sim {
                Box::new(ScriptedRange::new(script))
            } else {
                Box::new(HcSr04::open(&Gpio::new()?, trig_pin, echo_pin)?)
            };
            let node = autonomous::AutonomousNode::new(drive, sensor, SystemClock, config);
            autonomous::run(node).await
        }
    }
}

fn open_drive(cli: &Cli, profile: SpeedProfile) -> Result<DifferentialDrive, BoxError> {
    if cli.sim {
        info!("Simulation mode: motor commands are only logged");
        return Ok(DifferentialDrive::new(
            Box::new(SimWheel::new(Wheel::Left)),
            Box::new(SimWheel::new(Wheel::Right)),
            profile,
        ));
    }

    let gpio = Gpio::new()?;
    let left = HBridgeWheel::open(&gpio, Wheel::Left, pins(&cli.left_pins)?)?;
    let right = HBridgeWheel::open(&gpio, Wheel::Right, pins(&cli.right_pins)?)?;
    Ok(DifferentialDrive::new(Box::new(left), Box::new(right), profile))
}

fn pins(values: &[u8]) -> Result<HBridgePins, BoxError> {
    let pins: [u8; 3] = values
        .try_into()
        .map_err(|_| format!("expected 3 pins (enable,in1,in2), got {}", values.len()))?;
    Ok(HBridgePins::from(pins))
}
