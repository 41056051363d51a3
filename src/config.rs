// Pin map, PWM setup, topics, timing
use std::time::Duration;

// PWM carrier and resolution (L298N enable pins)
pub const PWM_FREQUENCY_HZ: f64 = 1000.0;
pub const PWM_RESOLUTION_BITS: u32 = 8;

// Largest duty value a wheel accepts (255 at 8-bit resolution)
pub const DUTY_MAX: u16 = (1 << PWM_RESOLUTION_BITS) - 1;

// Motor pins (BCM numbering): [enable/pwm, in1, in2]
pub const LEFT_MOTOR_PINS: [u8; 3] = [12, 5, 6];
pub const RIGHT_MOTOR_PINS: [u8; 3] = [13, 20, 21];

// Ultrasonic sensor pins (BCM numbering)
pub const TRIG_PIN: u8 = 23;
pub const ECHO_PIN: u8 = 24;

// Echo wait limit, roughly 5 m of range
pub const ECHO_TIMEOUT: Duration = Duration::from_micros(30_000);

// Round-trip time per centimetre at ~340 m/s, in tenths of a microsecond (58.8 us)
pub const ECHO_TENTH_US_PER_CM: u64 = 588;

// Obstacle avoidance
// Older notes mention 20 cm, the tuned value on the robot is 10 cm
pub const OBSTACLE_THRESHOLD_CM: u32 = 10;
pub const STOP_SETTLE: Duration = Duration::from_millis(500);
pub const TURN_DURATION: Duration = Duration::from_millis(500); // tune for ~90 degrees
pub const SAMPLE_PERIOD: Duration = Duration::from_millis(100);
pub const STARTUP_DELAY: Duration = Duration::from_millis(1000);

// Zenoh topics
pub const TOPIC_CMD_VEL: &str = "robot/cmd_vel"; // velocity commands
pub const TOPIC_DRIVE_STATE: &str = "robot/state/drive"; // applied wheel commands

// How often the remote node drains pending commands
pub const SPIN_PERIOD: Duration = Duration::from_millis(10);

// Delay between connection attempts during startup
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

// Web control panel
pub const HTTP_PORT: u16 = 8080;
pub const DEFAULT_CAMERA_URL: &str = "http://192.168.4.2/stream";
