// HC-SR04 ultrasonic rangefinder
//
// A 10 us pulse on TRIG starts a measurement; ECHO then stays high for the
// round-trip time of the sound burst. No echo within the timeout reads as 0.

use std::thread::sleep;
use std::time::{Duration, Instant};

use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::debug;

use crate::config::{ECHO_TENTH_US_PER_CM, ECHO_TIMEOUT};

/// Anything that can range the distance ahead of the robot
pub trait RangeFinder: Send {
    /// Echo pulse width in microseconds, 0 when nothing came back in time
    fn echo_time_us(&mut self) -> u64;

    /// Distance in whole centimetres, 0 meaning "no reading"
    fn distance_cm(&mut self) -> u32 {
        echo_to_cm(self.echo_time_us())
    }
}

impl RangeFinder for Box<dyn RangeFinder> {
    fn echo_time_us(&mut self) -> u64 {
        self.as_mut().echo_time_us()
    }

    fn distance_cm(&mut self) -> u32 {
        self.as_mut().distance_cm()
    }
}

/// Convert an echo time to centimetres (truncating, 58.8 us per cm)
pub fn echo_to_cm(echo_us: u64) -> u32 {
    let cm = echo_us.saturating_mul(10) / ECHO_TENTH_US_PER_CM;
    u32::try_from(cm).unwrap_or(u32::MAX)
}

/// Output side of the sensor, pulsed to start a measurement
pub trait TriggerPin: Send {
    fn set_high(&mut self);
    fn set_low(&mut self);
}

/// Input side of the sensor, high while the echo is in flight
pub trait EchoPin: Send {
    fn is_high(&self) -> bool;
}

impl TriggerPin for OutputPin {
    fn set_high(&mut self) {
        OutputPin::set_high(self);
    }

    fn set_low(&mut self) {
        OutputPin::set_low(self);
    }
}

impl EchoPin for InputPin {
    fn is_high(&self) -> bool {
        InputPin::is_high(self)
    }
}

pub struct HcSr04<T = OutputPin, E = InputPin> {
    trig: T,
    echo: E,
    timeout: Duration,
}

impl HcSr04 {
    pub fn open(gpio: &Gpio, trig_pin: u8, echo_pin: u8) -> Result<Self, rppal::gpio::Error> {
        debug!("Opening ultrasonic sensor: trig={}, echo={}", trig_pin, echo_pin);
        let trig = gpio.get(trig_pin)?.into_output_low();
        let echo = gpio.get(echo_pin)?.into_input();

        Ok(Self::with_pins(trig, echo, ECHO_TIMEOUT))
    }
}

impl<T: TriggerPin, E: EchoPin> HcSr04<T, E> {
    pub fn with_pins(trig: T, echo: E, timeout: Duration) -> Self {
        Self {
            trig,
            echo,
            timeout,
        }
    }

    fn fire_trigger(&mut self) {
        self.trig.set_low();
        sleep(Duration::from_micros(2));
        self.trig.set_high();
        sleep(Duration::from_micros(10));
        self.trig.set_low();
    }
}

impl<T: TriggerPin, E: EchoPin> RangeFinder for HcSr04<T, E> {
    fn echo_time_us(&mut self) -> u64 {
        self.fire_trigger();
        let started = Instant::now();

        // The timeout covers the wait for the rising edge too
        while !self.echo.is_high() {
            if started.elapsed() >= self.timeout {
                return 0;
            }
        }

        let rise = Instant::now();
        while self.echo.is_high() {
            if started.elapsed() >= self.timeout {
                return 0;
            }
        }

        u64::try_from(rise.elapsed().as_micros()).unwrap_or(0)
    }
}

/// Replays a fixed list of distances, cycling forever
///
/// Used for dry runs without a sensor attached.
pub struct ScriptedRange {
    readings_cm: Vec<u32>,
    next: usize,
}

impl ScriptedRange {
    pub fn new(readings_cm: Vec<u32>) -> Self {
        Self {
            readings_cm,
            next: 0,
        }
    }
}

impl RangeFinder for ScriptedRange {
    fn echo_time_us(&mut self) -> u64 {
        u64::from(self.distance_cm()) * ECHO_TENTH_US_PER_CM / 10
    }

    fn distance_cm(&mut self) -> u32 {
        if self.readings_cm.is_empty() {
            return 0;
        }
        let reading = self.readings_cm[self.next % self.readings_cm.len()];
        self.next += 1;
        reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_to_cm() {
        assert_eq!(echo_to_cm(0), 0);
        assert_eq!(echo_to_cm(58), 0);
        assert_eq!(echo_to_cm(588), 10);
        assert_eq!(echo_to_cm(587), 9);
        assert_eq!(echo_to_cm(2940), 50);
    }

    #[test]
    fn test_echo_timeout_is_about_five_metres() {
        let max_us = ECHO_TIMEOUT.as_micros() as u64;
        assert_eq!(echo_to_cm(max_us), 510);
    }

    #[derive(Default)]
    struct CountingTrigger {
        pulses: usize,
    }

    impl TriggerPin for CountingTrigger {
        fn set_high(&mut self) {
            self.pulses += 1;
        }

        fn set_low(&mut self) {}
    }

    /// Echo line held at one level
    struct StuckEcho(bool);

    impl EchoPin for StuckEcho {
        fn is_high(&self) -> bool {
            self.0
        }
    }

    /// Echo line high for a window measured from construction
    struct PulseEcho {
        created: Instant,
        rise: Duration,
        fall: Duration,
    }

    impl EchoPin for PulseEcho {
        fn is_high(&self) -> bool {
            let t = self.created.elapsed();
            t >= self.rise && t < self.fall
        }
    }

    const TEST_TIMEOUT: Duration = Duration::from_millis(20);

    #[test]
    fn test_missing_echo_times_out_to_zero() {
        let mut sensor =
            HcSr04::with_pins(CountingTrigger::default(), StuckEcho(false), TEST_TIMEOUT);
        let started = Instant::now();

        assert_eq!(sensor.echo_time_us(), 0);
        let elapsed = started.elapsed();
        assert!(elapsed >= TEST_TIMEOUT);
        assert!(elapsed < TEST_TIMEOUT + Duration::from_millis(200));
        assert_eq!(sensor.trig.pulses, 1);
    }

    #[test]
    fn test_echo_stuck_high_times_out_to_zero() {
        let mut sensor =
            HcSr04::with_pins(CountingTrigger::default(), StuckEcho(true), TEST_TIMEOUT);
        let started = Instant::now();

        assert_eq!(sensor.distance_cm(), 0);
        let elapsed = started.elapsed();
        assert!(elapsed >= TEST_TIMEOUT);
        assert!(elapsed < TEST_TIMEOUT + Duration::from_millis(200));
    }

    #[test]
    fn test_default_timeout_bounds_a_missing_echo() {
        let mut sensor =
            HcSr04::with_pins(CountingTrigger::default(), StuckEcho(false), ECHO_TIMEOUT);
        let started = Instant::now();

        assert_eq!(sensor.echo_time_us(), 0);
        assert!(started.elapsed() < ECHO_TIMEOUT + Duration::from_millis(200));
    }

    #[test]
    fn test_echo_pulse_is_measured() {
        let echo = PulseEcho {
            created: Instant::now(),
            rise: Duration::from_millis(2),
            fall: Duration::from_millis(12),
        };
        let mut sensor = HcSr04::with_pins(CountingTrigger::default(), echo, TEST_TIMEOUT);

        let us = sensor.echo_time_us();
        assert!(us > 0);
        assert!(us <= 12_000);
    }

    #[test]
    fn test_scripted_range_cycles() {
        let mut range = ScriptedRange::new(vec![50, 8]);
        assert_eq!(range.distance_cm(), 50);
        assert_eq!(range.distance_cm(), 8);
        assert_eq!(range.distance_cm(), 50);
    }

    #[test]
    fn test_empty_script_reads_nothing() {
        let mut range = ScriptedRange::new(Vec::new());
        assert_eq!(range.distance_cm(), 0);
        assert_eq!(range.echo_time_us(), 0);
    }
}
