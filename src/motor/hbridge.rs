// L298N-style H-bridge channel on Raspberry Pi GPIO
//
// Each wheel uses three pins:
//   EN  - software PWM, sets the speed
//   IN1 - high for forward
//   IN2 - high for reverse

use rppal::gpio::{Gpio, OutputPin};
use tracing::debug;

use super::actuation::{Direction, Wheel};
use super::driver::WheelOutput;
use crate::config::{DUTY_MAX, PWM_FREQUENCY_HZ};

/// Error types for wheel hardware access
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("Duty {duty} exceeds maximum {max}")]
    DutyOutOfRange { duty: u16, max: u16 },
}

/// Pin assignment for one H-bridge channel (BCM numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HBridgePins {
    pub enable: u8,
    pub in1: u8,
    pub in2: u8,
}

impl From<[u8; 3]> for HBridgePins {
    fn from(pins: [u8; 3]) -> Self {
        Self {
            enable: pins[0],
            in1: pins[1],
            in2: pins[2],
        }
    }
}

/// One motor channel of the H-bridge
pub struct HBridgeWheel {
    wheel: Wheel,
    enable: OutputPin,
    in1: OutputPin,
    in2: OutputPin,
}

impl HBridgeWheel {
    /// Claim the pins for `wheel`; the motor starts stopped
    pub fn open(gpio: &Gpio, wheel: Wheel, pins: HBridgePins) -> Result<Self, HardwareError> {
        debug!("Opening {:?} wheel on pins {:?}", wheel, pins);
        let enable = gpio.get(pins.enable)?.into_output_low();
        let in1 = gpio.get(pins.in1)?.into_output_low();
        let in2 = gpio.get(pins.in2)?.into_output_low();

        Ok(Self {
            wheel,
            enable,
            in1,
            in2,
        })
    }
}

impl WheelOutput for HBridgeWheel {
    fn set_direction(&mut self, direction: Direction) -> Result<(), HardwareError> {
        match direction {
            Direction::Forward => {
                self.in1.set_high();
                self.in2.set_low();
            }
            Direction::Reverse => {
                self.in1.set_low();
                self.in2.set_high();
            }
        }
        Ok(())
    }

    fn set_duty(&mut self, duty: u16) -> Result<(), HardwareError> {
        let fraction = duty_fraction(duty)?;
        debug!("{:?} wheel duty {} ({:.3})", self.wheel, duty, fraction);

        if duty == 0 {
            self.enable.clear_pwm()?;
            self.enable.set_low();
        } else {
            self.enable.set_pwm_frequency(PWM_FREQUENCY_HZ, fraction)?;
        }
        Ok(())
    }
}

/// Scale a `0..=DUTY_MAX` duty to the 0.0-1.0 range rppal expects
fn duty_fraction(duty: u16) -> Result<f64, HardwareError> {
    if duty > DUTY_MAX {
        return Err(HardwareError::DutyOutOfRange {
            duty,
            max: DUTY_MAX,
        });
    }
    Ok(f64::from(duty) / f64::from(DUTY_MAX))
}
