//! # Hardware Abstraction Module
//!
//! This module provides narrow capability traits over the hardware of a car, so that the control
//! code can run against the real motors and sensors or against the simulation in [`sim`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Simulated hardware
pub mod sim;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::msg::{Role, NUM_TRAINS};
use std::io::{self, BufRead, Write};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A regulated drive motor with an encoder.
pub trait MotorDriver: Send {
    /// Set the speed as a percentage of the motor's maximum speed.
    fn set_speed_percent(&mut self, speed_percent: f64) -> Result<(), HalError>;

    /// Start (or keep) the motor turning forward at the set speed.
    fn forward(&mut self) -> Result<(), HalError>;

    /// Stop the motor.
    fn stop(&mut self) -> Result<(), HalError>;

    /// Encoder count since the last reset.
    ///
    /// Units: degrees of wheel rotation
    fn tacho_count(&self) -> Result<i64, HalError>;

    /// Reset the encoder count to zero.
    fn reset_tacho_count(&mut self) -> Result<(), HalError>;

    /// Maximum speed of the motor.
    ///
    /// Units: degrees/second
    fn max_speed(&self) -> f64;
}

/// Downward facing colour sensor used to follow the line and detect marks.
pub trait ColorSensor: Send {
    /// Sample the normalised red, green and blue reflectance.
    fn sample_rgb(&mut self) -> Result<[f64; 3], HalError>;
}

/// Forward facing distance sensor.
pub trait DistanceSensor: Send {
    /// Sample the distance to the nearest obstacle.
    ///
    /// Units: meters
    fn sample_distance(&mut self) -> Result<f64, HalError>;
}

/// Selection of the car's identity at startup.
pub trait UserInput {
    fn wait_for_role_selection(&mut self) -> Result<Role, HalError>;

    fn wait_for_train_selection(&mut self) -> Result<u8, HalError>;
}

/// Small text display on the car.
pub trait Display: Send {
    fn show_lines(&mut self, lines: &[String]) -> Result<(), HalError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// All the hardware of a car.
pub struct Hardware {
    /// Left drive motor, its encoder is never reset and measures the distance travelled
    pub left_motor: Box<dyn MotorDriver>,

    /// Right drive motor, its encoder is reset on every mark
    pub right_motor: Box<dyn MotorDriver>,

    pub color_sensor: Box<dyn ColorSensor>,

    pub distance_sensor: Box<dyn DistanceSensor>,

    pub display: Box<dyn Display>,
}

/// Identity selection from the command line, asking on the terminal for anything missing.
pub struct CliInput {
    role: Option<Role>,
    train: Option<u8>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum HalError {
    #[error("Device {0} failed: {1}")]
    DeviceError(String, String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Could not read the user's selection: {0}")]
    InputError(io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Hardware {
    /// Stop both drive motors, trying the second even if the first fails.
    pub fn stop_motors(&mut self) -> Result<(), HalError> {
        let left = self.left_motor.stop();
        let right = self.right_motor.stop();

        left.and(right)
    }
}

impl CliInput {
    pub fn new(role: Option<Role>, train: Option<u8>) -> Self {
        Self { role, train }
    }
}

impl UserInput for CliInput {
    fn wait_for_role_selection(&mut self) -> Result<Role, HalError> {
        match self.role {
            Some(r) => Ok(r),
            None => prompt("Role (1 = leader, 2 = middle, 3 = queue): ")?
                .parse()
                .map_err(|e: comms_if::msg::CarIdError| HalError::InvalidSelection(e.to_string())),
        }
    }

    fn wait_for_train_selection(&mut self) -> Result<u8, HalError> {
        let train = match self.train {
            Some(t) => t,
            None => {
                let line = prompt(&format!("Train number (1 to {}): ", NUM_TRAINS))?;
                line.parse::<u8>()
                    .map_err(|e| HalError::InvalidSelection(format!("{:?}: {}", line, e)))?
            }
        };

        if (1..=NUM_TRAINS).contains(&train) {
            Ok(train)
        } else {
            Err(HalError::InvalidSelection(format!("no train number {}", train)))
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn prompt(question: &str) -> Result<String, HalError> {
    print!("{}", question);
    io::stdout().flush().map_err(HalError::InputError)?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(HalError::InputError)?;

    Ok(line.trim().to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cli_input() {
        let mut input = CliInput::new(Some(Role::Queue), Some(2));
        assert_eq!(input.wait_for_role_selection().unwrap(), Role::Queue);
        assert_eq!(input.wait_for_train_selection().unwrap(), 2);

        let mut input = CliInput::new(Some(Role::Leader), Some(7));
        assert!(matches!(
            input.wait_for_train_selection(),
            Err(HalError::InvalidSelection(_))
        ));
    }
}
