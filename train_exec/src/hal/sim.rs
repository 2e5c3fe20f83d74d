//! # Simulated hardware
//!
//! Simple kinematic stand-ins for the car's hardware. Every simulated device is a cheap handle on
//! shared state, so a test (or the simulated executable) can keep a clone to drive the sensors
//! and inspect the motors while the [`Hardware`] bundle is owned by the car.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{ColorSensor, Display, DistanceSensor, HalError, Hardware, MotorDriver};
use util::maths::lin_map;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Reflectance of the black line.
pub const RGB_BLACK: [f64; 3] = [0.03, 0.03, 0.03];

/// Reflectance of the white floor.
pub const RGB_WHITE: [f64; 3] = [0.30, 0.30, 0.30];

/// Reflectance of an orange mark.
pub const RGB_ORANGE: [f64; 3] = [0.16, 0.07, 0.02];

/// Reflectance of a blue mark.
pub const RGB_BLUE: [f64; 3] = [0.05, 0.15, 0.05];

/// Reflectance of a yellow mark.
pub const RGB_YELLOW: [f64; 3] = [0.25, 0.08, 0.02];

/// Maximum speed of the simulated motors, in degrees/second.
pub const SIM_MAX_SPEED_DEG_S: f64 = 740.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A simulated motor, clones share the same motor.
#[derive(Clone)]
pub struct SimMotor {
    state: Arc<Mutex<MotorState>>,
}

#[derive(Clone)]
pub struct SimColorSensor {
    rgb: Arc<Mutex<[f64; 3]>>,
}

#[derive(Clone)]
pub struct SimDistanceSensor {
    distance_m: Arc<Mutex<f64>>,
}

/// A display recording the last lines shown.
#[derive(Clone, Default)]
pub struct SimDisplay {
    lines: Arc<Mutex<Vec<String>>>,
}

/// A closed loop circuit with coloured marks on it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimTrack {
    /// Length of the circuit in wheel ticks
    pub circuit_ticks: f64,

    /// Length of one black and white line-edge period in wheel ticks
    pub edge_period_ticks: f64,

    /// Marks along the circuit
    pub marks: Vec<SimMark>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimMark {
    /// Start of the mark on the circuit, in wheel ticks
    pub at_ticks: f64,

    /// Length of the mark, in wheel ticks
    pub width_ticks: f64,

    /// Reflectance of the mark
    pub rgb: [f64; 3],
}

/// A complete simulated car on a track.
pub struct SimCar {
    pub left_motor: SimMotor,
    pub right_motor: SimMotor,
    pub color_sensor: SimColorSensor,
    pub distance_sensor: SimDistanceSensor,
    pub display: SimDisplay,

    track: SimTrack,

    /// Position on the circuit at the start, in wheel ticks
    start_ticks: f64,
}

struct MotorState {
    speed_percent: f64,
    running: bool,

    /// Encoder count since the last reset
    tacho: f64,

    max_speed_deg_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimMotor {
    pub fn new(max_speed_deg_s: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(MotorState {
                speed_percent: 0.0,
                running: false,
                tacho: 0.0,
                max_speed_deg_s,
            })),
        }
    }

    /// Integrate the motor's rotation over `dt_s` seconds.
    pub fn advance(&self, dt_s: f64) {
        let mut s = lock(&self.state);
        if s.running {
            let rate = lin_map((0.0, 100.0), (0.0, s.max_speed_deg_s), s.speed_percent);
            s.tacho += rate * dt_s;
        }
    }

    /// Set the encoder count directly.
    pub fn set_tacho(&self, tacho: f64) {
        lock(&self.state).tacho = tacho;
    }

    pub fn speed_percent(&self) -> f64 {
        lock(&self.state).speed_percent
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }
}

impl MotorDriver for SimMotor {
    fn set_speed_percent(&mut self, speed_percent: f64) -> Result<(), HalError> {
        if !speed_percent.is_finite() {
            return Err(HalError::DeviceError(
                "sim motor".into(),
                format!("non-finite speed {}", speed_percent),
            ));
        }
        lock(&self.state).speed_percent = speed_percent;
        Ok(())
    }

    fn forward(&mut self) -> Result<(), HalError> {
        lock(&self.state).running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HalError> {
        lock(&self.state).running = false;
        Ok(())
    }

    fn tacho_count(&self) -> Result<i64, HalError> {
        Ok(lock(&self.state).tacho.round() as i64)
    }

    fn reset_tacho_count(&mut self) -> Result<(), HalError> {
        lock(&self.state).tacho = 0.0;
        Ok(())
    }

    fn max_speed(&self) -> f64 {
        lock(&self.state).max_speed_deg_s
    }
}

impl SimColorSensor {
    pub fn new(rgb: [f64; 3]) -> Self {
        Self {
            rgb: Arc::new(Mutex::new(rgb)),
        }
    }

    pub fn set_rgb(&self, rgb: [f64; 3]) {
        *lock(&self.rgb) = rgb;
    }
}

impl ColorSensor for SimColorSensor {
    fn sample_rgb(&mut self) -> Result<[f64; 3], HalError> {
        Ok(*lock(&self.rgb))
    }
}

impl SimDistanceSensor {
    pub fn new(distance_m: f64) -> Self {
        Self {
            distance_m: Arc::new(Mutex::new(distance_m)),
        }
    }

    pub fn set_distance(&self, distance_m: f64) {
        *lock(&self.distance_m) = distance_m;
    }
}

impl DistanceSensor for SimDistanceSensor {
    fn sample_distance(&mut self) -> Result<f64, HalError> {
        Ok(*lock(&self.distance_m))
    }
}

impl SimDisplay {
    /// The lines last shown on the display.
    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }
}

impl Display for SimDisplay {
    fn show_lines(&mut self, lines: &[String]) -> Result<(), HalError> {
        let mut shown = lock(&self.lines);
        if shown.as_slice() != lines {
            debug!("Display: {}", lines.join(" | "));
            *shown = lines.to_vec();
        }
        Ok(())
    }
}

impl Default for SimTrack {
    fn default() -> Self {
        Self {
            circuit_ticks: 5000.0,
            edge_period_ticks: 60.0,
            marks: vec![SimMark {
                at_ticks: 0.0,
                width_ticks: 40.0,
                rgb: RGB_ORANGE,
            }],
        }
    }
}

impl SimTrack {
    /// Reflectance seen at the given distance along the circuit.
    pub fn rgb_at(&self, ticks: f64) -> [f64; 3] {
        let pos = ticks.rem_euclid(self.circuit_ticks);

        for mark in self.marks.iter() {
            if pos >= mark.at_ticks && pos < mark.at_ticks + mark.width_ticks {
                return mark.rgb;
            }
        }

        // Following the edge of the line the sensor sees black and white in turn
        if (pos / self.edge_period_ticks).floor() as i64 % 2 == 0 {
            RGB_BLACK
        } else {
            RGB_WHITE
        }
    }
}

impl SimCar {
    /// Create a car standing `start_ticks` along the track with `distance_m` free in front.
    pub fn new(track: SimTrack, start_ticks: f64, distance_m: f64) -> Self {
        let car = Self {
            left_motor: SimMotor::new(SIM_MAX_SPEED_DEG_S),
            right_motor: SimMotor::new(SIM_MAX_SPEED_DEG_S),
            color_sensor: SimColorSensor::new(RGB_BLACK),
            distance_sensor: SimDistanceSensor::new(distance_m),
            display: SimDisplay::default(),
            track,
            start_ticks,
        };

        car.color_sensor.set_rgb(car.track.rgb_at(start_ticks));
        car
    }

    /// Get the hardware bundle driving this car.
    pub fn hardware(&self) -> Hardware {
        Hardware {
            left_motor: Box::new(self.left_motor.clone()),
            right_motor: Box::new(self.right_motor.clone()),
            color_sensor: Box::new(self.color_sensor.clone()),
            distance_sensor: Box::new(self.distance_sensor.clone()),
            display: Box::new(self.display.clone()),
        }
    }

    /// Move the car along the track for `dt_s` seconds.
    pub fn step(&self, dt_s: f64) {
        self.left_motor.advance(dt_s);
        self.right_motor.advance(dt_s);

        // The left encoder is never reset, so it gives the distance travelled
        let travelled = lock(&self.left_motor.state).tacho;
        self.color_sensor
            .set_rgb(self.track.rgb_at(self.start_ticks + travelled));
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Lock the mutex, ignoring poisoning since the simulated state is always left consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_motor() {
        let motor = SimMotor::new(100.0);
        let mut driver: Box<dyn MotorDriver> = Box::new(motor.clone());

        driver.set_speed_percent(50.0).unwrap();
        motor.advance(1.0);
        assert_eq!(driver.tacho_count().unwrap(), 0);

        driver.forward().unwrap();
        motor.advance(2.0);
        assert_eq!(driver.tacho_count().unwrap(), 100);

        driver.reset_tacho_count().unwrap();
        assert_eq!(driver.tacho_count().unwrap(), 0);

        driver.stop().unwrap();
        assert!(!motor.is_running());
        assert!(driver.set_speed_percent(f64::NAN).is_err());
    }

    #[test]
    fn test_track() {
        let track = SimTrack::default();
        assert_eq!(track.rgb_at(10.0), RGB_ORANGE);
        assert_eq!(track.rgb_at(5010.0), RGB_ORANGE);
        assert_eq!(track.rgb_at(50.0), RGB_BLACK);
        assert_eq!(track.rgb_at(70.0), RGB_WHITE);
    }

    #[test]
    fn test_car_moves_over_mark() {
        let car = SimCar::new(SimTrack::default(), 4920.0, 0.5);
        let mut hw = car.hardware();
        assert_eq!(hw.color_sensor.sample_rgb().unwrap(), RGB_BLACK);

        hw.left_motor.set_speed_percent(50.0).unwrap();
        hw.left_motor.forward().unwrap();

        // 370 deg/s for 0.3 s is 111 ticks, onto the mark
        car.step(0.3);
        assert_eq!(hw.color_sensor.sample_rgb().unwrap(), RGB_ORANGE);
    }
}
