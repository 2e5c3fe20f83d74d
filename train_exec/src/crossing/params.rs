//! Parameters structure for the crossing

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use std::f64::consts::PI;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Geometry of the circuit and crossing policy, shared by every car.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrossingParams {

    // ---- GEOMETRY ----

    /// Distance from the mark to the crossing.
    ///
    /// Units: wheel ticks
    pub mark_to_crossing_ticks: f64,

    /// Length of the circuit.
    ///
    /// Units: wheel ticks
    pub circuit_ticks: f64,

    /// Encoder ticks per wheel revolution
    pub ticks_per_revolution: f64,

    /// Units: meters
    pub wheel_diameter_m: f64,

    // ---- TRAIN ORDERS ----

    /// Speed ordered outside of the crossing, in percent
    pub normal_speed_percent: f64,

    /// Speed ordered inside the crossing, in percent
    pub crossing_speed_percent: f64,

    /// Safe distance ordered outside of the crossing, in meters
    pub normal_distance_m: f64,

    /// Safe distance ordered inside the crossing, in meters
    pub crossing_distance_m: f64,

    // ---- NEGOTIATION ----

    /// Time added to the earliest entry time.
    ///
    /// Units: seconds
    pub entry_margin_s: f64,

    /// Clearance kept before the next car of the other train, counted twice.
    ///
    /// Units: meters
    pub exit_clearance_m: f64,

    /// Gap assumed in front of the other train when none of its cars precedes us.
    ///
    /// Units: meters
    pub min_gap_m: f64,

    /// Below this difference between the adjusted and leading speeds a constant profile is used.
    ///
    /// Units: percent
    pub constant_profile_tolerance_percent: f64,

    /// Odometer distance during which a speed profile applies.
    ///
    /// Units: wheel ticks
    pub profile_valid_for_ticks: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for CrossingParams {
    fn default() -> Self {
        Self {
            mark_to_crossing_ticks: 2000.0,
            circuit_ticks: 5000.0,
            ticks_per_revolution: 360.0,
            wheel_diameter_m: 0.056,
            normal_speed_percent: 40.0,
            crossing_speed_percent: 40.0,
            normal_distance_m: 0.30,
            crossing_distance_m: 0.30,
            entry_margin_s: 1.0,
            exit_clearance_m: 0.015,
            min_gap_m: 0.15,
            constant_profile_tolerance_percent: 5.0,
            profile_valid_for_ticks: 1500.0,
        }
    }
}

impl CrossingParams {
    /// Units: meters
    pub fn wheel_perimeter_m(&self) -> f64 {
        PI * self.wheel_diameter_m
    }

    /// Convert wheel ticks into a distance in meters.
    pub fn ticks_to_m(&self, ticks: f64) -> f64 {
        ticks * self.wheel_perimeter_m() / self.ticks_per_revolution
    }

    /// Convert a distance in meters into wheel ticks.
    pub fn m_to_ticks(&self, m: f64) -> f64 {
        m * self.ticks_per_revolution / self.wheel_perimeter_m()
    }

    /// Ground speed of a car driven at `speed_percent` by motors of the given maximum speed.
    ///
    /// Units: meters/second
    pub fn real_speed_ms(&self, speed_percent: f64, max_speed_deg_s: f64) -> f64 {
        speed_percent / 100.0 * max_speed_deg_s * PI / 180.0 * (self.wheel_diameter_m / 2.0)
    }

    /// Inverse of [`CrossingParams::real_speed_ms`].
    pub fn speed_percent(&self, speed_ms: f64, max_speed_deg_s: f64) -> f64 {
        speed_ms / self.real_speed_ms(100.0, max_speed_deg_s) * 100.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_conversions() {
        let p = CrossingParams::default();

        // One revolution is one perimeter
        assert!((p.ticks_to_m(360.0) - PI * 0.056).abs() < 1e-12);
        assert!((p.m_to_ticks(p.ticks_to_m(1234.0)) - 1234.0).abs() < 1e-9);

        // 360 deg/s turns the wheel once per second
        assert!((p.real_speed_ms(50.0, 720.0) - PI * 0.056).abs() < 1e-12);
        assert!((p.speed_percent(p.real_speed_ms(37.0, 740.0), 740.0) - 37.0).abs() < 1e-9);
    }
}
