//! Speed profiles sent to cars approaching the crossing

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Highest supported polynomial degree.
pub const MAX_PROFILE_DEGREE: usize = 2;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A polynomial speed law `s(t) = c0 + c1 t + c2 t^2`.
///
/// `t` is the number of seconds since the profile was installed by the recipient and `s(t)` is a
/// speed percentage. The profile is discarded once the recipient's odometer has advanced by
/// `valid_for_ticks` since installation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SpeedProfile {
    /// Coefficients in ascending power order, at most `MAX_PROFILE_DEGREE + 1` of them
    coeffs: Vec<f64>,

    /// Odometer distance (motor ticks) during which the profile applies
    pub valid_for_ticks: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SpeedProfile {
    /// A profile holding a single speed.
    pub fn constant(speed_percent: f64, valid_for_ticks: f64) -> Self {
        Self {
            coeffs: vec![speed_percent],
            valid_for_ticks,
        }
    }

    /// A second degree profile from its coefficients.
    pub fn quadratic(c0: f64, c1: f64, c2: f64, valid_for_ticks: f64) -> Self {
        Self {
            coeffs: vec![c0, c1, c2],
            valid_for_ticks,
        }
    }

    /// Coefficients in ascending power order.
    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Degree of the polynomial, a profile with no coefficients has degree 0.
    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    /// True if the profile can be used: finite coefficients and a supported degree.
    pub fn is_valid(&self) -> bool {
        !self.coeffs.is_empty()
            && self.coeffs.len() <= MAX_PROFILE_DEGREE + 1
            && self.coeffs.iter().all(|c| c.is_finite())
            && self.valid_for_ticks.is_finite()
    }

    /// Speed percentage `t` seconds after installation.
    pub fn value(&self, t: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, c| acc * t + c)
    }

    /// Integral of the profile between 0 and `t`, in percentage-seconds.
    pub fn integral(&self, t: f64) -> f64 {
        self.coeffs
            .iter()
            .enumerate()
            .rev()
            .fold(0.0, |acc, (i, c)| acc * t + c / (i as f64 + 1.0))
            * t
    }
}
