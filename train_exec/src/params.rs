//! # Train Executable Parameters
//!
//! This module provide parameters for the train executable, loaded from `train_exec.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::net::NetParams;
use serde::Deserialize;
use std::time::Duration;

use crate::motion_ctrl::FollowPolicy;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainExecParams {
    /// Network configuration
    pub net: NetParams,

    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Period between two reports of this car's state to its leader.
    ///
    /// Units: seconds
    pub report_period_s: f64,

    /// How followers keep their distance to the car in front
    pub follow_policy: FollowPolicy,

    /// Number of consecutive hardware errors after which the car is stopped
    pub max_consec_hal_errors: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("The cycle period must be a positive number of seconds, got {0}")]
    InvalidCyclePeriod(f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TrainExecParams {
    /// Period of the control cycle.
    pub fn cycle_period(&self) -> Result<Duration, ParamsError> {
        let p = self.cycle_period_s;

        if p.is_finite() && p > 0.0 && p < u64::MAX as f64 {
            Ok(Duration::from_secs_f64(p))
        } else {
            Err(ParamsError::InvalidCyclePeriod(p))
        }
    }
}

impl Default for TrainExecParams {
    fn default() -> Self {
        Self {
            net: NetParams::default(),
            cycle_period_s: 0.05,
            report_period_s: 0.5,
            follow_policy: FollowPolicy::ToAPoint,
            max_consec_hal_errors: 5,
        }
    }
}
