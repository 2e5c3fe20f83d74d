//! # Motion control module
//!
//! Turns the colour and distance sensors into wheel speed demands. The colour under the car
//! decides how the demand is split between the wheels (line following) and whether a mark was
//! crossed, followers adjust their speed to the distance to the car in front, and a speed profile
//! sent by the leader overrides both while it is valid.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod classify;
mod follow;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use classify::*;
pub use follow::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during MotionCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum MotionCtrlError {
    #[error("Colour sensor sample is not finite: {0:?}")]
    InvalidRgb([f64; 3]),

    #[error("Distance sensor sample is not finite: {0}")]
    InvalidDistance(f64),

    #[error("Received a speed profile which cannot be used: {0:?}")]
    InvalidProfile(comms_if::msg::SpeedProfile),
}
