//! Parameters structure for MotionCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::ColorClass;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Motion control.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {

    // ---- MARKS ----

    /// Colours which are treated as marks
    pub mark_colors: Vec<ColorClass>,

    /// Minimum time between two accepted marks.
    ///
    /// Units: seconds
    pub mark_debounce_s: f64,

    /// Encoder ticks per wheel revolution
    pub ticks_per_spin: f64,

    /// The queue car leaves the crossing when its spin count since the mark lies strictly
    /// between these bounds.
    pub exit_window_spins: [f64; 2],

    // ---- FOLLOWING ----

    /// Threshold distance of the all or nothing policy.
    ///
    /// Units: meters
    pub all_or_nothing_threshold_m: f64,

    /// Gain applied to the distance beyond the safe distance.
    ///
    /// Units: percent/meter
    pub proportional_gain: f64,

    /// Maximum speed under the to a point policy.
    ///
    /// Units: percent
    pub to_a_point_cap_percent: f64,

    /// Gain of the far regime of the to two points policy
    pub far_gain: f64,

    /// Offset of the far regime of the to two points policy
    pub far_offset: f64,

    /// Maximum speed under the to two points policy.
    ///
    /// Units: percent
    pub two_points_cap_percent: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            mark_colors: vec![ColorClass::Orange, ColorClass::Blue],
            mark_debounce_s: 2.0,
            ticks_per_spin: 360.0,
            exit_window_spins: [6.0, 7.0],
            all_or_nothing_threshold_m: 0.20,
            proportional_gain: 100.0,
            to_a_point_cap_percent: 60.0,
            far_gain: 2.5,
            far_offset: 20.0,
            two_points_cap_percent: 50.0,
        }
    }
}
