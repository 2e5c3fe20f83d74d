//! Implementations for the MotionCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::msg::SpeedProfile;
use log::{debug, info, trace};
use serde::Serialize;

// Internal
use super::{
    classify, follow_speed, ColorClass, FollowInput, FollowPolicy, MotionCtrlError, Params,
    Steering,
};
use util::{
    maths::clamp,
    module::{MakeSafe, State},
    params,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Highest speed demand that can be given to the motors.
pub const MAX_SPEED_PERCENT: f64 = 100.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Motion control module state
#[derive(Default)]
pub struct MotionCtrl {
    pub(crate) params: Params,

    policy: FollowPolicy,

    /// Speed demand of the last cycle
    speed_percent: f64,

    /// Distance reading of the last cycle
    prev_distance_m: Option<f64>,

    /// Resettable encoder count of the last cycle
    prev_tacho: i64,

    /// Encoder ticks travelled since the last accepted mark
    position_ticks: f64,

    mark_count: u32,

    /// Time of the last accepted mark
    last_mark_s: Option<f64>,

    profile: Option<InstalledProfile>,
}

/// Input data to Motion control.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// Elapsed time.
    ///
    /// Units: seconds
    pub now_s: f64,

    /// Colour sensor sample
    pub rgb: [f64; 3],

    /// Distance to the car in front, `None` for a car which does not follow another one.
    ///
    /// Units: meters
    pub distance_m: Option<f64>,

    /// Encoder count which is reset on every accepted mark.
    pub tacho: i64,

    /// Encoder count which is never reset.
    pub odometer: i64,

    /// Speed commanded by the leader.
    ///
    /// Units: percent
    pub speed_to_reach: f64,

    /// Distance to keep from the car in front.
    ///
    /// Units: meters
    pub safe_distance_m: f64,
}

/// Output demands from MotionCtrl.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct OutputData {
    /// Left wheel demand in percent of the maximum speed
    pub left_speed_percent: f64,

    /// Right wheel demand in percent of the maximum speed
    pub right_speed_percent: f64,

    /// Speed demand before steering is applied
    pub speed_percent: f64,

    /// True if a mark was accepted and the resettable encoder must be reset
    pub reset_tacho: bool,
}

/// Status report for MotionCtrl processing.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusReport {
    pub color: ColorClass,
    pub steering: Steering,
    pub mark_accepted: bool,
    pub position_ticks: f64,
    pub spin_count: f64,
    pub mark_count: u32,
    pub profile_active: bool,
    pub profile_expired: bool,
}

#[derive(Debug, Clone)]
struct InstalledProfile {
    profile: SpeedProfile,
    installed_at_s: f64,
    installed_odometer: i64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for MotionCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = MotionCtrlError;

    /// Initialise the MotionCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, _session: &Session)
        -> Result<(), Self::InitError>
    {
        self.params = params::load(init_data)?;

        info!(
            "MotionCtrl marks: {:?}, follow policy: {}",
            self.params.mark_colors, self.policy
        );

        Ok(())
    }

    /// Perform cyclic processing of Motion Control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        if input_data.rgb.iter().any(|c| !c.is_finite()) {
            return Err(MotionCtrlError::InvalidRgb(input_data.rgb));
        }
        if let Some(d) = input_data.distance_m {
            if !d.is_finite() {
                return Err(MotionCtrlError::InvalidDistance(d));
            }
        }

        let color = classify(input_data.rgb);
        let steering = color.steering();

        // ---- POSITION ----

        self.position_ticks += (input_data.tacho - self.prev_tacho) as f64;
        self.prev_tacho = input_data.tacho;

        let mark_accepted = self.params.mark_colors.contains(&color)
            && match self.last_mark_s {
                Some(t) => input_data.now_s - t >= self.params.mark_debounce_s,
                None => true,
            };

        if mark_accepted {
            self.position_ticks = 0.0;
            self.prev_tacho = 0;
            self.mark_count += 1;
            self.last_mark_s = Some(input_data.now_s);

            info!("Mark {} accepted ({:?})", self.mark_count, color);
        }

        // ---- SPEED ----

        let mut profile_expired = false;

        let profile_speed = match self.profile {
            Some(ref p) => {
                let travelled = (input_data.odometer - p.installed_odometer).abs() as f64;

                if travelled >= p.profile.valid_for_ticks {
                    profile_expired = true;
                    None
                } else {
                    Some(p.profile.value(input_data.now_s - p.installed_at_s))
                }
            }
            None => None,
        };

        if profile_expired {
            debug!("Speed profile expired");
            self.profile = None;
        }

        let speed = match (profile_speed, input_data.distance_m) {
            (Some(s), _) => s,
            (None, Some(distance_m)) => follow_speed(
                self.policy,
                &self.params,
                &FollowInput {
                    distance_m,
                    prev_distance_m: self.prev_distance_m,
                    current_speed_percent: self.speed_percent,
                    speed_to_reach: input_data.speed_to_reach,
                    safe_distance_m: input_data.safe_distance_m,
                },
            ),
            (None, None) => input_data.speed_to_reach,
        };

        if input_data.distance_m.is_some() {
            self.prev_distance_m = input_data.distance_m;
        }

        // Motors only run forward
        self.speed_percent = clamp(speed, 0.0, MAX_SPEED_PERCENT);

        let (left, right) = steering.wheel_fractions();

        let output = OutputData {
            left_speed_percent: self.speed_percent * left,
            right_speed_percent: self.speed_percent * right,
            speed_percent: self.speed_percent,
            reset_tacho: mark_accepted,
        };

        let report = StatusReport {
            color,
            steering,
            mark_accepted,
            position_ticks: self.position_ticks,
            spin_count: self.spin_count(),
            mark_count: self.mark_count,
            profile_active: self.profile.is_some(),
            profile_expired,
        };

        trace!(
            "MotionCtrl output: {:?} -> L {:.1} R {:.1}",
            color,
            output.left_speed_percent,
            output.right_speed_percent
        );

        Ok((output, report))
    }
}

impl MakeSafe for MotionCtrl {
    fn make_safe(&mut self) {
        self.speed_percent = 0.0;
        self.profile = None;
    }
}

impl MotionCtrl {
    /// Create a MotionCtrl directly from parameters.
    pub fn new(params: Params, policy: FollowPolicy) -> Self {
        Self {
            params,
            policy,
            ..Default::default()
        }
    }

    pub fn set_policy(&mut self, policy: FollowPolicy) {
        self.policy = policy;
    }

    pub fn policy(&self) -> FollowPolicy {
        self.policy
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Install a speed profile, starting now at the given odometer count.
    pub fn install_profile(
        &mut self,
        profile: SpeedProfile,
        now_s: f64,
        odometer: i64,
    ) -> Result<(), MotionCtrlError> {
        if !profile.is_valid() {
            return Err(MotionCtrlError::InvalidProfile(profile));
        }

        debug!(
            "Speed profile installed: {:?} for {} ticks",
            profile.coeffs(),
            profile.valid_for_ticks
        );

        self.profile = Some(InstalledProfile {
            profile,
            installed_at_s: now_s,
            installed_odometer: odometer,
        });

        Ok(())
    }

    pub fn profile_active(&self) -> bool {
        self.profile.is_some()
    }

    /// Speed demand of the last cycle, in percent.
    pub fn speed_percent(&self) -> f64 {
        self.speed_percent
    }

    /// Last distance reading, zero if the car does not measure distances.
    pub fn last_distance_m(&self) -> f64 {
        self.prev_distance_m.unwrap_or(0.0)
    }

    pub fn position_ticks(&self) -> f64 {
        self.position_ticks
    }

    /// Wheel revolutions since the last accepted mark.
    pub fn spin_count(&self) -> f64 {
        self.position_ticks / self.params.ticks_per_spin
    }

    pub fn mark_count(&self) -> u32 {
        self.mark_count
    }
}
