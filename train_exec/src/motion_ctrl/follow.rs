//! Distance keeping policies for the cars following a leader

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use util::maths::clamp;

use super::Params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Distance readings and speeds a policy decides on.
#[derive(Debug, Clone, Copy)]
pub struct FollowInput {
    /// Distance to the car in front on this cycle, in meters
    pub distance_m: f64,

    /// Distance on the previous cycle, `None` on the first cycle
    pub prev_distance_m: Option<f64>,

    /// Speed percentage demanded on the previous cycle
    pub current_speed_percent: f64,

    /// Speed percentage commanded by the leader
    pub speed_to_reach: f64,

    /// Distance to keep from the car in front, in meters
    pub safe_distance_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowPolicy {
    /// Go at the commanded speed above a threshold distance, stop below it
    AllOrNothing,

    /// Speed proportional to the distance beyond the safe distance
    ToAPoint,

    /// Proportional speed with a second, far, regime
    ToTwoPoints,

    /// Reserved for speed control by messages only, keeps the current speed
    WirelessCommunication,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown follow policy {0:?}, expected one of all-or-nothing, to-a-point, to-two-points or wireless")]
pub struct ParsePolicyError(String);

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute a follower's speed percentage under the given policy.
pub fn follow_speed(policy: FollowPolicy, params: &Params, input: &FollowInput) -> f64 {
    let dist = input.distance_m;

    match policy {
        FollowPolicy::AllOrNothing => {
            let thr = params.all_or_nothing_threshold_m;
            let prev = input.prev_distance_m.unwrap_or(0.0);

            if dist >= thr && prev < thr {
                input.speed_to_reach
            } else if dist < thr && prev >= thr {
                0.0
            } else {
                input.current_speed_percent
            }
        }
        FollowPolicy::ToAPoint => to_a_point(params, input),
        FollowPolicy::ToTwoPoints => {
            let far = params.far_gain * (dist - params.far_offset);

            far.max(to_a_point(params, input))
                .min(params.two_points_cap_percent)
        }
        FollowPolicy::WirelessCommunication => input.current_speed_percent,
    }
}

/// Proportional law, also the near regime of the two points policy.
fn to_a_point(params: &Params, input: &FollowInput) -> f64 {
    clamp(
        params.proportional_gain * (input.distance_m - input.safe_distance_m),
        0.0,
        params.to_a_point_cap_percent,
    )
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for FollowPolicy {
    fn default() -> Self {
        FollowPolicy::ToAPoint
    }
}

impl FromStr for FollowPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "all-or-nothing" | "allornothing" => Ok(FollowPolicy::AllOrNothing),
            "to-a-point" | "toapoint" => Ok(FollowPolicy::ToAPoint),
            "to-two-points" | "totwopoints" => Ok(FollowPolicy::ToTwoPoints),
            "wireless" | "wireless-communication" | "wirelesscommunication" => {
                Ok(FollowPolicy::WirelessCommunication)
            }
            _ => Err(ParsePolicyError(s.into())),
        }
    }
}

impl fmt::Display for FollowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn input(distance_m: f64, prev: Option<f64>, current: f64) -> FollowInput {
        FollowInput {
            distance_m,
            prev_distance_m: prev,
            current_speed_percent: current,
            speed_to_reach: 40.0,
            safe_distance_m: 0.30,
        }
    }

    #[test]
    fn test_to_a_point() {
        let p = Params::default();

        let s = follow_speed(FollowPolicy::ToAPoint, &p, &input(0.5, None, 0.0));
        assert!((s - 20.0).abs() < 1e-9);

        // Too close stops, far away is capped
        assert_eq!(follow_speed(FollowPolicy::ToAPoint, &p, &input(0.1, None, 10.0)), 0.0);
        assert_eq!(follow_speed(FollowPolicy::ToAPoint, &p, &input(2.0, None, 10.0)), 60.0);
    }

    #[test]
    fn test_all_or_nothing() {
        let p = Params::default();
        let pol = FollowPolicy::AllOrNothing;

        // Rising through the threshold goes
        assert_eq!(follow_speed(pol, &p, &input(0.25, Some(0.15), 0.0)), 40.0);
        // Staying above holds
        assert_eq!(follow_speed(pol, &p, &input(0.30, Some(0.25), 33.0)), 33.0);
        // Falling through stops
        assert_eq!(follow_speed(pol, &p, &input(0.10, Some(0.25), 40.0)), 0.0);
        // Staying below holds
        assert_eq!(follow_speed(pol, &p, &input(0.12, Some(0.10), 0.0)), 0.0);
        // First cycle counts as coming from zero
        assert_eq!(follow_speed(pol, &p, &input(0.5, None, 0.0)), 40.0);
    }

    #[test]
    fn test_to_two_points() {
        let p = Params::default();
        let pol = FollowPolicy::ToTwoPoints;

        // Near regime is the proportional law
        let s = follow_speed(pol, &p, &input(0.5, None, 15.0));
        assert!((s - 20.0).abs() < 1e-9);

        let s = follow_speed(pol, &p, &input(0.35, None, 15.0));
        assert!((s - 5.0).abs() < 1e-9);

        assert_eq!(follow_speed(pol, &p, &input(0.2, None, 15.0)), 0.0);

        // Far regime, capped
        assert_eq!(follow_speed(pol, &p, &input(45.0, None, 15.0)), 50.0);
    }

    #[test]
    fn test_to_two_points_starts_from_rest() {
        let p = Params::default();

        // Stopped with free road ahead
        let s = follow_speed(FollowPolicy::ToTwoPoints, &p, &input(1.0, None, 0.0));
        assert_eq!(s, 50.0);

        let s = follow_speed(FollowPolicy::ToTwoPoints, &p, &input(0.4, Some(0.4), 0.0));
        assert!((s - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_wireless_keeps_speed() {
        let p = Params::default();
        let s = follow_speed(FollowPolicy::WirelessCommunication, &p, &input(0.0, None, 27.0));
        assert_eq!(s, 27.0);
    }

    #[test]
    fn test_parse() {
        assert_eq!("to-a-point".parse::<FollowPolicy>().unwrap(), FollowPolicy::ToAPoint);
        assert_eq!("ALL_OR_NOTHING".parse::<FollowPolicy>().unwrap(), FollowPolicy::AllOrNothing);
        assert!("teleport".parse::<FollowPolicy>().is_err());
    }
}
