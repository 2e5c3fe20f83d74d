//! Crossing negotiation
//!
//! When both trains approach the crossing, the leader of the train which entered it second
//! receives the snapshot of the other train. From the time each of the other train's cars needs to
//! reach the crossing it picks the widest gap around its own arrival time, aims for the middle of
//! it, and computes a speed profile for its train.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::{CarId, SpeedProfile, TrainSnapshotMap};
use log::{debug, info, warn};
use serde::Serialize;

use super::{solve, CrossingParams, SolveOutcome};
use util::session;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Session path of the saved negotiation traces.
pub const TRACE_PATH: &str = "crossing/negotiation.json";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CrossingNegotiator {
    params: CrossingParams,
}

/// Kinematics of the negotiating leader.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OwnKinematics {
    /// Encoder ticks since the last mark
    pub position_ticks: f64,

    /// Current speed, in percent
    pub speed_percent: f64,

    /// Maximum speed of the motors, assumed identical for all cars.
    ///
    /// Units: degrees/second
    pub max_speed_deg_s: f64,
}

/// Estimated arrival of one car of the other train.
#[derive(Debug, Clone, Serialize)]
pub struct CarEstimate {
    pub id: CarId,
    pub distance_m: f64,
    pub speed_ms: f64,
    pub time_left_s: f64,
}

/// Every intermediate value of a negotiation, kept for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct NegotiationTrace {
    pub own: OwnKinematics,
    pub own_distance_m: f64,
    pub own_speed_ms: f64,
    pub own_time_s: f64,

    /// First car of the other train still before the crossing
    pub reference: Option<CarId>,

    /// Cars of the other train which will reach the crossing
    pub estimates: Vec<CarEstimate>,

    pub average_speed_ms: Option<f64>,

    /// Latest arrival of the other train before ours
    pub min_time_s: Option<f64>,

    /// Earliest arrival of the other train after ours
    pub max_time_s: Option<f64>,

    /// Entry window after the safety margins
    pub window_s: Option<(f64, f64)>,

    pub optimal_time_s: Option<f64>,
    pub adjust_speed_ms: Option<f64>,

    pub outcome: NegotiationOutcome,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub enum NegotiationOutcome {
    /// Every car of the other train has already passed the crossing
    NoCarApproaching,

    /// The inputs do not allow a decision
    Degenerate(String),

    /// A profile was computed for this train
    Profile {
        profile: SpeedProfile,

        /// Speed of the other train's reference car, ordered once the profile expires
        leading_speed_percent: f64,

        /// `None` if the profile is constant and needed no solving
        solve: Option<SolveOutcome>,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CrossingNegotiator {
    pub fn new(params: CrossingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CrossingParams {
        &self.params
    }

    /// Negotiate the crossing against the other train's snapshot.
    pub fn negotiate(&self, own: &OwnKinematics, others: &TrainSnapshotMap) -> NegotiationTrace {
        let p = &self.params;

        let own_distance_m = p.ticks_to_m(p.mark_to_crossing_ticks - own.position_ticks);
        let own_speed_ms = p.real_speed_ms(own.speed_percent, own.max_speed_deg_s);
        let own_time_s = own_distance_m / own_speed_ms;

        let mut trace = NegotiationTrace {
            own: *own,
            own_distance_m,
            own_speed_ms,
            own_time_s,
            reference: None,
            estimates: Vec::new(),
            average_speed_ms: None,
            min_time_s: None,
            max_time_s: None,
            window_s: None,
            optimal_time_s: None,
            adjust_speed_ms: None,
            outcome: NegotiationOutcome::NoCarApproaching,
        };

        // ---- OTHER TRAIN ARRIVALS ----

        let mut reference = None;

        for car in others.values() {
            let forward_m = p.ticks_to_m(p.mark_to_crossing_ticks - car.position_ticks);

            let ref_marks = match reference {
                Some((_, marks, _)) => marks,
                None if forward_m > 0.0 => {
                    reference = Some((car.id, car.mark_count, car.speed_percent));
                    car.mark_count
                }
                None => continue,
            };

            // Cars which have not reached the mark yet are a whole circuit further
            let distance_m = if car.mark_count == ref_marks {
                forward_m
            } else if car.mark_count + 1 == ref_marks {
                p.ticks_to_m(p.mark_to_crossing_ticks + p.circuit_ticks - car.position_ticks)
            } else {
                continue;
            };

            let speed_ms = p.real_speed_ms(car.speed_percent, own.max_speed_deg_s);

            if distance_m > 0.0 && speed_ms > 0.0 {
                trace.estimates.push(CarEstimate {
                    id: car.id,
                    distance_m,
                    speed_ms,
                    time_left_s: distance_m / speed_ms,
                });
            }
        }

        let (reference_id, leading_speed_percent) = match reference {
            Some((id, _, speed)) => (id, speed),
            None => {
                info!("No car of the other train before the crossing, no negotiation needed");
                return trace;
            }
        };
        trace.reference = Some(reference_id);

        if !(own_speed_ms > 0.0 && own_distance_m > 0.0 && own_time_s.is_finite()) {
            return trace.degenerate(format!(
                "own distance {:.3} m at {:.3} m/s cannot be negotiated",
                own_distance_m, own_speed_ms
            ));
        }

        if trace.estimates.is_empty() {
            return trace.degenerate("no moving car of the other train to time".into());
        }

        let average_speed_ms = trace.estimates.iter().map(|e| e.speed_ms).sum::<f64>()
            / trace.estimates.len() as f64;
        trace.average_speed_ms = Some(average_speed_ms);

        // ---- ENTRY WINDOW ----

        let mut min_time_s: Option<f64> = None;
        let mut max_time_s: Option<f64> = None;

        for t in trace.estimates.iter().map(|e| e.time_left_s) {
            if t < own_time_s {
                min_time_s = Some(min_time_s.map_or(t, |m| m.max(t)));
            } else {
                max_time_s = Some(max_time_s.map_or(t, |m| m.min(t)));
            }
        }

        let (min_time_s, max_time_s) = match (min_time_s, max_time_s) {
            (Some(min), Some(max)) => (min, max),
            (Some(min), None) => (min, min + own_time_s),
            (None, Some(max)) => (max - p.min_gap_m / average_speed_ms, max),
            (None, None) => return trace.degenerate("no arrival time".into()),
        };
        trace.min_time_s = Some(min_time_s);
        trace.max_time_s = Some(max_time_s);

        let window_start_s = min_time_s + p.entry_margin_s;
        let window_end_s = max_time_s - 2.0 * p.exit_clearance_m / average_speed_ms;
        trace.window_s = Some((window_start_s, window_end_s));

        let optimal_time_s = (window_start_s + window_end_s) / 2.0;
        trace.optimal_time_s = Some(optimal_time_s);

        if !(optimal_time_s.is_finite() && optimal_time_s > 0.0) {
            return trace.degenerate(format!("optimal time {} s is not usable", optimal_time_s));
        }

        let adjust_speed_ms = own_distance_m / optimal_time_s;
        trace.adjust_speed_ms = Some(adjust_speed_ms);

        // ---- PROFILE ----

        let adjust_percent = p.speed_percent(adjust_speed_ms, own.max_speed_deg_s);

        trace.outcome = if (adjust_percent - leading_speed_percent).abs()
            < p.constant_profile_tolerance_percent
        {
            NegotiationOutcome::Profile {
                profile: SpeedProfile::constant(adjust_percent, p.profile_valid_for_ticks),
                leading_speed_percent,
                solve: None,
            }
        } else {
            // Distance in the profile's units, percent-seconds
            let distance = own_distance_m / p.real_speed_ms(1.0, own.max_speed_deg_s);
            let solution = solve(
                own.speed_percent,
                leading_speed_percent,
                distance,
                optimal_time_s,
                p.profile_valid_for_ticks,
            );

            NegotiationOutcome::Profile {
                profile: solution.profile,
                leading_speed_percent,
                solve: Some(solution.outcome),
            }
        };

        info!(
            "Crossing negotiated: reach it in {:.2} s at {:.3} m/s (window {:.2} to {:.2} s)",
            optimal_time_s, adjust_speed_ms, window_start_s, window_end_s
        );

        trace
    }
}

impl NegotiationTrace {
    /// The profile and the speed to order afterwards, if the negotiation produced one.
    pub fn decision(&self) -> Option<(&SpeedProfile, f64)> {
        match self.outcome {
            NegotiationOutcome::Profile {
                ref profile,
                leading_speed_percent,
                ..
            } => Some((profile, leading_speed_percent)),
            _ => None,
        }
    }

    /// Log the trace and save it in the session, if there is one.
    pub fn record(&self) {
        match serde_json::to_string(self) {
            Ok(s) => debug!("Negotiation trace: {}", s),
            Err(e) => warn!("Could not serialise the negotiation trace: {}", e),
        }

        if session::is_active() {
            session::save_with_timestamp(TRACE_PATH, self.clone());
        }
    }

    fn degenerate(mut self, reason: String) -> Self {
        warn!("Crossing negotiation abandoned: {}", reason);
        self.outcome = NegotiationOutcome::Degenerate(reason);
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::msg::{CarSnapshot, Role};

    const MAX_SPEED: f64 = 740.0;

    fn snapshot(p: &CrossingParams, id: CarId, distance_m: f64, speed_ms: f64, marks: u32) -> CarSnapshot {
        CarSnapshot::new(
            id,
            p.speed_percent(speed_ms, MAX_SPEED),
            0.3,
            p.mark_to_crossing_ticks - p.m_to_ticks(distance_m),
            marks,
            360.0,
        )
    }

    fn own(p: &CrossingParams, distance_m: f64, speed_ms: f64) -> OwnKinematics {
        OwnKinematics {
            position_ticks: p.mark_to_crossing_ticks - p.m_to_ticks(distance_m),
            speed_percent: p.speed_percent(speed_ms, MAX_SPEED),
            max_speed_deg_s: MAX_SPEED,
        }
    }

    #[test]
    fn test_reference_scenario() {
        let n = CrossingNegotiator::default();
        let p = n.params().clone();

        let other = CarId::new(2, Role::Leader);
        let mut map = TrainSnapshotMap::new();
        map.insert(other, snapshot(&p, other, 0.3, 0.2, 1));

        let trace = n.negotiate(&own(&p, 0.5, 0.25), &map);

        assert!((trace.own_time_s - 2.0).abs() < 1e-9);
        assert_eq!(trace.reference, Some(other));
        assert!((trace.min_time_s.unwrap() - 1.5).abs() < 1e-9);

        // No car after us, the max is synthesised from the min and our own time
        let max = trace.max_time_s.unwrap();
        assert!((max - 3.5).abs() < 1e-9);

        let optimal = trace.optimal_time_s.unwrap();
        assert!(optimal > 1.5 && optimal < max);
        assert!((optimal - (2.5 + 3.35) / 2.0).abs() < 1e-9);
        assert!((trace.adjust_speed_ms.unwrap() - 0.5 / optimal).abs() < 1e-9);

        // The adjusted speed is far from the leading one, so the profile is solved
        let (profile, leading) = trace.decision().unwrap();
        assert!((leading - p.speed_percent(0.2, MAX_SPEED)).abs() < 1e-9);
        assert_eq!(profile.degree(), 2);
        assert!((profile.value(0.0) - p.speed_percent(0.25, MAX_SPEED)).abs() < 1e-9);
        assert!((profile.value(optimal) - leading).abs() < 1e-9);
        let distance_pct_s = 0.5 / p.real_speed_ms(1.0, MAX_SPEED);
        assert!((profile.integral(optimal) - distance_pct_s).abs() < 1e-6);
        assert!((profile.valid_for_ticks - 1500.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_passed() {
        let n = CrossingNegotiator::default();
        let p = n.params().clone();

        let mut map = TrainSnapshotMap::new();
        for role in [Role::Leader, Role::Middle, Role::Queue].iter() {
            let id = CarId::new(2, *role);
            map.insert(id, snapshot(&p, id, -0.2, 0.2, 3));
        }

        let trace = n.negotiate(&own(&p, 0.5, 0.25), &map);
        assert!(matches!(trace.outcome, NegotiationOutcome::NoCarApproaching));
        assert!(trace.decision().is_none());

        // An empty map is the same
        let trace = n.negotiate(&own(&p, 0.5, 0.25), &TrainSnapshotMap::new());
        assert!(matches!(trace.outcome, NegotiationOutcome::NoCarApproaching));
    }

    #[test]
    fn test_gap_between_cars() {
        let n = CrossingNegotiator::default();
        let p = n.params().clone();

        let leader = CarId::new(2, Role::Leader);
        let middle = CarId::new(2, Role::Middle);
        let queue = CarId::new(2, Role::Queue);

        let mut map = TrainSnapshotMap::new();
        // The leader has passed, the middle arrives before us, the queue is a lap behind
        map.insert(leader, snapshot(&p, leader, -0.1, 0.2, 2));
        map.insert(middle, snapshot(&p, middle, 0.2, 0.2, 2));
        let queue_pos = p.mark_to_crossing_ticks + p.circuit_ticks - p.m_to_ticks(0.9);
        map.insert(queue, CarSnapshot::new(queue, p.speed_percent(0.2, MAX_SPEED), 0.3, queue_pos, 1, 360.0));

        let trace = n.negotiate(&own(&p, 0.5, 0.25), &map);

        assert_eq!(trace.reference, Some(middle));
        assert_eq!(trace.estimates.len(), 2);
        assert!((trace.estimates[1].distance_m - 0.9).abs() < 1e-9);
        assert!((trace.min_time_s.unwrap() - 1.0).abs() < 1e-9);
        assert!((trace.max_time_s.unwrap() - 4.5).abs() < 1e-9);
        assert!((trace.average_speed_ms.unwrap() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_close_speeds_give_constant_profile() {
        let n = CrossingNegotiator::default();
        let p = n.params().clone();

        let other = CarId::new(1, Role::Leader);
        let mut map = TrainSnapshotMap::new();
        map.insert(other, snapshot(&p, other, 0.165, 0.2, 1));

        let trace = n.negotiate(&own(&p, 0.5, 0.2), &map);

        // Window 1.825 to 3.175 s, optimal 2.5 s, which is the speed we already have
        assert!((trace.optimal_time_s.unwrap() - 2.5).abs() < 1e-9);
        let (profile, _) = trace.decision().unwrap();
        assert_eq!(profile.degree(), 0);
        let expected = p.speed_percent(0.5 / trace.optimal_time_s.unwrap(), MAX_SPEED);
        assert!((profile.value(10.0) - expected).abs() < 1e-9);
        match trace.outcome {
            NegotiationOutcome::Profile { solve, .. } => assert!(solve.is_none()),
            _ => panic!("Expected a profile"),
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        let n = CrossingNegotiator::default();
        let p = n.params().clone();

        let other = CarId::new(2, Role::Leader);
        let mut map = TrainSnapshotMap::new();
        map.insert(other, snapshot(&p, other, 0.3, 0.2, 1));

        // Stopped leader
        let trace = n.negotiate(&own(&p, 0.5, 0.0), &map);
        assert!(matches!(trace.outcome, NegotiationOutcome::Degenerate(_)));

        // Other train stopped before the crossing
        map.insert(other, snapshot(&p, other, 0.3, 0.0, 1));
        let trace = n.negotiate(&own(&p, 0.5, 0.25), &map);
        assert!(matches!(trace.outcome, NegotiationOutcome::Degenerate(_)));
        assert!(trace.decision().is_none());
    }
}
