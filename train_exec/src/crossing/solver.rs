//! Speed profile solver
//!
//! Finds the second degree profile `s(t) = c0 + c1 t + c2 t^2` which starts at the current speed,
//! ends at the target speed after `horizon` seconds, and covers `distance` meanwhile:
//!
//! ```text
//! c0 = current
//! c2 T^2   + c1 T     = target - c0
//! c2 T^3/3 + c1 T^2/2 = distance - c0 T
//! ```
//!
//! Speeds and distance only need consistent units, percent and percent-seconds for example.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::SpeedProfile;
use log::warn;
use serde::Serialize;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Relative size of the determinant under which the system is considered singular.
const SINGULAR_EPSILON: f64 = 1e-12;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The equation `a x + b y = c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearEquation {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

/// A solved profile and how it was obtained.
#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    pub profile: SpeedProfile,
    pub outcome: SolveOutcome,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum SolveOutcome {
    /// The profile meets all boundary conditions
    Exact,

    /// The boundary conditions could not be met, a constant profile is used instead
    Fallback(FallbackReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum FallbackReason {
    /// The horizon is not a positive finite time, the current speed is kept
    InvalidHorizon,

    /// The system has no unique solution, the average speed over the horizon is used
    Singular,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Solve the profile going from `current` to `target` over `distance` in `horizon` seconds.
pub fn solve(
    current: f64,
    target: f64,
    distance: f64,
    horizon: f64,
    valid_for_ticks: f64,
) -> Solution {
    let t = horizon;

    if !(t.is_finite() && t > 0.0) {
        warn!("Cannot solve a speed profile over a horizon of {} s", t);
        return Solution {
            profile: SpeedProfile::constant(current, valid_for_ticks),
            outcome: SolveOutcome::Fallback(FallbackReason::InvalidHorizon),
        };
    }

    let end_speed = LinearEquation::new(t.powi(2), t, target - current);
    let covered = LinearEquation::new(t.powi(3) / 3.0, t.powi(2) / 2.0, distance - current * t);

    match solve_system(&end_speed, &covered) {
        Some((c2, c1)) => Solution {
            profile: SpeedProfile::quadratic(current, c1, c2, valid_for_ticks),
            outcome: SolveOutcome::Exact,
        },
        None => {
            warn!(
                "Singular speed profile system (current {}, target {}, distance {}, horizon {})",
                current, target, distance, t
            );
            Solution {
                profile: SpeedProfile::constant(distance / t, valid_for_ticks),
                outcome: SolveOutcome::Fallback(FallbackReason::Singular),
            }
        }
    }
}

/// Solve two linear equations in `(x, y)` by eliminating `y`.
///
/// Returns `None` if the system is singular or the solution is not finite.
pub fn solve_system(e1: &LinearEquation, e2: &LinearEquation) -> Option<(f64, f64)> {
    let reduced = e1.eliminate_y(e2);

    // `reduced.a` is the determinant of the system
    let scale = (e1.a * e2.b).abs().max((e2.a * e1.b).abs());
    if scale == 0.0 || !scale.is_finite() || reduced.a.abs() <= SINGULAR_EPSILON * scale {
        return None;
    }

    let x = reduced.c / reduced.a;

    // Back substitute into the best conditioned equation
    let pivot = if e1.b.abs() >= e2.b.abs() { e1 } else { e2 };
    let y = (pivot.c - pivot.a * x) / pivot.b;

    if x.is_finite() && y.is_finite() {
        Some((x, y))
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LinearEquation {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    pub fn scaled(&self, k: f64) -> Self {
        Self::new(self.a * k, self.b * k, self.c * k)
    }

    pub fn minus(&self, other: &Self) -> Self {
        Self::new(self.a - other.a, self.b - other.b, self.c - other.c)
    }

    /// The combination of `self` and `other` in which `y` vanishes.
    pub fn eliminate_y(&self, other: &Self) -> Self {
        self.scaled(other.b).minus(&other.scaled(self.b))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_solve_system() {
        // x + y = 3, x - y = 1
        let (x, y) = solve_system(
            &LinearEquation::new(1.0, 1.0, 3.0),
            &LinearEquation::new(1.0, -1.0, 1.0),
        )
        .unwrap();
        assert!((x - 2.0).abs() < 1e-12);
        assert!((y - 1.0).abs() < 1e-12);

        // Parallel lines
        assert!(solve_system(
            &LinearEquation::new(1.0, 2.0, 3.0),
            &LinearEquation::new(2.0, 4.0, 1.0),
        )
        .is_none());
    }

    #[test]
    fn test_boundary_conditions() {
        let cases = [
            (30.0, 40.0, 100.0, 3.0),
            (40.0, 20.0, 90.0, 2.925),
            (25.0, 25.0, 75.0, 3.0),
            (10.0, 60.0, 500.0, 12.5),
        ];

        for &(current, target, distance, horizon) in cases.iter() {
            let sol = solve(current, target, distance, horizon, 1500.0);
            assert_eq!(sol.outcome, SolveOutcome::Exact);

            let c = sol.profile.coeffs();
            assert_eq!(c.len(), 3);
            assert!((sol.profile.value(0.0) - current).abs() < 1e-9);
            assert!((sol.profile.value(horizon) - target).abs() < 1e-9);
            assert!((sol.profile.integral(horizon) - distance).abs() < 1e-9);
        }
    }

    #[test]
    fn test_constant_solution() {
        // Already at the right speed to cover the distance
        let sol = solve(25.0, 25.0, 75.0, 3.0, 1500.0);
        let c = sol.profile.coeffs();
        assert!(c[1].abs() < 1e-9);
        assert!(c[2].abs() < 1e-9);
    }

    #[test]
    fn test_fallbacks() {
        let sol = solve(30.0, 40.0, 100.0, 0.0, 1500.0);
        assert_eq!(sol.outcome, SolveOutcome::Fallback(FallbackReason::InvalidHorizon));
        assert_eq!(sol.profile, SpeedProfile::constant(30.0, 1500.0));

        let sol = solve(30.0, 40.0, 100.0, f64::NAN, 1500.0);
        assert_eq!(sol.outcome, SolveOutcome::Fallback(FallbackReason::InvalidHorizon));

        // Tiny horizons make the determinant vanish
        let sol = solve(30.0, 40.0, 1e-3, 1e-90, 1500.0);
        assert_eq!(sol.outcome, SolveOutcome::Fallback(FallbackReason::Singular));
        assert_eq!(sol.profile.degree(), 0);
    }
}
