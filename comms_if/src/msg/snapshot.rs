//! Car state snapshots shared with the leader

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::CarId;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Report of a car's motion state, sent periodically to its leader.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CarSnapshot {
    /// The car this snapshot describes
    pub id: CarId,

    /// Commanded speed as a percentage of the maximum motor speed
    pub speed_percent: f64,

    /// Last distance measured to the car in front, in meters
    pub last_distance: f64,

    /// Odometer position since the last accepted mark, in motor ticks
    pub position_ticks: f64,

    /// Wheel revolutions since the last accepted mark
    pub spin_count: f64,

    /// Number of marks accepted since start
    pub mark_count: u32,
}

/// A leader's view of every car of its train, ordered by car id.
pub type TrainSnapshotMap = BTreeMap<CarId, CarSnapshot>;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CarSnapshot {
    /// Build a snapshot, the spin count is derived from the position and the encoder ticks per
    /// wheel revolution.
    pub fn new(
        id: CarId,
        speed_percent: f64,
        last_distance: f64,
        position_ticks: f64,
        mark_count: u32,
        ticks_per_spin: f64,
    ) -> Self {
        Self {
            id,
            speed_percent,
            last_distance,
            position_ticks,
            spin_count: position_ticks / ticks_per_spin,
            mark_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::Role;

    #[test]
    fn test_spin_count() {
        let id = CarId::new(1, Role::Queue);

        let s = CarSnapshot::new(id, 30.0, 0.3, 720.0, 2, 360.0);
        assert_eq!(s.spin_count, 2.0);

        let s = CarSnapshot::new(id, 30.0, 0.3, 720.0, 2, 180.0);
        assert_eq!(s.spin_count, 4.0);
    }
}
