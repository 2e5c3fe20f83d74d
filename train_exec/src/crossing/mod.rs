//! # Crossing module
//!
//! The two trains run on separate circuits sharing one crossing. This module holds the geometry of
//! the circuit, the state of a car with respect to the crossing and the negotiation by which a
//! leader fits its train between the cars of the other one.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod negotiator;
mod params;
mod solver;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

pub use negotiator::*;
pub use params::*;
pub use solver::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Membership of a car's train in the crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CrossingState {
    /// Away from the crossing
    Clear,

    /// The leader passed the crossing mark and told itself so
    Entering,

    /// The train is going through the crossing
    InCrossing,

    /// The queue car passed the crossing mark, the train is leaving
    Exiting,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for CrossingState {
    fn default() -> Self {
        CrossingState::Clear
    }
}

impl CrossingState {
    /// True if the train takes part in the crossing.
    pub fn is_participant(self) -> bool {
        self != CrossingState::Clear
    }
}
