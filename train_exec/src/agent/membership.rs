//! Crossing membership state machine
//!
//! Membership changes are driven by the marks a car passes, the distance it travelled since and
//! the notifications of its leader. Some transitions require telling the leader.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::{Message, Role};
use log::info;

use crate::crossing::CrossingState;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MembershipEvent {
    /// An accepted mark was passed
    MarkPassed,

    /// Wheel revolutions since the last mark, reported every cycle
    Travelled { spin_count: f64 },

    /// The leader handled its own `trainInCrossing`
    TrainInCrossing,

    /// The leader announced the train is in the crossing
    InCrossing,

    /// The train has left the crossing
    OutCrossing,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Apply an event to the membership of a car with the given role.
///
/// Returns the new state and the message to send to the car's leader, if any. `exit_window` bounds
/// (exclusive) the spin count after the mark at which the queue car has left the crossing.
pub fn next_state(
    role: Role,
    state: CrossingState,
    event: MembershipEvent,
    exit_window: [f64; 2],
) -> (CrossingState, Option<Message>) {
    use crate::crossing::CrossingState::*;
    use MembershipEvent as E;

    let (next, notify) = match (role, state, event) {
        (_, _, E::OutCrossing) => (Clear, None),
        (_, _, E::InCrossing) => (InCrossing, None),

        (Role::Leader, Clear, E::MarkPassed) => (Entering, Some(Message::TrainInCrossing)),
        (Role::Leader, _, E::TrainInCrossing) => (InCrossing, None),

        (Role::Queue, InCrossing, E::MarkPassed) => (Exiting, None),
        (Role::Queue, Exiting, E::Travelled { spin_count })
            if spin_count > exit_window[0] && spin_count < exit_window[1] =>
        {
            (Clear, Some(Message::TrainOutOfCrossing))
        }

        (_, s, _) => (s, None),
    };

    if next != state {
        info!("Crossing membership {:?} -> {:?}", state, next);
    }

    (next, notify)
}
