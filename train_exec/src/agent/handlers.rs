//! Leader message handlers
//!
//! The crossing handshake between the two leaders. The leader which passes the crossing mark tells
//! the other one, which answers with the snapshot of its train if it is also about to cross. From
//! that snapshot the first leader negotiates a speed profile for its own train.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::Message;
use log::{info, warn};

use super::{membership::MembershipEvent, AgentCore, LeaderState, SensorFrame};
use crate::crossing::{CrossingState, OwnKinematics};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Handle a message only a leader knows about.
pub(crate) fn handle_leader_message(
    leader: &mut LeaderState,
    core: &mut AgentCore,
    message: Message,
    frame: &SensorFrame,
) {
    let own_group = core.id.train_group();
    let own_leader = core.id.train_leader();
    let other_leader = core.id.other_train_leader();

    match message {
        Message::TrainInCrossing => {
            info!("Train {} enters the crossing", core.id.train());
            core.membership(MembershipEvent::TrainInCrossing);

            core.send(own_group, Message::InCrossing);
            core.send(other_leader, Message::WarningCrossing);
            core.send(own_group, Message::Speed(core.crossing_params.crossing_speed_percent));
            core.send(
                own_group,
                Message::SafeDistance(core.crossing_params.crossing_distance_m),
            );
        }
        Message::WarningCrossing => {
            info!("The other train entered the crossing");
            leader.other_train_in_crossing = true;

            if core.crossing.is_participant() {
                let snapshot = core.snapshot();
                leader.cars_map.insert(snapshot.id, snapshot);

                core.send(other_leader, Message::CarsMap(leader.cars_map.clone()));
                core.send(
                    own_leader,
                    Message::Speed(core.crossing_params.normal_speed_percent / 2.0),
                );
            }
        }
        Message::TrainOutOfCrossing => {
            info!("Train {} left the crossing", core.id.train());
            let was_participant = core.crossing.is_participant();

            core.send(own_group, Message::OutCrossing);
            core.send(own_group, Message::Speed(core.crossing_params.normal_speed_percent));
            core.send(
                own_group,
                Message::SafeDistance(core.crossing_params.normal_distance_m),
            );

            if was_participant && leader.other_train_in_crossing {
                core.send(other_leader, Message::WarningExitCrossing);
            }

            core.crossing = CrossingState::Clear;
        }
        Message::WarningExitCrossing => {
            info!("The other train left the crossing");
            leader.other_train_in_crossing = false;
            core.send(own_leader, Message::Speed(core.crossing_params.normal_speed_percent));
        }
        Message::CarsMap(map) => {
            let own = OwnKinematics {
                position_ticks: core.motion_ctrl.position_ticks(),
                speed_percent: core.motion_ctrl.speed_percent(),
                max_speed_deg_s: frame.max_speed_deg_s,
            };

            let trace = leader.negotiator.negotiate(&own, &map);
            trace.record();

            if let Some((profile, leading_speed_percent)) = trace.decision() {
                core.send(own_group, Message::SpeedPolynom(profile.clone()));
                core.send(own_group, Message::Speed(leading_speed_percent));
            }
        }
        other => warn!("{} is not a leader message", other.tag()),
    }
}
