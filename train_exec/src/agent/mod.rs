//! # Role agent
//!
//! The agent is the brain of a car. Each cycle it applies the messages received since the last
//! cycle, runs motion control on the latest sensor frame, follows the car's membership in the
//! crossing and queues the messages to send. What a car does with a message depends on its role,
//! only a leader handles the crossing handshake and the negotiation with the other train.
//!
//! The agent never touches the hardware or the network itself, see [`crate::car`] for that.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod handlers;
pub mod membership;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::{CarId, CarSnapshot, Message, Role, TrainSnapshotMap};
use log::{debug, info, warn};

use crate::{
    crossing::{CrossingNegotiator, CrossingParams, CrossingState},
    motion_ctrl::{InputData, MotionCtrl, MotionCtrlError, OutputData, StatusReport},
};
use membership::{next_state, MembershipEvent};
use util::module::{MakeSafe, State};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The per-car state machine.
pub struct RoleAgent {
    core: AgentCore,
    role: RoleState,
}

/// State shared by every role.
pub(crate) struct AgentCore {
    id: CarId,
    role: Role,

    /// Speed commanded by the leader, in percent
    speed_to_reach: f64,

    /// Distance to keep from the car in front, in meters
    safe_distance_m: f64,

    crossing: CrossingState,

    motion_ctrl: MotionCtrl,
    crossing_params: CrossingParams,

    report_period_s: f64,
    last_report_s: Option<f64>,

    /// Messages waiting to be sent, with their destination
    outbox: Vec<(CarId, Message)>,

    last_status: Option<StatusReport>,

    halted: bool,
}

/// State only a leader has.
pub struct LeaderState {
    /// True while the other train is in the crossing
    pub other_train_in_crossing: bool,

    /// Last report of every car of this train
    pub cars_map: TrainSnapshotMap,

    negotiator: CrossingNegotiator,
}

/// Sensor data sampled at the start of a cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorFrame {
    /// Units: seconds
    pub now_s: f64,

    pub rgb: [f64; 3],

    /// Distance to the car in front, not sampled on a leader.
    ///
    /// Units: meters
    pub distance_m: Option<f64>,

    /// Encoder count reset on every mark
    pub tacho: i64,

    /// Encoder count never reset
    pub odometer: i64,

    /// Units: degrees/second
    pub max_speed_deg_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

pub enum RoleState {
    Leader(LeaderState),
    Middle,
    Queue,
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("{0} does not identify a single car")]
    InvalidId(CarId),

    #[error("Only a leader can handle {tag}, this car is a {role}")]
    RoleMismatch { tag: &'static str, role: Role },

    #[error("The car is halted")]
    Halted,

    #[error("Motion control error: {0}")]
    MotionCtrl(#[from] MotionCtrlError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RoleAgent {
    /// Create the agent of the car `id`.
    pub fn new(
        id: CarId,
        motion_ctrl: MotionCtrl,
        crossing_params: CrossingParams,
        report_period_s: f64,
    ) -> Result<Self, AgentError> {
        let role = id.role().ok_or(AgentError::InvalidId(id))?;

        let role_state = match role {
            Role::Leader => RoleState::Leader(LeaderState {
                other_train_in_crossing: false,
                cars_map: TrainSnapshotMap::new(),
                negotiator: CrossingNegotiator::new(crossing_params.clone()),
            }),
            Role::Middle => RoleState::Middle,
            Role::Queue => RoleState::Queue,
        };

        info!("Agent of {} created", id);

        Ok(Self {
            core: AgentCore {
                id,
                role,
                speed_to_reach: crossing_params.normal_speed_percent,
                safe_distance_m: crossing_params.normal_distance_m,
                crossing: CrossingState::Clear,
                motion_ctrl,
                crossing_params,
                report_period_s,
                last_report_s: None,
                outbox: Vec::new(),
                last_status: None,
                halted: false,
            },
            role: role_state,
        })
    }

    /// Apply one received message.
    pub fn handle_message(
        &mut self,
        message: Message,
        frame: &SensorFrame,
    ) -> Result<(), AgentError> {
        if self.core.halted {
            return Err(AgentError::Halted);
        }

        if message.is_leader_only() {
            return match self.role {
                RoleState::Leader(ref mut leader) => {
                    handlers::handle_leader_message(leader, &mut self.core, message, frame);
                    Ok(())
                }
                _ => Err(AgentError::RoleMismatch {
                    tag: message.tag(),
                    role: self.core.role,
                }),
            };
        }

        match message {
            Message::Speed(s) => {
                debug!("Speed to reach {:.1} %", s);
                self.core.speed_to_reach = s;
            }
            Message::SafeDistance(d) => {
                if self.core.role != Role::Leader {
                    debug!("Safe distance {:.3} m", d);
                    self.core.safe_distance_m = d;
                }
            }
            Message::SpeedPolynom(profile) => {
                self.core
                    .motion_ctrl
                    .install_profile(profile, frame.now_s, frame.odometer)?;
            }
            Message::Coordinates(snapshot) => {
                if let RoleState::Leader(ref mut leader) = self.role {
                    leader.cars_map.insert(snapshot.id, snapshot);
                }
            }
            Message::InCrossing => self.core.membership(MembershipEvent::InCrossing),
            Message::OutCrossing => self.core.membership(MembershipEvent::OutCrossing),
            Message::Debug => self.core.halt(),

            // Leader only messages were dispatched above
            _ => (),
        }

        Ok(())
    }

    /// Run one cycle of the agent.
    ///
    /// Applies the messages of `inbox`, then computes the motor demands from the sensor frame.
    /// Returns `AgentError::Halted` once a halt has been requested.
    pub fn step(
        &mut self,
        inbox: Vec<Message>,
        frame: &SensorFrame,
    ) -> Result<OutputData, AgentError> {
        for message in inbox {
            match self.handle_message(message, frame) {
                Ok(()) => (),
                Err(AgentError::Halted) => break,
                Err(e @ AgentError::RoleMismatch { .. }) => {
                    debug_assert!(false, "{}", e);
                    warn!("Message ignored: {}", e);
                }
                Err(e) => warn!("Message ignored: {}", e),
            }
        }

        if self.core.halted {
            return Err(AgentError::Halted);
        }

        // ---- MOTION ----

        let input = InputData {
            now_s: frame.now_s,
            rgb: frame.rgb,
            distance_m: match self.role {
                RoleState::Leader(_) => None,
                _ => frame.distance_m,
            },
            tacho: frame.tacho,
            odometer: frame.odometer,
            speed_to_reach: self.core.speed_to_reach,
            safe_distance_m: self.core.safe_distance_m,
        };

        let (output, report) = self.core.motion_ctrl.proc(&input)?;
        self.core.last_status = Some(report);

        // ---- MEMBERSHIP ----

        if report.mark_accepted {
            self.core.membership(MembershipEvent::MarkPassed);
        }
        self.core.membership(MembershipEvent::Travelled {
            spin_count: report.spin_count,
        });

        // ---- REPORT ----

        let report_due = match self.core.last_report_s {
            Some(t) => frame.now_s - t >= self.core.report_period_s,
            None => true,
        };

        if report_due {
            let snapshot = self.snapshot();
            self.core.send(self.core.id.train_leader(), Message::Coordinates(snapshot));
            self.core.last_report_s = Some(frame.now_s);
        }

        Ok(output)
    }

    /// Take the messages queued since the last call.
    pub fn take_outbox(&mut self) -> Vec<(CarId, Message)> {
        std::mem::take(&mut self.core.outbox)
    }

    /// Current state of this car as reported to its leader.
    pub fn snapshot(&self) -> CarSnapshot {
        self.core.snapshot()
    }

    /// Lines describing the car's state, for its display.
    pub fn display_lines(&self) -> Vec<String> {
        if self.core.halted {
            return vec!["HALTED".into()];
        }

        let mut lines = vec![
            format!("{}", self.core.id),
            format!("{:.0} %", self.core.motion_ctrl.speed_percent()),
            format!("{:?}", self.core.crossing),
        ];

        if let Some(ref s) = self.core.last_status {
            lines.push(format!("marks {} spins {:.1}", s.mark_count, s.spin_count));
        }

        lines
    }

    pub fn id(&self) -> CarId {
        self.core.id
    }

    pub fn role_state(&self) -> &RoleState {
        &self.role
    }

    pub fn crossing_state(&self) -> CrossingState {
        self.core.crossing
    }

    pub fn speed_to_reach(&self) -> f64 {
        self.core.speed_to_reach
    }

    pub fn safe_distance_m(&self) -> f64 {
        self.core.safe_distance_m
    }

    pub fn motion_ctrl(&self) -> &MotionCtrl {
        &self.core.motion_ctrl
    }

    pub fn is_halted(&self) -> bool {
        self.core.halted
    }
}

impl MakeSafe for RoleAgent {
    fn make_safe(&mut self) {
        self.core.motion_ctrl.make_safe();
    }
}

impl AgentCore {
    fn send(&mut self, to: CarId, message: Message) {
        debug!("Queued {} to {}", message.tag(), to);
        self.outbox.push((to, message));
    }

    fn membership(&mut self, event: MembershipEvent) {
        let exit_window = self.motion_ctrl.params().exit_window_spins;
        let (next, notify) = next_state(self.role, self.crossing, event, exit_window);

        self.crossing = next;

        if let Some(m) = notify {
            self.send(self.id.train_leader(), m);
        }
    }

    fn snapshot(&self) -> CarSnapshot {
        CarSnapshot::new(
            self.id,
            self.motion_ctrl.speed_percent(),
            self.motion_ctrl.last_distance_m(),
            self.motion_ctrl.position_ticks(),
            self.motion_ctrl.mark_count(),
            self.motion_ctrl.params().ticks_per_spin,
        )
    }

    fn halt(&mut self) {
        warn!("Halt requested, {} stops", self.id);
        self.halted = true;
        self.motion_ctrl.make_safe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::sim::{RGB_BLACK, RGB_ORANGE};
    use crate::motion_ctrl::{FollowPolicy, Params};
    use comms_if::msg::SpeedProfile;

    fn agent(train: u8, role: Role) -> RoleAgent {
        RoleAgent::new(
            CarId::new(train, role),
            MotionCtrl::new(Params::default(), FollowPolicy::ToAPoint),
            CrossingParams::default(),
            0.5,
        )
        .unwrap()
    }

    fn frame(now_s: f64, rgb: [f64; 3], tacho: i64) -> SensorFrame {
        SensorFrame {
            now_s,
            rgb,
            distance_m: Some(0.5),
            tacho,
            odometer: tacho,
            max_speed_deg_s: 740.0,
        }
    }

    #[test]
    fn test_group_id_rejected() {
        let r = RoleAgent::new(
            CarId::group(1).unwrap(),
            MotionCtrl::default(),
            CrossingParams::default(),
            0.5,
        );
        assert!(matches!(r, Err(AgentError::InvalidId(_))));
    }

    #[test]
    fn test_common_messages() {
        let mut a = agent(1, Role::Middle);
        let f = frame(0.0, RGB_BLACK, 0);

        a.handle_message(Message::Speed(55.0), &f).unwrap();
        a.handle_message(Message::SafeDistance(0.2), &f).unwrap();
        assert_eq!(a.speed_to_reach(), 55.0);
        assert_eq!(a.safe_distance_m(), 0.2);

        // Leaders keep no follow margin
        let mut l = agent(1, Role::Leader);
        l.handle_message(Message::SafeDistance(0.2), &f).unwrap();
        assert_eq!(l.safe_distance_m(), 0.30);

        a.handle_message(Message::SpeedPolynom(SpeedProfile::constant(12.0, 100.0)), &f)
            .unwrap();
        assert!(a.motion_ctrl().profile_active());
        assert!(matches!(
            a.handle_message(
                Message::SpeedPolynom(SpeedProfile::constant(f64::NAN, 100.0)),
                &f
            ),
            Err(AgentError::MotionCtrl(_))
        ));

        a.handle_message(Message::InCrossing, &f).unwrap();
        assert_eq!(a.crossing_state(), CrossingState::InCrossing);
        a.handle_message(Message::OutCrossing, &f).unwrap();
        assert_eq!(a.crossing_state(), CrossingState::Clear);
    }

    #[test]
    fn test_leader_only_messages() {
        let f = frame(0.0, RGB_BLACK, 0);

        for &role in [Role::Middle, Role::Queue].iter() {
            let mut a = agent(2, role);
            for m in vec![
                Message::TrainInCrossing,
                Message::WarningCrossing,
                Message::TrainOutOfCrossing,
                Message::WarningExitCrossing,
                Message::CarsMap(TrainSnapshotMap::new()),
            ] {
                match a.handle_message(m, &f) {
                    Err(AgentError::RoleMismatch { role: r, .. }) => assert_eq!(r, role),
                    other => panic!("Expected a role mismatch, got {:?}", other),
                }
            }
            assert!(a.take_outbox().is_empty());
        }

        // Coordinates are only kept by leaders
        let snapshot = CarSnapshot::new(CarId::new(2, Role::Queue), 30.0, 0.3, 100.0, 1, 360.0);
        let mut m = agent(2, Role::Middle);
        m.handle_message(Message::Coordinates(snapshot), &f).unwrap();

        let mut l = agent(2, Role::Leader);
        l.handle_message(Message::Coordinates(snapshot), &f).unwrap();
        match l.role_state() {
            RoleState::Leader(s) => assert_eq!(s.cars_map.get(&snapshot.id), Some(&snapshot)),
            _ => panic!("Expected a leader"),
        }
    }

    #[test]
    fn test_step_and_report() {
        let mut a = agent(1, Role::Queue);

        let out = a.step(vec![Message::Speed(40.0)], &frame(0.0, RGB_BLACK, 0)).unwrap();
        // Follows at ToAPoint, 0.5 m away
        assert!((out.speed_percent - 20.0).abs() < 1e-9);

        let outbox = a.take_outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].0, CarId::new(1, Role::Leader));
        assert!(matches!(outbox[0].1, Message::Coordinates(_)));

        // Next report only after the report period
        a.step(vec![], &frame(0.2, RGB_BLACK, 60)).unwrap();
        assert!(a.take_outbox().is_empty());
        a.step(vec![], &frame(0.5, RGB_BLACK, 150)).unwrap();
        assert_eq!(a.take_outbox().len(), 1);
    }

    #[test]
    fn test_queue_leaves_crossing() {
        let mut a = agent(1, Role::Queue);

        a.step(vec![Message::InCrossing], &frame(0.0, RGB_BLACK, 0)).unwrap();
        assert_eq!(a.crossing_state(), CrossingState::InCrossing);
        a.take_outbox();

        let out = a.step(vec![], &frame(1.0, RGB_ORANGE, 100)).unwrap();
        assert!(out.reset_tacho);
        assert_eq!(a.crossing_state(), CrossingState::Exiting);

        // The tacho was reset on the mark, 6.5 spins later the queue has left
        a.step(vec![], &frame(2.0, RGB_BLACK, 1000)).unwrap();
        assert_eq!(a.crossing_state(), CrossingState::Exiting);
        a.take_outbox();

        a.step(vec![], &frame(3.0, RGB_BLACK, 2340)).unwrap();
        assert_eq!(a.crossing_state(), CrossingState::Clear);
        let outbox = a.take_outbox();
        assert!(outbox.contains(&(CarId::new(1, Role::Leader), Message::TrainOutOfCrossing)));
    }

    #[test]
    fn test_debug_halts() {
        let mut a = agent(2, Role::Middle);
        a.step(vec![], &frame(0.0, RGB_BLACK, 0)).unwrap();

        let r = a.step(
            vec![Message::Debug, Message::Speed(80.0)],
            &frame(0.1, RGB_BLACK, 10),
        );
        assert!(matches!(r, Err(AgentError::Halted)));
        assert!(a.is_halted());
        assert_eq!(a.motion_ctrl().speed_percent(), 0.0);

        // The speed after the halt was not applied
        assert_eq!(a.speed_to_reach(), 40.0);
        assert_eq!(a.display_lines(), vec!["HALTED".to_string()]);

        // Halting is terminal
        assert!(matches!(
            a.handle_message(Message::Speed(10.0), &frame(0.2, RGB_BLACK, 20)),
            Err(AgentError::Halted)
        ));
        assert!(matches!(
            a.step(vec![], &frame(0.3, RGB_BLACK, 30)),
            Err(AgentError::Halted)
        ));
    }
}
