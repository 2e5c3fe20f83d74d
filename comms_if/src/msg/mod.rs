//! # Message Module
//!
//! Defines the identities of the cars and the closed set of messages exchanged between them. Every
//! datagram on the network carries exactly one [`Envelope`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod car_id;
mod profile;
mod snapshot;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

pub use car_id::*;
pub use profile::*;
pub use snapshot::*;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The unit transmitted over the network.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Envelope {
    /// The car which sent the message
    pub from: CarId,

    /// The destination, either a single car or a whole train (group id)
    pub to: CarId,

    /// Per-sender stamp in milliseconds, strictly increasing between distinct messages of one
    /// sender and shared by all redundant copies of the same message.
    pub sent_at: u64,

    /// The message itself
    pub message: Message,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// All messages that can be exchanged between cars.
///
/// Serialised as `{"tag": "<name>", "payload": <value>}`, payload-less messages omit `payload`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "tag", content = "payload", rename_all = "camelCase")]
pub enum Message {
    /// Periodic self-report of a car to its leader
    Coordinates(CarSnapshot),

    /// A leader's view of its whole train, sent to the other leader
    CarsMap(TrainSnapshotMap),

    /// Target speed as a percentage of the motors' maximum speed
    Speed(f64),

    /// Distance to keep from the car in front, in meters
    SafeDistance(f64),

    /// Speed profile to follow until it expires
    SpeedPolynom(SpeedProfile),

    /// The leader has passed the crossing mark (leader to itself)
    TrainInCrossing,

    /// The other train has entered the crossing (leader to leader)
    WarningCrossing,

    /// This train is in the crossing (leader to its train)
    InCrossing,

    /// The queue car has left the crossing (queue to leader)
    TrainOutOfCrossing,

    /// The other train has left the crossing (leader to leader)
    WarningExitCrossing,

    /// This train has left the crossing (leader to its train)
    OutCrossing,

    /// Stop the motors and halt
    Debug,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Envelope {
    /// Serialize the envelope to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize an envelope from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl Message {
    /// The wire tag of this message.
    pub fn tag(&self) -> &'static str {
        match self {
            Message::Coordinates(_) => "coordinates",
            Message::CarsMap(_) => "carsMap",
            Message::Speed(_) => "speed",
            Message::SafeDistance(_) => "safeDistance",
            Message::SpeedPolynom(_) => "speedPolynom",
            Message::TrainInCrossing => "trainInCrossing",
            Message::WarningCrossing => "warningCrossing",
            Message::InCrossing => "inCrossing",
            Message::TrainOutOfCrossing => "trainOutOfCrossing",
            Message::WarningExitCrossing => "warningExitCrossing",
            Message::OutCrossing => "outCrossing",
            Message::Debug => "debug",
        }
    }

    /// True if only a leader knows how to handle this message.
    pub fn is_leader_only(&self) -> bool {
        matches!(
            self,
            Message::TrainInCrossing
                | Message::WarningCrossing
                | Message::TrainOutOfCrossing
                | Message::WarningExitCrossing
                | Message::CarsMap(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_tags() {
        let bytes = serde_json::to_string(&Message::Speed(40.0)).unwrap();
        assert_eq!(bytes, r#"{"tag":"speed","payload":40.0}"#);

        let bytes = serde_json::to_string(&Message::TrainOutOfCrossing).unwrap();
        assert_eq!(bytes, r#"{"tag":"trainOutOfCrossing"}"#);

        // Every tag reported by `tag()` matches the serialised one
        let msgs = vec![
            Message::SafeDistance(0.3),
            Message::WarningCrossing,
            Message::InCrossing,
            Message::WarningExitCrossing,
            Message::OutCrossing,
            Message::Debug,
            Message::SpeedPolynom(SpeedProfile::constant(20.0, 1500.0)),
        ];
        for m in msgs {
            let v: serde_json::Value = serde_json::to_value(&m).unwrap();
            assert_eq!(v["tag"], m.tag());
        }
    }

    #[test]
    fn test_envelope_with_map() {
        let leader = CarId::new(1, Role::Leader);
        let queue = CarId::new(1, Role::Queue);

        let mut map = TrainSnapshotMap::new();
        map.insert(leader, CarSnapshot::new(leader, 40.0, 0.0, 120.0, 1, 360.0));
        map.insert(queue, CarSnapshot::new(queue, 38.0, 0.31, 4000.0, 0, 360.0));

        let env = Envelope {
            from: leader,
            to: CarId::new(2, Role::Leader),
            sent_at: 1_234,
            message: Message::CarsMap(map),
        };

        let bytes = env.to_bytes().unwrap();
        let parsed = Envelope::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, env);

        match parsed.message {
            Message::CarsMap(m) => {
                let ids: Vec<u8> = m.keys().map(|k| k.raw()).collect();
                assert_eq!(ids, vec![11, 13]);
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(Envelope::from_bytes(b"not json").is_err());
        assert!(Envelope::from_bytes(br#"{"from":11,"to":10,"sent_at":1,"message":{"tag":"fly"}}"#).is_err());
        // Car ids outside of the two trains are rejected
        assert!(Envelope::from_bytes(br#"{"from":91,"to":10,"sent_at":1,"message":{"tag":"debug"}}"#).is_err());
    }

    #[test]
    fn test_leader_only() {
        assert!(Message::CarsMap(TrainSnapshotMap::new()).is_leader_only());
        assert!(Message::TrainInCrossing.is_leader_only());
        assert!(!Message::InCrossing.is_leader_only());
        assert!(!Message::Speed(1.0).is_leader_only());
    }
}
