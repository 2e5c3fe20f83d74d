//! Car and train identities

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of trains on the circuit.
pub const NUM_TRAINS: u8 = 2;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Identifier of a car, or of a whole train when used as a destination.
///
/// Encoded as `train * 10 + role`, so `11` is the leader of train 1 and `23` the queue of train 2.
/// A role digit of zero addresses every car of the train (`10`, `20`).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub struct CarId(u8);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Position of a car within its train.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Leader,
    Middle,
    Queue,
}

#[derive(Debug, Error, PartialEq)]
pub enum CarIdError {
    #[error("Train number must be between 1 and {}, got {0}", NUM_TRAINS)]
    InvalidTrain(u8),

    #[error("Role code must be 1 (leader), 2 (middle) or 3 (queue), got {0}")]
    InvalidRole(u8),

    #[error("Unknown role name {0:?}")]
    UnknownRoleName(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CarId {
    /// Build the id of the car with the given role in the given train.
    ///
    /// # Panics
    /// - If `train` is not a valid train number, use [`CarId::try_new`] for unchecked input.
    pub fn new(train: u8, role: Role) -> Self {
        match Self::try_new(train, role) {
            Ok(id) => id,
            Err(e) => panic!("{}", e),
        }
    }

    /// Build the id of a car, checking the train number.
    pub fn try_new(train: u8, role: Role) -> Result<Self, CarIdError> {
        check_train(train)?;
        Ok(Self(train * 10 + role.code()))
    }

    /// The id addressing every car of the given train.
    pub fn group(train: u8) -> Result<Self, CarIdError> {
        check_train(train)?;
        Ok(Self(train * 10))
    }

    /// The raw numeric value of the id.
    pub fn raw(self) -> u8 {
        self.0
    }

    /// The train this id belongs to.
    pub fn train(self) -> u8 {
        self.0 / 10
    }

    /// The role of the car, `None` for a group id.
    pub fn role(self) -> Option<Role> {
        Role::from_code(self.0 % 10).ok()
    }

    pub fn is_group(self) -> bool {
        self.0 % 10 == 0
    }

    /// The group id of this car's train.
    pub fn train_group(self) -> Self {
        Self(self.train() * 10)
    }

    /// The leader of this car's train.
    pub fn train_leader(self) -> Self {
        Self(self.train() * 10 + Role::Leader.code())
    }

    /// The leader of the other train.
    pub fn other_train_leader(self) -> Self {
        Self((NUM_TRAINS + 1 - self.train()) * 10 + Role::Leader.code())
    }

    /// True if an envelope addressed to `to` is meant for this car.
    pub fn accepts(self, to: CarId) -> bool {
        to == self || to == self.train_group()
    }
}

impl TryFrom<u8> for CarId {
    type Error = CarIdError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        check_train(raw / 10)?;
        match raw % 10 {
            0..=3 => Ok(Self(raw)),
            r => Err(CarIdError::InvalidRole(r)),
        }
    }
}

impl From<CarId> for u8 {
    fn from(id: CarId) -> Self {
        id.0
    }
}

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role() {
            Some(r) => write!(f, "T{}-{}", self.train(), r),
            None => write!(f, "T{}-All", self.train()),
        }
    }
}

impl Role {
    /// The role digit used in car ids and by the role selection buttons.
    pub fn code(self) -> u8 {
        match self {
            Role::Leader => 1,
            Role::Middle => 2,
            Role::Queue => 3,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, CarIdError> {
        match code {
            1 => Ok(Role::Leader),
            2 => Ok(Role::Middle),
            3 => Ok(Role::Queue),
            c => Err(CarIdError::InvalidRole(c)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Leader => "Leader",
            Role::Middle => "Middle",
            Role::Queue => "Queue",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Role {
    type Err = CarIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "leader" | "1" => Ok(Role::Leader),
            "middle" | "2" => Ok(Role::Middle),
            "queue" | "3" => Ok(Role::Queue),
            _ => Err(CarIdError::UnknownRoleName(s.into())),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn check_train(train: u8) -> Result<(), CarIdError> {
    if (1..=NUM_TRAINS).contains(&train) {
        Ok(())
    } else {
        Err(CarIdError::InvalidTrain(train))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_addressing() {
        let l1 = CarId::new(1, Role::Leader);
        let m1 = CarId::new(1, Role::Middle);
        let q2 = CarId::new(2, Role::Queue);

        assert_eq!(l1.raw(), 11);
        assert_eq!(m1.raw(), 12);
        assert_eq!(q2.raw(), 23);

        assert_eq!(m1.train_leader(), l1);
        assert_eq!(q2.train_group().raw(), 20);
        assert_eq!(l1.other_train_leader().raw(), 21);
        assert_eq!(q2.other_train_leader(), l1);

        assert!(m1.accepts(m1));
        assert!(m1.accepts(CarId::group(1).unwrap()));
        assert!(!m1.accepts(CarId::group(2).unwrap()));
        assert!(!m1.accepts(l1));
    }

    #[test]
    fn test_parse() {
        assert!(CarId::try_from(10).unwrap().is_group());
        assert_eq!(CarId::try_from(22).unwrap().role(), Some(Role::Middle));
        assert_eq!(CarId::try_from(24), Err(CarIdError::InvalidRole(4)));
        assert_eq!(CarId::try_from(31), Err(CarIdError::InvalidTrain(3)));
        assert_eq!(CarId::try_new(0, Role::Leader), Err(CarIdError::InvalidTrain(0)));

        assert_eq!("Queue".parse::<Role>(), Ok(Role::Queue));
        assert_eq!("2".parse::<Role>(), Ok(Role::Middle));
        assert!("caboose".parse::<Role>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(CarId::new(2, Role::Leader).to_string(), "T2-Leader");
        assert_eq!(CarId::group(1).unwrap().to_string(), "T1-All");
    }
}
