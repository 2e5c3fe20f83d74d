//! # Train library.
//!
//! Everything a car needs to take part in a train: hardware capabilities, motion control, the
//! crossing negotiation and the per-role agent which ties them to the network.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Role agent - per car state machine dispatching messages and producing motor demands
pub mod agent;

/// Car - runs one control cycle of a car over its hardware and the network
pub mod car;

/// Crossing negotiation - computes speed profiles letting both trains share the crossing
pub mod crossing;

/// Hardware abstraction - motors, sensors, display and user input
pub mod hal;

/// Mailbox - background reception of messages for this car
pub mod mailbox;

/// Motion control - line following, distance keeping and position tracking
pub mod motion_ctrl;

/// Executable parameters
pub mod params;
