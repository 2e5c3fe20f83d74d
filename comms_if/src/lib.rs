//! # Communications interface crate.
//!
//! Provides the messages exchanged between the cars of both trains and the transports which carry
//! them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Car identities and message definitions
pub mod msg;

/// Network module
pub mod net;
