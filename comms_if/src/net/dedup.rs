//! Duplicate and stale message rejection

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use crate::msg::{CarId, Envelope};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Last accepted stamp of every sender.
///
/// An envelope is accepted only if its stamp is strictly greater than the last accepted stamp of
/// its sender, which drops redundant copies as well as late, reordered messages.
#[derive(Debug, Default, Clone)]
pub struct DedupLedger {
    last_accepted: HashMap<CarId, u64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the envelope against the ledger, recording its stamp if accepted.
    pub fn accept(&mut self, envelope: &Envelope) -> bool {
        self.accept_stamp(envelope.from, envelope.sent_at)
    }

    /// Check a sender's stamp against the ledger, recording it if accepted.
    pub fn accept_stamp(&mut self, from: CarId, sent_at: u64) -> bool {
        match self.last_accepted.get(&from) {
            Some(&last) if sent_at <= last => false,
            _ => {
                self.last_accepted.insert(from, sent_at);
                true
            }
        }
    }

    /// Last accepted stamp of the sender, if any.
    pub fn last_accepted(&self, from: CarId) -> Option<u64> {
        self.last_accepted.get(&from).copied()
    }
}
