//! # Mailbox
//!
//! Receives the messages addressed to this car in a background thread, so that the control loop
//! never blocks on the network. The background thread drops envelopes for other cars and
//! redundant copies of messages already received, and queues the rest until the control loop
//! drains them.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    msg::{CarId, Envelope, Message},
    net::{Datagram, DedupLedger, TransportReceiver},
};
use log::{debug, info, trace, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{channel, Receiver, Sender, TryRecvError},
        Arc,
    },
    thread::{self, JoinHandle},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Inbound queue of a car, filled by a background receive thread.
pub struct Mailbox {
    car_id: CarId,

    rx: Receiver<Message>,

    bg_run: Arc<AtomicBool>,
    bg_jh: Option<JoinHandle<()>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Mailbox {
    /// Start receiving the messages for `car_id` from the given receiver.
    pub fn spawn<D: Datagram + 'static>(receiver: TransportReceiver<D>, car_id: CarId) -> Self {
        let (tx, rx) = channel();

        let bg_run = Arc::new(AtomicBool::new(true));
        let bg_run_clone = bg_run.clone();

        let bg_jh = Some(thread::spawn(move || {
            bg_thread(receiver, car_id, bg_run_clone, tx)
        }));

        info!("Mailbox of {} started", car_id);

        Self {
            car_id,
            rx,
            bg_run,
            bg_jh,
        }
    }

    /// Get every message received since the last drain, without blocking.
    pub fn drain(&self) -> Vec<Message> {
        let mut messages = Vec::new();

        loop {
            match self.rx.try_recv() {
                Ok(m) => messages.push(m),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("Mailbox of {} has stopped receiving", self.car_id);
                    break;
                }
            }
        }

        messages
    }

    pub fn car_id(&self) -> CarId {
        self.car_id
    }
}

impl Drop for Mailbox {
    fn drop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        // The thread notices the flag within one receive timeout
        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                warn!("Mailbox thread of {} panicked", self.car_id);
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// True if the envelope is addressed to this car, directly or through its train's group.
pub fn filter_envelope(car_id: CarId, envelope: &Envelope) -> bool {
    car_id.accepts(envelope.to)
}

/// Background thread, queues the accepted messages until told to stop.
fn bg_thread<D: Datagram>(
    mut receiver: TransportReceiver<D>,
    car_id: CarId,
    run: Arc<AtomicBool>,
    tx: Sender<Message>,
) {
    let mut ledger = DedupLedger::new();

    while run.load(Ordering::Relaxed) {
        let envelope = match receiver.try_receive() {
            Some(e) => e,
            None => continue,
        };

        if !filter_envelope(car_id, &envelope) {
            continue;
        }

        if !ledger.accept(&envelope) {
            trace!(
                "Dropped duplicate {} from {} (stamp {})",
                envelope.message.tag(),
                envelope.from,
                envelope.sent_at
            );
            continue;
        }

        trace!("Queued {} from {}", envelope.message.tag(), envelope.from);

        if tx.send(envelope.message).is_err() {
            debug!("Mailbox of {} closed, stopping reception", car_id);
            break;
        }
    }
}
