//! # Car
//!
//! Binds a [`RoleAgent`] to the car's hardware and the network. One call to [`Car::cycle`] samples
//! the sensors, hands the received messages and the samples to the agent, sends what the agent
//! queued and drives the motors with its demands.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    msg::CarId,
    net::{Datagram, Transport, TransportError},
};
use log::{info, trace, warn};

use crate::{
    agent::{AgentError, RoleAgent, RoleState, SensorFrame},
    hal::{HalError, Hardware},
    mailbox::Mailbox,
    motion_ctrl::OutputData,
};
use util::module::MakeSafe;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct Car<D: Datagram + 'static> {
    agent: RoleAgent,
    hw: Hardware,
    transport: Transport<D>,
    mailbox: Mailbox,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    Running,

    /// The car was halted, it will not move again
    Halted,
}

#[derive(Debug, thiserror::Error)]
pub enum CarError {
    #[error("Hardware error: {0}")]
    Hal(#[from] HalError),

    #[error("Network error: {0}")]
    Transport(#[from] TransportError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("The transport sends as {0} but the agent is {1}")]
    IdMismatch(CarId, CarId),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<D: Datagram + 'static> Car<D> {
    /// Create the car and start receiving its messages.
    pub fn new(agent: RoleAgent, hw: Hardware, transport: Transport<D>) -> Result<Self, CarError> {
        if transport.own_id() != agent.id() {
            return Err(CarError::IdMismatch(transport.own_id(), agent.id()));
        }

        let mailbox = Mailbox::spawn(transport.receiver()?, agent.id());

        Ok(Self {
            agent,
            hw,
            transport,
            mailbox,
        })
    }

    /// Run one control cycle at elapsed time `now_s`.
    pub fn cycle(&mut self, now_s: f64) -> Result<CycleStatus, CarError> {
        let frame = self.sample(now_s)?;
        let inbox = self.mailbox.drain();

        let output = match self.agent.step(inbox, &frame) {
            Ok(o) => o,
            Err(AgentError::Halted) => {
                self.flush_outbox();
                self.halt()?;
                return Ok(CycleStatus::Halted);
            }
            Err(e) => return Err(e.into()),
        };

        self.flush_outbox();
        self.drive(&output)?;

        self.hw.display.show_lines(&self.agent.display_lines())?;

        Ok(CycleStatus::Running)
    }

    pub fn agent(&self) -> &RoleAgent {
        &self.agent
    }

    pub fn id(&self) -> CarId {
        self.agent.id()
    }

    /// Sample every sensor the car's role needs.
    fn sample(&mut self, now_s: f64) -> Result<SensorFrame, HalError> {
        let distance_m = match self.agent.role_state() {
            RoleState::Leader(_) => None,
            _ => Some(self.hw.distance_sensor.sample_distance()?),
        };

        Ok(SensorFrame {
            now_s,
            rgb: self.hw.color_sensor.sample_rgb()?,
            distance_m,
            tacho: self.hw.right_motor.tacho_count()?,
            odometer: self.hw.left_motor.tacho_count()?,
            max_speed_deg_s: self.hw.left_motor.max_speed(),
        })
    }

    fn drive(&mut self, output: &OutputData) -> Result<(), HalError> {
        if output.reset_tacho {
            self.hw.right_motor.reset_tacho_count()?;
        }

        self.hw.left_motor.set_speed_percent(output.left_speed_percent)?;
        self.hw.right_motor.set_speed_percent(output.right_speed_percent)?;

        if output.speed_percent > 0.0 {
            self.hw.left_motor.forward()?;
            self.hw.right_motor.forward()?;
        } else {
            self.hw.stop_motors()?;
        }

        trace!(
            "Motors L {:.1} % R {:.1} %",
            output.left_speed_percent,
            output.right_speed_percent
        );

        Ok(())
    }

    /// Send everything the agent queued. Failures are logged, the messages are not retried.
    fn flush_outbox(&mut self) {
        for (to, message) in self.agent.take_outbox() {
            let tag = message.tag();

            if let Err(e) = self.transport.send(to, message) {
                warn!("Could not send {} to {}: {}", tag, to, e);
            }
        }
    }

    fn halt(&mut self) -> Result<(), HalError> {
        info!("{} halted", self.agent.id());

        self.hw.stop_motors()?;
        self.hw.display.show_lines(&self.agent.display_lines())
    }
}

impl<D: Datagram + 'static> MakeSafe for Car<D> {
    /// Stop the motors and drop any speed profile.
    fn make_safe(&mut self) {
        self.agent.make_safe();

        if let Err(e) = self.hw.stop_motors() {
            warn!("Could not stop the motors while making safe: {}", e);
        }
    }
}
