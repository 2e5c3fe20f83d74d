//! Helpers shared by the integration tests

#![allow(dead_code)]

use comms_if::{
    msg::{CarId, Role},
    net::{LoopbackBus, LoopbackPort, Transport},
};
use std::{thread, time::Duration};
use train_lib::{
    agent::RoleAgent,
    car::{Car, CycleStatus},
    crossing::CrossingParams,
    hal::sim::{SimCar, SimTrack},
    motion_ctrl::{FollowPolicy, MotionCtrl, Params},
};

/// Simulated time of one cycle, in seconds.
pub const DT: f64 = 0.05;

/// A car on the loopback network and its simulated hardware.
pub struct TestCar {
    pub car: Car<LoopbackPort>,
    pub sim: SimCar,
    pub last_status: CycleStatus,
}

impl TestCar {
    pub fn new(
        bus: &LoopbackBus,
        train: u8,
        role: Role,
        start_ticks: f64,
        distance_m: f64,
    ) -> Self {
        let id = CarId::new(train, role);

        let agent = RoleAgent::new(
            id,
            MotionCtrl::new(Params::default(), FollowPolicy::ToAPoint),
            CrossingParams::default(),
            0.5,
        )
        .unwrap();

        let sim = SimCar::new(SimTrack::default(), start_ticks, distance_m);
        let transport = Transport::new(bus.attach(Duration::from_millis(5)), id, 2).unwrap();
        let car = Car::new(agent, sim.hardware(), transport).unwrap();

        Self {
            car,
            sim,
            last_status: CycleStatus::Running,
        }
    }
}

/// Cycle every car until `done` holds, at most `max_cycles` times.
///
/// Returns true if `done` held. `t` is the simulated time, advanced by [`DT`] every cycle.
pub fn run_until<F>(cars: &mut [TestCar], t: &mut f64, max_cycles: usize, mut done: F) -> bool
where
    F: FnMut(&[TestCar]) -> bool,
{
    for _ in 0..max_cycles {
        *t += DT;

        for c in cars.iter_mut() {
            c.sim.step(DT);
            c.last_status = c.car.cycle(*t).expect("Cycle failed");
        }

        if done(cars) {
            return true;
        }

        // Let the mailbox threads catch up with what was just sent
        thread::sleep(Duration::from_millis(5));
    }

    false
}
