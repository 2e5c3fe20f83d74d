//! Crossing handshake between the cars of both trains

mod common;

use comms_if::{msg::Role, net::LoopbackBus};
use train_lib::{agent::RoleState, crossing::CrossingState};

use common::{run_until, TestCar};

fn other_train_in_crossing(c: &TestCar) -> bool {
    match c.car.agent().role_state() {
        RoleState::Leader(l) => l.other_train_in_crossing,
        _ => false,
    }
}

#[test]
fn test_train_goes_through_crossing() {
    let bus = LoopbackBus::new();
    let mut t = 0.0;
    let mut cars = vec![
        TestCar::new(&bus, 1, Role::Leader, 4950.0, 0.5),
        // Far behind its leader, the queue drives at its highest follow speed
        TestCar::new(&bus, 1, Role::Queue, 4450.0, 2.0),
        TestCar::new(&bus, 2, Role::Leader, 1500.0, 0.5),
    ];

    // The leader passes the mark, the whole train takes part in the crossing
    let entered = run_until(&mut cars, &mut t, 60, |cars| {
        cars[0].car.agent().crossing_state() == CrossingState::InCrossing
            && cars[1].car.agent().crossing_state() == CrossingState::InCrossing
    });
    assert!(entered);
    assert_eq!(cars[0].car.agent().motion_ctrl().mark_count(), 1);

    // The other leader was warned, but away from the crossing it has nothing to negotiate
    let warned = run_until(&mut cars, &mut t, 20, |cars| other_train_in_crossing(&cars[2]));
    assert!(warned);
    assert_eq!(cars[2].car.agent().crossing_state(), CrossingState::Clear);
    assert_eq!(cars[2].car.agent().speed_to_reach(), 40.0);

    // The queue passes the mark
    let exiting = run_until(&mut cars, &mut t, 100, |cars| {
        cars[1].car.agent().crossing_state() == CrossingState::Exiting
    });
    assert!(exiting);

    // A few revolutions later it has left, and the leader releases the train
    let cleared = run_until(&mut cars, &mut t, 400, |cars| {
        cars[..2]
            .iter()
            .all(|c| c.car.agent().crossing_state() == CrossingState::Clear)
    });
    assert!(cleared);
    assert_eq!(cars[0].car.agent().speed_to_reach(), 40.0);
}

#[test]
fn test_leaders_negotiate() {
    let bus = LoopbackBus::new();
    let mut t = 0.0;
    let mut cars = vec![
        TestCar::new(&bus, 1, Role::Leader, 4900.0, 0.5),
        TestCar::new(&bus, 2, Role::Leader, 4980.0, 0.5),
    ];

    // Train 2 reaches the crossing first, train 1 just after
    let mut profile_seen = false;
    let mut slowed_down = false;

    run_until(&mut cars, &mut t, 100, |cars| {
        profile_seen |= cars[0].car.agent().motion_ctrl().profile_active();
        slowed_down |= cars[1].car.agent().speed_to_reach() == 20.0;
        profile_seen && slowed_down
    });

    assert!(slowed_down, "The second leader did not slow down");
    assert!(profile_seen, "No speed profile was installed on the first leader");

    assert!(other_train_in_crossing(&cars[0]));
    assert!(other_train_in_crossing(&cars[1]));
}
