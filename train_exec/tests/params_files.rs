//! The parameter files shipped with the software must match the parameter structures

use std::{fs::read_to_string, path::PathBuf};
use train_lib::{
    crossing::CrossingParams,
    motion_ctrl::{ColorClass, FollowPolicy, Params},
    params::TrainExecParams,
};

fn read(file: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("params")
        .join(file);

    read_to_string(&path).unwrap_or_else(|e| panic!("Cannot read {:?}: {}", path, e))
}

#[test]
fn test_train_exec_params() {
    let p: TrainExecParams = util::params::parse(&read("train_exec.toml")).unwrap();

    assert_eq!(p.follow_policy, FollowPolicy::ToAPoint);
    assert_eq!(p.net.port, 5000);
    assert_eq!(p.net.redundancy, 2);
    assert!(p.cycle_period_s > 0.0);
}

#[test]
fn test_motion_ctrl_params() {
    let p: Params = util::params::parse(&read("motion_ctrl.toml")).unwrap();

    assert_eq!(p.mark_colors, vec![ColorClass::Orange, ColorClass::Blue]);
    assert_eq!(p.exit_window_spins, [6.0, 7.0]);
}

#[test]
fn test_crossing_params() {
    let p: CrossingParams = util::params::parse(&read("crossing.toml")).unwrap();
    let d = CrossingParams::default();

    assert_eq!(p.mark_to_crossing_ticks, d.mark_to_crossing_ticks);
    assert_eq!(p.profile_valid_for_ticks, d.profile_valid_for_ticks);
    assert_eq!(p.entry_margin_s, d.entry_margin_s);
}
