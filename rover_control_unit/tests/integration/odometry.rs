//! Odometry properties and the drive-to-pose path through the simulation.

use super::Rig;
use approx::assert_relative_eq;
use proptest::prelude::*;
use rover_common::control_unit::config::OdometryConfig;
use rover_control_unit::odometry::estimator::{Odometry, Pose};
use std::f64::consts::TAU;

fn odometry_at(pose: Pose) -> Odometry {
    let mut odo = Odometry::new(&OdometryConfig::default());
    odo.set_pose(pose);
    odo
}

fn angle_between(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}

proptest! {
    #[test]
    fn equal_wheel_deltas_keep_heading(theta in 0.0..TAU, ticks in -20_000i32..20_000) {
        let mut odo = odometry_at(Pose::new(0.0, 0.0, theta));
        let before = odo.pose().theta;
        let delta = odo.integrate(ticks, ticks);
        prop_assert_eq!(delta.dtheta, 0.0);
        prop_assert_eq!(odo.pose().theta, before);
    }

    #[test]
    fn inverse_deltas_restore_pose(
        x in -1000.0..1000.0f64,
        y in -1000.0..1000.0f64,
        theta in 0.0..TAU,
        dl in -20_000i32..20_000,
        dr in -20_000i32..20_000,
    ) {
        let start = Pose::new(x, y, theta);
        let mut odo = odometry_at(start);
        odo.integrate(dl, dr);
        odo.integrate(-dl, -dr);
        let end = odo.pose();
        prop_assert!((end.x - start.x).abs() < 1e-6, "x {} vs {}", end.x, start.x);
        prop_assert!((end.y - start.y).abs() < 1e-6, "y {} vs {}", end.y, start.y);
        prop_assert!(angle_between(end.theta, start.theta) < 1e-9);
    }

    #[test]
    fn heading_stays_in_range(deltas in prop::collection::vec((-50_000i32..50_000, -50_000i32..50_000), 1..50)) {
        let mut odo = odometry_at(Pose::default());
        for (dl, dr) in deltas {
            odo.integrate(dl, dr);
            let theta = odo.pose().theta;
            prop_assert!((0.0..TAU).contains(&theta), "theta {theta} out of range");
        }
    }
}

#[test]
fn straight_drive_through_simulation() {
    let mut rig = Rig::rover();
    assert_eq!(rig.send("r"), [rover_control_unit::report::Reply::Ok]);
    assert_eq!(rig.send("d200;0;200;0").len(), 1);
    rig.run(5_000); // 1 s
    rig.send("d0;0;0;0");
    // Let the last odometry period integrate.
    rig.run(100);

    let (left, right) = rig.unit.odometry().tick_counts();
    assert_eq!(left, right);
    assert!(left > 1_500, "left wheel moved {left} ticks");

    let ppmm = rig.unit.odometry().pulses_per_mm();
    let pose = rig.unit.pose();
    assert_relative_eq!(pose.x, 255.0 + f64::from(left) / ppmm, epsilon = 1e-6);
    assert_eq!(pose.y, 255.0);
    assert_eq!(pose.theta, 0.0);
}

#[test]
fn spin_in_place_changes_heading_only() {
    let mut rig = Rig::rover();
    rig.send("d100;0;0;100");
    rig.run(2_500);
    rig.send("d0;0;0;0");
    rig.run(100);

    let (left, right) = rig.unit.odometry().tick_counts();
    assert_eq!(left, -right);
    let pose = rig.unit.pose();
    assert_relative_eq!(pose.x, 255.0, epsilon = 1e-9);
    assert_relative_eq!(pose.y, 255.0, epsilon = 1e-9);
    let expected = 2.0 * f64::from(left) / rig.unit.odometry().pulses_per_mm() / 127.0;
    assert!(angle_between(pose.theta, expected) < 1e-9);
}

#[test]
fn reset_discards_pending_ticks() {
    let mut rig = Rig::rover();
    let (left, right) = rig.unit.encoder_sinks();
    for i in 0..1200 {
        let a = i % 2 == 0;
        left.record_edge(a, !a);
        right.record_edge(a, !a);
    }
    let before = rig.unit.pose();
    rig.send("r");
    rig.run(100);
    assert_eq!(rig.unit.pose(), before);
}
