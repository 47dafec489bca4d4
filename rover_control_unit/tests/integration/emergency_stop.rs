//! Emergency stop through the full tick path.

use super::Rig;
use rover_common::hal::driver::EncoderSide;
use rover_control_unit::report::Reply;

#[test]
fn stop_mid_move_freezes_everything() {
    let mut rig = Rig::rover();
    rig.send("ga1000;b1000");
    rig.run(500);
    let moved = rig.position(0);
    assert!(moved > 0 && moved < 1000);

    assert_eq!(rig.send("e"), [Reply::Stopped]);
    assert!(rig.unit.is_stopped());
    assert_eq!(rig.unit.moves().active_count(), 0);

    // No completion is ever reported for the cancelled move.
    assert!(rig.run(5_000).is_empty());
    for axis in 0..2 {
        assert!(!rig.unit.axes()[axis].is_enabled());
        assert!(!rig.hal.stepper(axis).unwrap().enabled());
        assert_eq!(rig.sim_position(axis), i64::from(rig.position(axis)));
    }
    assert_eq!(rig.position(0), moved);
    assert!((0..7).all(|i| !rig.hal.servo(i).unwrap().attached));

    assert_eq!(rig.send("a5"), [Reply::Disabled]);
    assert_eq!(rig.send("ga5;b5"), [Reply::Disabled]);
    assert_eq!(rig.unit.axes()[0].target_position(), moved);
}

#[test]
fn stop_during_homing_restores_limits_silently() {
    let mut rig = Rig::rover();
    rig.send("h");
    rig.run(100);
    assert_eq!(rig.send("e"), [Reply::Stopped]);
    assert!(!rig.unit.is_homing());
    // Stopped is the only report; no homing_failed follows.
    assert!(rig.run(1_000).is_empty());
    let axis = &rig.unit.axes()[0];
    assert_eq!(axis.max_speed(), 2000.0);
    assert_eq!(axis.acceleration(), 4000.0);
}

#[test]
fn stop_zeroes_drive() {
    let mut rig = Rig::rover();
    rig.send("d255;0;255;0");
    rig.run(50);
    assert!(!rig.hal.drive().is_stopped());

    rig.send("e");
    rig.run(1);
    assert!(rig.hal.drive().is_stopped());
    let ticks = rig.hal.wheel(EncoderSide::Left).ticks();
    rig.run(1_000);
    assert_eq!(rig.hal.wheel(EncoderSide::Left).ticks(), ticks);
    assert_eq!(rig.send("d10;0;10;0"), [Reply::Disabled]);
}

#[test]
fn enable_restores_operation() {
    let mut rig = Rig::rover();
    rig.send("k120");
    rig.send("e");
    rig.run(1);
    assert!(!rig.hal.servo(0).unwrap().attached);

    assert_eq!(rig.send("n"), [Reply::Ok]);
    assert!(!rig.unit.is_stopped());
    rig.run(1);
    let servo = rig.hal.servo(0).unwrap();
    assert!(servo.attached);
    assert_eq!(servo.angle, 120);

    assert!(rig.send("a20").is_empty());
    rig.run_until(50_000, |r| *r == Reply::Ok).unwrap();
    assert_eq!(rig.position(0), 20);
}

#[test]
fn repeated_stop_is_harmless() {
    let mut rig = Rig::rover();
    assert_eq!(rig.send("e"), [Reply::Stopped]);
    assert_eq!(rig.send("e0"), [Reply::Stopped]);
    assert_eq!(rig.unit.emergency().trigger_count(), 2);
    assert_eq!(rig.send("n"), [Reply::Ok]);
    assert_eq!(rig.send("n"), [Reply::Ok]);
}
