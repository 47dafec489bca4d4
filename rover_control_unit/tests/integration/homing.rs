//! Homing against the simulated limit switches.

use super::Rig;
use rover_common::control_unit::config::FirmwareConfig;
use rover_common::hal::config::SimAxisConfig;
use rover_control_unit::command::homing::HomingPhase;
use rover_control_unit::report::Reply;

const HOMING_TICKS: usize = 50_000;

#[test]
fn home_all_zeroes_at_retract_position() {
    let mut rig = Rig::rover();
    assert!(rig.send("h").is_empty());
    assert!(rig.unit.is_homing());

    // Pose reports are off in the rover config; the first reply is the result.
    let replies = rig.run_until(HOMING_TICKS, |_| true).unwrap();
    assert_eq!(replies, [Reply::Ok]);
    assert!(!rig.unit.is_homing());

    let config = FirmwareConfig::default();
    for (axis, cfg) in config.axes.iter().enumerate() {
        let driver = &rig.unit.axes()[axis];
        assert_eq!(driver.current_position(), 0);
        assert_eq!(driver.max_speed(), cfg.max_speed);
        assert_eq!(driver.acceleration(), cfg.acceleration);
        // Switch at -400, retract 50 away from it.
        assert_eq!(rig.sim_position(axis), -350);
    }
}

#[test]
fn moves_after_homing_are_relative_to_new_origin() {
    let mut rig = Rig::rover();
    rig.send("h");
    rig.run_until(HOMING_TICKS, |r| *r == Reply::Ok).unwrap();

    assert!(rig.send("a100").is_empty());
    let replies = rig.run_until(HOMING_TICKS, |r| *r == Reply::Ok).unwrap();
    assert_eq!(replies, [Reply::Ok]);
    assert_eq!(rig.position(0), 100);
    assert_eq!(rig.sim_position(0), -250);
    assert_eq!(rig.sim_position(1), -350);
}

#[test]
fn named_axis_homes_while_other_moves() {
    let mut rig = Rig::rover();
    assert!(rig.send("hb").is_empty());
    assert!(rig.send("a30").is_empty());

    // The short move finishes first.
    rig.run_until(HOMING_TICKS, |r| *r == Reply::Ok).unwrap();
    assert_eq!(rig.position(0), 30);
    assert!(rig.unit.is_homing());

    rig.run_until(HOMING_TICKS, |r| *r == Reply::Ok).unwrap();
    assert!(!rig.unit.is_homing());
    assert_eq!(rig.position(1), 0);
    assert_eq!(rig.sim_position(1), -350);
    assert_eq!(rig.sim_position(0), 30);
}

#[test]
fn homed_axes_reject_moves_until_done() {
    let mut rig = Rig::rover();
    rig.send("h");
    rig.run(10);
    assert_eq!(rig.send("a10"), [Reply::Busy]);
    assert_eq!(rig.send("ga1;b1"), [Reply::Busy]);
    assert_eq!(rig.send("h"), [Reply::Busy]);
    let session = rig.unit.homing().unwrap();
    assert_eq!(session.phase(0), Some(HomingPhase::Seeking));
}

#[test]
fn unreachable_switch_times_out() {
    let mut config = FirmwareConfig::default();
    config.homing.timeout_ms = Some(100);
    config.hal.simulation.axes = vec![
        SimAxisConfig {
            switch_position: -1_000_000,
        };
        2
    ];
    let mut rig = Rig::new(&config);
    rig.send("ha");

    let replies = rig.run_until(HOMING_TICKS, |r| *r == Reply::HomingFailed).unwrap();
    assert_eq!(replies, [Reply::HomingFailed]);
    assert!(!rig.unit.is_homing());
    let axis = &rig.unit.axes()[0];
    assert!(!axis.is_running());
    assert_eq!(axis.max_speed(), config.axes[0].max_speed);

    // The axis is usable again.
    let stopped_at = rig.position(0);
    assert!(rig.send(&format!("a{}", stopped_at + 10)).is_empty());
    rig.run_until(HOMING_TICKS, |r| *r == Reply::Ok).unwrap();
    assert_eq!(rig.position(0), stopped_at + 10);
}

#[test]
fn no_timeout_keeps_seeking() {
    let mut config = FirmwareConfig::default();
    config.homing.timeout_ms = None;
    config.hal.simulation.axes = vec![
        SimAxisConfig {
            switch_position: -1_000_000,
        };
        2
    ];
    let mut rig = Rig::new(&config);
    rig.send("hb");
    assert!(rig.run(25_000).is_empty());
    assert_eq!(rig.unit.homing().unwrap().phase(1), Some(HomingPhase::Seeking));
    assert!(rig.position(1) < -1_000);
}
