//! Line protocol behaviour end to end.

use super::Rig;
use rover_common::control_unit::config::FirmwareConfig;
use rover_control_unit::config::load_config_from_str;
use rover_control_unit::report::Reply;

#[test]
fn malformed_lines_fail_without_side_effects() {
    let mut rig = Rig::rover();
    let pose = rig.unit.pose();
    for line in [
        "", "q", "s1;2", "s1;2;3;4", "sx;0;0", "a", "a1;2", "k999", "k-5", "d1;2;3;4;5",
        "d300;0;0;0", "g", "gk10", "hz", "r0", "n1", "A10",
    ] {
        assert_eq!(rig.send(line), [Reply::Fail], "line {line:?}");
    }
    rig.run(10);
    assert_eq!(rig.unit.pose(), pose);
    assert_eq!(rig.unit.moves().active_count(), 0);
    assert!(!rig.unit.is_homing());
    assert!(rig.unit.drive().is_stopped());
}

#[test]
fn pose_report_after_set_pose() {
    let mut rig = Rig::rover();
    assert_eq!(rig.send("s100;200;45"), [Reply::Ok]);
    let replies = rig.send("p");
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].to_string(), "p100;200;45.00");

    assert_eq!(rig.send("s-10.4;0.6;-90"), [Reply::Ok]);
    assert_eq!(rig.send("p\r")[0].to_string(), "p-10;1;270.00");
}

#[test]
fn initial_pose_report() {
    let mut rig = Rig::rover();
    assert_eq!(rig.send("p")[0].to_string(), "p255;255;0.00");
}

#[test]
fn servo_command_reaches_hal() {
    let mut rig = Rig::rover();
    assert_eq!(rig.send("y135"), [Reply::Ok]);
    rig.run(1);
    let servo = rig.hal.servo(6).unwrap();
    assert!(servo.attached);
    assert_eq!(servo.angle, 135);
}

#[test]
fn custom_letter_table() {
    let config = load_config_from_str(
        r#"
        [[axes]]
        name = "lift"
        letter = "c"
        max_speed = 1500.0
        acceleration = 3000.0

        [[servos]]
        name = "claw"
        letter = "a"
        home_angle = 30
        "#,
    )
    .unwrap();
    let mut rig = Rig::new(&config);
    assert!(rig.send("c50").is_empty());
    assert_eq!(rig.send("a90"), [Reply::Ok]);
    // 'b' is not bound in this table.
    assert_eq!(rig.send("b10"), [Reply::Fail]);

    rig.run_until(50_000, |r| *r == Reply::Ok).unwrap();
    assert_eq!(rig.position(0), 50);
    assert_eq!(rig.hal.servo(0).unwrap().angle, 90);
}

#[test]
fn periodic_reports_follow_interval() {
    let mut config = FirmwareConfig::default();
    config.cycle.report_interval_ms = 10;
    let mut rig = Rig::new(&config);
    // Reports at 0.2 ms, then every 10 ms up to 90 ms.
    let reports = rig
        .run(499)
        .into_iter()
        .filter(|r| matches!(r, Reply::Pose(_)))
        .count();
    assert_eq!(reports, 10);
}
