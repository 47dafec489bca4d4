//! Multi-axis moves and step generation.

use super::Rig;
use proptest::prelude::*;
use rover_control_unit::motion::{AxisDriver, AxisPoll};
use rover_control_unit::report::Reply;
use std::time::Duration;

const MOVE_TICKS: usize = 100_000;

#[test]
fn group_move_reports_exactly_once() {
    let mut rig = Rig::rover();
    assert!(rig.send("ga300;b-200").is_empty());

    let replies = rig.run_until(MOVE_TICKS, |r| *r == Reply::Ok).unwrap();
    assert_eq!(replies, [Reply::Ok]);
    assert_eq!(rig.position(0), 300);
    assert_eq!(rig.position(1), -200);
    assert_eq!(rig.sim_position(0), 300);
    assert_eq!(rig.sim_position(1), -200);

    assert!(rig.run(5_000).is_empty());
    assert_eq!(rig.unit.moves().completed(), 1);
}

#[test]
fn completion_waits_for_slowest_axis() {
    let mut rig = Rig::rover();
    rig.send("ga10;b600");
    let mut a_done_first = false;
    for _ in 0..MOVE_TICKS {
        let replies = rig.tick();
        if rig.unit.axes()[0].is_settled() && !rig.unit.axes()[1].is_settled() {
            a_done_first = true;
            assert!(replies.is_empty());
        }
        if !replies.is_empty() {
            assert_eq!(replies, [Reply::Ok]);
            break;
        }
    }
    assert!(a_done_first);
    assert_eq!(rig.position(1), 600);
}

#[test]
fn polled_move_never_overshoots() {
    let mut rig = Rig::rover();
    rig.send("a500");
    let mut peak = 0;
    while rig.unit.moves().active_count() > 0 {
        rig.tick();
        peak = peak.max(rig.position(0));
    }
    assert_eq!(peak, 500);
    assert_eq!(rig.position(0), 500);
}

#[test]
fn axis_in_unfinished_move_is_busy() {
    let mut rig = Rig::rover();
    rig.send("a400");
    rig.run(10);
    assert_eq!(rig.send("a10"), [Reply::Busy]);
    assert_eq!(rig.send("ga10;b10"), [Reply::Busy]);
    assert_eq!(rig.unit.axes()[0].target_position(), 400);

    rig.run_until(MOVE_TICKS, |r| *r == Reply::Ok).unwrap();
    assert!(rig.send("a10").is_empty());
    rig.run_until(MOVE_TICKS, |r| *r == Reply::Ok).unwrap();
    assert_eq!(rig.position(0), 10);
}

#[test]
fn move_to_current_position_completes_next_tick() {
    let mut rig = Rig::rover();
    assert!(rig.send("ga0;b0").is_empty());
    assert_eq!(rig.tick(), [Reply::Ok]);
}

#[test]
fn unknown_axis_in_group_fails() {
    let mut rig = Rig::rover();
    assert_eq!(rig.send("ga10;k10"), [Reply::Fail]);
    assert_eq!(rig.send("ga10;a20"), [Reply::Fail]);
    assert_eq!(rig.unit.moves().active_count(), 0);
}

proptest! {
    #[test]
    fn ungated_steps_land_on_target(start in -2_000i32..2_000, target in -2_000i32..2_000) {
        let mut axis = AxisDriver::new(1000.0, 1000.0, Duration::from_micros(20));
        axis.set_current_position(start);
        axis.set_target(target);

        let expected = (i64::from(target) - i64::from(start)).abs();
        let mut steps = 0i64;
        let mut previous_gap = axis.distance_to_go().abs();
        while axis.step() == AxisPoll::Stepped {
            steps += 1;
            let gap = axis.distance_to_go().abs();
            prop_assert_eq!(gap, previous_gap - 1);
            previous_gap = gap;
        }
        prop_assert_eq!(steps, expected);
        prop_assert_eq!(axis.current_position(), target);
        prop_assert_eq!(axis.step(), AxisPoll::Idle);
        prop_assert_eq!(axis.current_position(), target);
        prop_assert_eq!(axis.speed(), 0.0);
    }
}
