//! Cycle runner with the serial link and the simulation driver.

use rover_common::consts::COMMANDS_PER_CYCLE;
use rover_common::control_unit::config::FirmwareConfig;
use rover_common::hal::driver::HalError;
use rover_control_unit::config::resolve_config;
use rover_control_unit::cycle::CycleRunner;
use rover_control_unit::link::SerialLink;
use rover_hal::DriverRegistry;
use std::io::{self, Write};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

#[derive(Clone, Default)]
struct Output(Arc<Mutex<Vec<u8>>>);

impl Output {
    fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect()
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn runner(config: &FirmwareConfig) -> (Sender<String>, Output, CycleRunner) {
    let driver = DriverRegistry::with_builtin_drivers()
        .create_driver(&config.hal.driver)
        .unwrap();
    let output = Output::default();
    let (tx, link) = SerialLink::with_sender(output.clone());
    let runner = CycleRunner::new(config, driver, link).unwrap();
    (tx, output, runner)
}

fn step_until(runner: &mut CycleRunner, output: &Output, line: &str, max: usize) -> bool {
    for _ in 0..max {
        runner.step();
        if output.lines().iter().any(|l| l == line) {
            return true;
        }
    }
    false
}

#[test]
fn query_move_and_stop_over_the_link() {
    let (tx, output, mut runner) = runner(&FirmwareConfig::default());

    tx.send("p".to_string()).unwrap();
    runner.step();
    assert_eq!(output.lines(), ["p255;255;0.00"]);

    tx.send("b25".to_string()).unwrap();
    assert!(step_until(&mut runner, &output, "ok", 50_000));
    assert_eq!(runner.unit().axes()[1].current_position(), 25);

    tx.send("e".to_string()).unwrap();
    tx.send("b0".to_string()).unwrap();
    runner.step();
    assert_eq!(output.lines(), ["p255;255;0.00", "ok", "stopped", "disabled"]);
}

#[test]
fn commands_in_one_cycle_apply_in_order() {
    let (tx, output, mut runner) = runner(&FirmwareConfig::default());
    for line in ["s0;0;90", "p", "r", "zz"] {
        tx.send(line.to_string()).unwrap();
    }
    runner.step();
    assert_eq!(output.lines(), ["ok", "p0;0;90.00", "ok", "f"]);
}

#[test]
fn drive_moves_pose_through_encoders() {
    let (tx, output, mut runner) = runner(&FirmwareConfig::default());
    tx.send("d255;0;255;0".to_string()).unwrap();
    for _ in 0..2_500 {
        runner.step();
    }
    tx.send("d0;0;0;0".to_string()).unwrap();
    for _ in 0..100 {
        runner.step();
    }
    let pose = runner.unit().pose();
    assert!(pose.x > 255.0 + 100.0, "x = {}", pose.x);
    assert_eq!(pose.y, 255.0);
    assert_eq!(output.lines(), ["ok", "ok"]);

    let diag = runner.driver().diagnostics().unwrap();
    assert!(diag.encoder_edges.0 > 900);
    assert_eq!(diag.encoder_edges.0, diag.encoder_edges.1);
}

#[test]
fn runner_from_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [shared]
        service_name = "rover-test"

        [cycle]
        cycle_time_us = 500
        report_interval_ms = 5

        [[axes]]
        name = "lift"
        letter = "a"
        max_speed = 500.0
        acceleration = 1000.0
        "#
    )
    .unwrap();
    let config = resolve_config(Some(file.path())).unwrap();
    let (_tx, output, mut runner) = runner(&config);
    assert_eq!(runner.driver().name(), "simulation");

    // Cycles at 0.5 ms steps; reports at 0.5, 5 and 10 ms.
    for _ in 0..20 {
        runner.step();
    }
    let reports = output.lines().iter().filter(|l| l.starts_with('p')).count();
    assert_eq!(reports, 3);
}

#[test]
fn unknown_driver_is_rejected() {
    let result = DriverRegistry::with_builtin_drivers().create_driver("stepper-hat");
    assert!(matches!(result, Err(HalError::DriverNotFound(name)) if name == "stepper-hat"));
}

fn count(output: &Output, line: &str) -> usize {
    output.lines().iter().filter(|l| *l == line).count()
}

#[test]
fn completion_written_when_queries_fill_the_cycle() {
    let (tx, output, mut runner) = runner(&FirmwareConfig::default());
    tx.send("a0".to_string()).unwrap();
    for _ in 0..16 {
        tx.send("p".to_string()).unwrap();
    }
    for _ in 0..50 {
        runner.step();
    }
    assert_eq!(runner.unit().moves().completed(), 1);
    assert_eq!(count(&output, "ok"), 1);
    assert_eq!(count(&output, "p255;255;0.00"), 16);
}

#[test]
fn backlog_of_queries_never_hides_a_completion() {
    let (tx, output, mut runner) = runner(&FirmwareConfig::default());
    tx.send("b20".to_string()).unwrap();
    runner.step();

    let mut sent = 0;
    for _ in 0..50_000 {
        if runner.unit().moves().active_count() == 0 {
            break;
        }
        for _ in 0..COMMANDS_PER_CYCLE + 6 {
            tx.send("p".to_string()).unwrap();
            sent += 1;
        }
        runner.step();
    }
    assert_eq!(runner.unit().moves().active_count(), 0);

    // Drain what is still queued.
    for _ in 0..sent / COMMANDS_PER_CYCLE + 2 {
        runner.step();
    }
    let poses = output.lines().iter().filter(|l| l.starts_with('p')).count();
    assert_eq!(poses, sent);
    assert_eq!(count(&output, "ok"), 1);
}
