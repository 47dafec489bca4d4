//! # Rover Control Unit
//!
//! Loads the firmware configuration, creates the HAL driver, opens the
//! serial link and runs the control cycle until interrupted.
//!
//! Protocol replies go to stdout (or the serial port given by `--port`);
//! logs always go to stderr.

use clap::Parser;
use rover_common::config::LogLevel;
use rover_common::control_unit::config::FirmwareConfig;
use rover_control_unit::config::resolve_config;
use rover_control_unit::cycle::{CycleRunner, rt_setup};
use rover_control_unit::link::SerialLink;
use rover_hal::DriverRegistry;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::Ordering;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Rover Control Unit: odometry and stepper motion firmware
#[derive(Parser, Debug)]
#[command(name = "rover_control_unit")]
#[command(version)]
#[command(about = "Odometry, stepper motion and servo control over a serial line")]
struct Args {
    /// Firmware configuration TOML. Falls back to /etc/rover/firmware.toml,
    /// then to the built-in rover configuration.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// HAL driver name, overrides `[hal] driver`.
    #[arg(long)]
    driver: Option<String>,

    /// Print the built-in HAL drivers and exit.
    #[arg(long)]
    list_drivers: bool,

    /// Serial device for the host protocol (default: stdin/stdout).
    #[arg(long, value_name = "PATH")]
    port: Option<PathBuf>,

    /// Stop after this many cycles.
    #[arg(long)]
    cycles: Option<u64>,

    /// CPU core to pin the control thread to.
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority.
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    if args.list_drivers {
        for (name, summary) in DriverRegistry::with_builtin_drivers().drivers() {
            println!("{name:<12} {summary}");
        }
        return;
    }

    let config = resolve_config(args.config.as_deref());
    let level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);

    info!("Rover Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|config| run(&args, &config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Rover Control Unit shutdown complete");
}

fn run(args: &Args, config: &FirmwareConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        service = %config.shared.service_name,
        cycle_time_us = config.cycle.cycle_time_us,
        axes = config.axes.len(),
        servos = config.servos.len(),
        "config OK"
    );

    let registry = DriverRegistry::with_builtin_drivers();
    let driver_name = args.driver.as_deref().unwrap_or(&config.hal.driver);
    let driver = registry.create_driver(driver_name)?;

    let link = match &args.port {
        Some(port) => SerialLink::open(port)?,
        None => SerialLink::stdio()?,
    };

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(cpu_core = args.cpu_core, priority = args.rt_priority, "RT setup complete");

    let mut runner = CycleRunner::new(config, driver, link)?;
    if let Some(cycles) = args.cycles {
        runner = runner.with_max_cycles(cycles);
    }

    let running = runner.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    runner.run()?;
    Ok(())
}

fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        LogLevel::Debug.as_directive()
    } else {
        level.as_directive()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}
