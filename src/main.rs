//! Serial Monitor
//!
//! Opens a serial port, streams whatever the attached board prints to the
//! console for a fixed window (10 seconds by default), then closes the port.
//!
//! # Usage
//!
//! ```bash
//! # Watch an ESP32 dev kit on the default CP210x port for 10 seconds
//! serial-monitor
//!
//! # Different port, board profile and window
//! serial-monitor -p /dev/ttyUSB0 -d stm32 --duration 30
//!
//! # Settings from a file, capture the stream to disk
//! serial-monitor -c monitor.toml -l boot.log
//!
//! # List available serial ports / built-in device profiles
//! serial-monitor list
//! serial-monitor devices
//! ```
//!
//! Any failure prints `Error: <message>` and exits with status 1.

mod config;
mod decode;
mod devices;
mod error;
mod serial;
mod signal;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

use config::ConfigLayer;
use decode::InvalidBytes;
use devices::{get_profile, profile_names};
use serial::Outcome;

/// Exit status after Ctrl+C (128 + SIGINT)
const EXIT_INTERRUPTED: u8 = 130;

/// Serial Monitor
///
/// Stream serial console output for a bounded time window
#[derive(Parser)]
#[command(name = "serial-monitor")]
#[command(author = "Prasanna Gautam")]
#[command(version = "0.1.0")]
#[command(about = "Stream serial console output for a bounded time window")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    monitor: MonitorArgs,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List available serial ports
    List,

    /// List built-in device profiles
    Devices,
}

/// Monitor settings; each one overrides the config file
#[derive(Args, Debug, Default)]
struct MonitorArgs {
    /// Serial port path [default: /dev/cu.SLAB_USBtoUART]
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate [default: from device profile, 115200]
    #[arg(short, long)]
    baud: Option<u32>,

    /// Device profile (esp32, stm32, rpi4, generic) [default: esp32]
    #[arg(short, long)]
    device: Option<String>,

    /// Monitoring window in seconds [default: 10]
    #[arg(long, value_name = "SECS")]
    duration: Option<u64>,

    /// Read timeout in milliseconds [default: 1000]
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,

    /// Idle time between polls in milliseconds [default: 100]
    #[arg(long, value_name = "MS")]
    poll_interval: Option<u64>,

    /// Handling of bytes that are not valid UTF-8 [default: replace]
    #[arg(long, value_enum)]
    invalid: Option<InvalidBytes>,

    /// Also write the decoded stream to this file
    #[arg(short, long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// TOML file with monitor settings
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl MonitorArgs {
    fn to_layer(&self) -> ConfigLayer {
        ConfigLayer {
            port: self.port.clone(),
            baud: self.baud,
            device: self.device.clone(),
            duration_secs: self.duration,
            timeout_ms: self.timeout,
            poll_interval_ms: self.poll_interval,
            invalid: self.invalid,
            log_file: self.log.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            println!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Some(Commands::List) => {
            serial::port::print_ports()?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Devices) => {
            print_devices();
            Ok(ExitCode::SUCCESS)
        }
        None => handle_monitor(&cli.monitor),
    }
}

fn handle_monitor(args: &MonitorArgs) -> Result<ExitCode> {
    let file_layer = match args.config {
        Some(ref path) => ConfigLayer::load(path)?,
        None => ConfigLayer::default(),
    };

    let config = config::resolve(args.to_layer(), file_layer)?;
    log::debug!("monitor config: {:?}", config);

    signal::install_interrupt_handler()?;

    match serial::monitor::run_monitor(config, &signal::STOP_REQUESTED)? {
        Outcome::Completed => Ok(ExitCode::SUCCESS),
        Outcome::Interrupted => Ok(ExitCode::from(EXIT_INTERRUPTED)),
    }
}

fn print_devices() {
    println!("{}", "=".repeat(60));
    println!("{}", "Supported Device Profiles".cyan().bold());
    println!("{}", "=".repeat(60));

    for name in profile_names() {
        if let Some(profile) = get_profile(name) {
            println!("\n  {}: {}", name.white().bold(), profile.description);
            println!("    Display name: {}", profile.name);
            println!("    Default baud: {}", profile.baud_rate);
        }
    }

    println!("\n{}", "=".repeat(60));
    println!(
        "Use {} to monitor with a profile",
        "serial-monitor -d <device>".cyan()
    );
}
