use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};

use baglink_frame::Command as BagCommand;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod doctor;
pub mod monitor;
pub mod send;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a bag and print its event stream.
    Monitor(MonitorArgs),
    /// Send a single actuator command.
    Send(SendArgs),
    /// Serve a scripted bag device on a local endpoint.
    Simulate(SimulateArgs),
    /// Run local environment health checks.
    Doctor(DoctorArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Doctor(args) => doctor::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Endpoint: rfcomm:AA:BB:CC:DD:EE:FF[:channel] or local:/path/to.sock.
    pub endpoint: String,
    /// Exit after printing N events.
    #[arg(long)]
    pub count: Option<usize>,
    /// Reconnect when the link is lost.
    #[arg(long)]
    pub reconnect: bool,
    /// Maximum consecutive failed connections before giving up.
    #[arg(long, default_value = "5")]
    pub attempts: u32,
    /// Delay between reconnection attempts (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub delay: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Endpoint: rfcomm:AA:BB:CC:DD:EE:FF[:channel] or local:/path/to.sock.
    pub endpoint: String,
    /// Actuator command to transmit.
    #[arg(long, short = 'c')]
    pub command: CommandArg,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Socket path to serve the simulated device on.
    pub path: PathBuf,
    /// Identity payload to announce (a malformed value exercises rejection
    /// handling on the monitor side).
    #[arg(long, default_value = "SB000001")]
    pub bag_id: String,
    /// Interval between telemetry frames (e.g. 500ms, 1s).
    #[arg(long, default_value = "500ms")]
    pub interval: String,
    /// Stop after emitting N telemetry frames per connection.
    #[arg(long)]
    pub frames: Option<u64>,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}

/// CLI spelling of the actuator command set.
#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum CommandArg {
    HeatOn,
    HeatOff,
    CoolOn,
    CoolOff,
    LightOn,
    LightOff,
}

impl From<CommandArg> for BagCommand {
    fn from(arg: CommandArg) -> Self {
        match arg {
            CommandArg::HeatOn => BagCommand::HeatOn,
            CommandArg::HeatOff => BagCommand::HeatOff,
            CommandArg::CoolOn => BagCommand::CoolOn,
            CommandArg::CoolOff => BagCommand::CoolOff,
            CommandArg::LightOn => BagCommand::LightOn,
            CommandArg::LightOff => BagCommand::LightOff,
        }
    }
}

/// Parse `500ms` / `5s` style durations.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (value, unit) = trimmed.split_at(split);
    let value: u64 = value
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration '{input}'")))?;
    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" | "" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("invalid duration unit in '{input}' (use ms or s)"),
        )),
    }
}
