//! Command Line Interface
//!
//! Thin front-end over the library: every subcommand maps to one device
//! operation and prints its result.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use dchu::config::{self, Settings};
use dchu::actuator::UNKNOWN_MODE;
use dchu::{Device, FanMode};

#[derive(Parser)]
#[command(name = "dchuctl")]
#[command(version)]
#[command(about = "Read sensors and drive controls of Insyde DCHU embedded controllers")]
#[command(long_about = "Read sensors and drive controls of Insyde DCHU embedded controllers

Talks to the firmware _DSM method through the acpi_call kernel module.

EXAMPLES:
    dchuctl sensors                Show fan speeds, duty cycles and temperatures
    dchuctl sensors --json         Same, as JSON
    dchuctl led set 3              Set keyboard backlight level
    dchuctl fan-mode set silent    Switch fan mode (auto, max, silent, maxq, custom, turbo)
    dchuctl raw status             Raw answer of the LED status function

ENVIRONMENT VARIABLES:
    RUST_LOG=debug         Enable debug logging
    DCHU_CONFIG=<path>     Settings file location

FILES:
    /etc/dchu/config.json  Settings")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file (overrides DCHU_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// ACPI path of the DCHU device (skips sysfs discovery)
    #[arg(long, global = true)]
    pub acpi_path: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read all fan, duty and temperature values
    Sensors {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Hex dump of the raw sensor package
    Buffer,

    /// Keyboard backlight
    #[command(subcommand)]
    Led(LedCommands),

    /// Fan mode
    #[command(subcommand)]
    FanMode(FanModeCommands),

    /// Raw diagnostic functions
    #[command(subcommand)]
    Raw(RawCommands),

    /// Settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum LedCommands {
    /// Show the current level
    Get,
    /// Set the level (clamped to the device maximum)
    Set { level: u32 },
}

#[derive(Subcommand)]
pub enum FanModeCommands {
    /// Show the last mode set, with its code
    Get,
    /// Set the mode by name or code
    Set { mode: String },
}

#[derive(Subcommand)]
pub enum RawCommands {
    /// Answer of the LED read function without payload
    Status,
    /// Write a value (decimal or 0x hex, clamped to 255) to function 31
    Set {
        #[arg(value_parser = parse_number)]
        value: u64,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective settings as JSON
    Show,
}

fn parse_number(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", s, e))
}

impl Cli {
    /// Whether the command talks to the firmware (and so needs root)
    pub fn needs_firmware(&self) -> bool {
        !matches!(self.command, Commands::Config(_))
    }

    /// Settings from the file, with command-line overrides applied
    pub fn settings(&self) -> Result<Settings> {
        let path = self.config.clone().unwrap_or_else(config::config_path);
        let mut settings = config::load_settings_from(&path)
            .with_context(|| format!("loading settings from {}", path.display()))?;
        if let Some(acpi_path) = &self.acpi_path {
            settings.acpi_path = Some(acpi_path.clone());
        }
        config::validate_settings(&settings)?;
        Ok(settings)
    }
}

pub fn run(cli: &Cli) -> Result<()> {
    let settings = cli.settings()?;
    if let Commands::Config(sub) = &cli.command {
        return cmd_config(sub, &settings);
    }
    let device = Device::from_settings(&settings);
    execute_command(&cli.command, &device)
}

fn execute_command(cmd: &Commands, device: &Device) -> Result<()> {
    match cmd {
        Commands::Sensors { json } => cmd_sensors(device, *json),
        Commands::Buffer => cmd_buffer(device),
        Commands::Led(sub) => cmd_led(sub, device),
        Commands::FanMode(sub) => cmd_fan_mode(sub, device),
        Commands::Raw(sub) => cmd_raw(sub, device),
        Commands::Config(_) => Ok(()),
    }
}

// ============================================================================
// Sensor Commands
// ============================================================================

fn cmd_sensors(device: &Device, json: bool) -> Result<()> {
    let snap = device.sensors().read_all().context("reading sensor package")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snap)?);
        return Ok(());
    }

    for (i, rpm) in snap.fans().iter().enumerate() {
        println!("fan{}:  {} RPM", i + 1, rpm);
    }
    for (i, duty) in snap.pwms().iter().enumerate() {
        println!("pwm{}:  {} ({:.0}%)", i + 1, duty, f64::from(*duty) * 100.0 / 255.0);
    }
    for (i, temp) in snap.temps().iter().enumerate() {
        println!("temp{}: {:.1}°C", i + 1, *temp as f64 / 1000.0);
    }
    Ok(())
}

fn cmd_buffer(device: &Device) -> Result<()> {
    println!("{}", device.sensors().buffer_dump().context("reading sensor package")?);
    Ok(())
}

// ============================================================================
// Actuator Commands
// ============================================================================

fn cmd_led(cmd: &LedCommands, device: &Device) -> Result<()> {
    let actuators = device.actuators();
    match cmd {
        LedCommands::Get => {
            println!("{}/{}", actuators.get_brightness(), actuators.max_brightness());
        }
        LedCommands::Set { level } => {
            let applied = actuators.set_brightness(*level).context("setting brightness")?;
            if applied as u32 != *level {
                eprintln!("Warning: level {} clamped to {}", level, applied);
            }
            println!("Brightness set to {}", applied);
        }
    }
    Ok(())
}

/// Mode as `name (code)`, the same shape `fan-mode set` reports
fn describe_mode(mode: Option<FanMode>) -> String {
    match mode {
        Some(mode) => format!("{} ({})", mode, mode.code()),
        None => UNKNOWN_MODE.to_string(),
    }
}

fn cmd_fan_mode(cmd: &FanModeCommands, device: &Device) -> Result<()> {
    let actuators = device.actuators();
    match cmd {
        // Each invocation is a fresh process, so only a mode set by this run is known
        FanModeCommands::Get => {
            println!("{}", describe_mode(actuators.fan_mode()));
        }
        FanModeCommands::Set { mode } => {
            let mode = actuators.set_fan_mode(mode.as_str()).context("setting fan mode")?;
            println!("Fan mode set to {}", describe_mode(Some(mode)));
        }
    }
    Ok(())
}

fn cmd_raw(cmd: &RawCommands, device: &Device) -> Result<()> {
    let actuators = device.actuators();
    match cmd {
        RawCommands::Status => println!("{}", actuators.raw_status()?),
        RawCommands::Set { value } => {
            actuators.raw_set(*value)?;
            println!("ok");
        }
    }
    Ok(())
}

// ============================================================================
// Config Commands
// ============================================================================

fn cmd_config(cmd: &ConfigCommands, settings: &Settings) -> Result<()> {
    match cmd {
        ConfigCommands::Show => println!("{}", serde_json::to_string_pretty(settings)?),
    }
    Ok(())
}
