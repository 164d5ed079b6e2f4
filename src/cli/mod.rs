use crate::mtc::{DisplayUpdateGranularity, FullFrameBehavior};
use crate::timecode::FrameRate;
use clap::{Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Select};
use std::io::IsTerminal;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Settings file (defaults to ~/.config/mtcsyncrs/settings.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log to stderr instead of the log file
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// List available MIDI devices
    Devices,

    /// Generate MTC to a MIDI output
    Generate {
        /// Output device (substring match)
        #[arg(long)]
        device: Option<String>,

        /// Frame rate, e.g. 24, 25, 29.97d, 30
        #[arg(long)]
        rate: Option<FrameRate>,

        /// Start position
        #[arg(long, default_value = "00:00:00:00")]
        start: String,

        /// Full-frame behavior when locating: always, if-different, never
        #[arg(long)]
        locate_behavior: Option<FullFrameBehavior>,
    },

    /// Receive and decode MTC from a MIDI input
    Receive {
        /// Input device (substring match)
        #[arg(long)]
        device: Option<String>,

        /// Local frame rate to scale incoming MTC to
        #[arg(long)]
        rate: Option<FrameRate>,

        /// Quarter-frame groups needed to lock
        #[arg(long)]
        lock_frames: Option<u32>,

        /// Missed groups tolerated before losing sync
        #[arg(long)]
        drop_out_frames: Option<u32>,

        /// Status refresh granularity: second or frame
        #[arg(long)]
        granularity: Option<DisplayUpdateGranularity>,
    },
}

pub fn handle_device_list() -> Vec<String> {
    // Re-export from the crate root
    crate::handle_device_list()
}

pub fn validate_device(device_name: &str, devices: &[String]) -> Result<(), String> {
    if !devices.iter().any(|d| d.contains(device_name)) {
        let mut error_msg = format!(
            "Error: Device '{}' not found in available devices:\n",
            device_name
        );
        for device in devices {
            error_msg.push_str(&format!("  - {}\n", device));
        }
        return Err(error_msg);
    }
    Ok(())
}

/// Resolves the device to use: the requested one after validation, or an
/// interactive choice when none was given and stdin is a terminal.
pub fn select_device(requested: Option<&str>, devices: &[String]) -> Result<String, String> {
    if let Some(name) = requested {
        validate_device(name, devices)?;
        return Ok(name.to_string());
    }

    if devices.is_empty() {
        return Err("Error: No MIDI devices available".to_string());
    }

    if !std::io::stdin().is_terminal() {
        return Err("Error: No device given (use --device)".to_string());
    }

    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select a MIDI device")
        .items(devices)
        .default(0)
        .interact_opt()
        .map_err(|e| format!("Error: Device prompt failed: {}", e))?;

    match choice {
        Some(index) => Ok(devices[index].clone()),
        None => Err("Error: No device selected".to_string()),
    }
}
