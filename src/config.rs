// config.rs

use crate::mtc::{DisplayUpdateGranularity, FullFrameBehavior, SyncPolicy};
use crate::timecode::FrameRate;
use config::{Config, ConfigError, Environment, File, FileFormat};
use log::debug;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Consecutive continuous quarter-frame groups needed before lock.
pub const DEFAULT_LOCK_FRAMES: u32 = 16;
/// Consecutive missed groups tolerated while freewheeling.
pub const DEFAULT_DROP_OUT_FRAMES: u32 = 10;

/// How long the receiver waits for input before checking for drop-outs.
pub const RECEIVER_POLL_INTERVAL: Duration = Duration::from_millis(5);
pub const STATUS_REFRESH_INTERVAL: Duration = Duration::from_millis(100);

pub const ENV_PREFIX: &str = "MTCSYNC";

#[derive(Debug)]
pub enum SettingsError {
    Source(ConfigError),
    Invalid(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Source(e) => write!(f, "configuration error: {}", e),
            SettingsError::Invalid(msg) => write!(f, "invalid setting: {}", msg),
        }
    }
}

impl Error for SettingsError {}

impl From<ConfigError> for SettingsError {
    fn from(e: ConfigError) -> Self {
        SettingsError::Source(e)
    }
}

/// Resolved settings. Layers, lowest priority first: built-in defaults,
/// the settings file, `MTCSYNC_*` environment variables. Command line
/// overrides are applied by the binary on top.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub device: Option<String>,
    pub frame_rate: Option<FrameRate>,
    pub lock_frames: u32,
    pub drop_out_frames: u32,
    pub locate_behavior: FullFrameBehavior,
    pub display_granularity: DisplayUpdateGranularity,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            device: None,
            frame_rate: None,
            lock_frames: DEFAULT_LOCK_FRAMES,
            drop_out_frames: DEFAULT_DROP_OUT_FRAMES,
            locate_behavior: FullFrameBehavior::default(),
            display_granularity: DisplayUpdateGranularity::default(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, or from the default location when `None`.
    /// An explicit path must exist; the default one is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let (file, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_settings_path() {
                Some(p) => (p, false),
                None => return Self::from_config(defaults()?.add_source(env()).build()?),
            },
        };
        debug!("Loading settings from {}", file.display());

        let config = defaults()?
            .add_source(File::from(file).required(required))
            .add_source(env())
            .build()?;
        Self::from_config(config)
    }

    /// Parses settings from TOML text, ignoring the environment.
    pub fn from_toml(text: &str) -> Result<Self, SettingsError> {
        let config = defaults()?
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?;
        Self::from_config(config)
    }

    pub fn sync_policy(&self) -> Result<SyncPolicy, SettingsError> {
        SyncPolicy::new(self.lock_frames, self.drop_out_frames).map_err(SettingsError::Invalid)
    }

    fn from_config(config: Config) -> Result<Self, SettingsError> {
        let frame_rate = match optional_string(&config, "frame_rate")? {
            Some(text) => Some(
                text.parse::<FrameRate>()
                    .map_err(|e| SettingsError::Invalid(e.to_string()))?,
            ),
            None => None,
        };

        let settings = Settings {
            device: optional_string(&config, "device")?,
            frame_rate,
            lock_frames: frame_count(&config, "lock_frames")?,
            drop_out_frames: frame_count(&config, "drop_out_frames")?,
            locate_behavior: config
                .get_string("locate_behavior")?
                .parse()
                .map_err(SettingsError::Invalid)?,
            display_granularity: config
                .get_string("display_granularity")?
                .parse()
                .map_err(SettingsError::Invalid)?,
        };

        // catches lock_frames = 0 at load time
        settings.sync_policy()?;
        Ok(settings)
    }
}

pub fn default_settings_path() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("mtcsyncrs")
            .join("settings.toml"),
    )
}

fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Config::builder()
        .set_default("lock_frames", i64::from(DEFAULT_LOCK_FRAMES))?
        .set_default("drop_out_frames", i64::from(DEFAULT_DROP_OUT_FRAMES))?
        .set_default("locate_behavior", "if-different")?
        .set_default("display_granularity", "second")
}

fn env() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
}

fn optional_string(config: &Config, key: &str) -> Result<Option<String>, SettingsError> {
    match config.get_string(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn frame_count(config: &Config, key: &str) -> Result<u32, SettingsError> {
    let value = config.get_int(key)?;
    u32::try_from(value).map_err(|_| {
        SettingsError::Invalid(format!(
            "{} must be a non-negative integer, got {}",
            key, value
        ))
    })
}
