use simplelog::*;
use std::fs::{self, OpenOptions};
use std::io::{Error, ErrorKind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

static INIT: Once = Once::new();
static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Directory the file logger writes `app.log` into.
pub fn log_dir() -> Result<PathBuf, Error> {
    let home = std::env::var("HOME")
        .map_err(|_| Error::new(ErrorKind::NotFound, "HOME environment variable not set"))?;

    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("mtcsyncrs")
        .join("logs"))
}

/// Installs the global logger once per process.
///
/// With `verbose` logs go to stderr through env_logger (honouring `RUST_LOG`,
/// default `debug`); otherwise to `~/.local/share/mtcsyncrs/logs/app.log`,
/// keeping the terminal free for the status line.
pub fn init_logger(verbose: bool) -> Result<(), Error> {
    let mut result = Ok(());

    INIT.call_once(|| {
        result = if verbose {
            init_stderr_logger()
        } else {
            init_file_logger()
        };
        if result.is_ok() {
            LOGGER_INITIALIZED.store(true, Ordering::SeqCst);
        }
    });

    result?;
    if LOGGER_INITIALIZED.load(Ordering::SeqCst) {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::Other, "Logger initialization failed"))
    }
}

fn init_stderr_logger() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .format_timestamp_millis()
        .try_init()
        .map_err(|e| Error::new(ErrorKind::Other, e))
}

fn init_file_logger() -> Result<(), Error> {
    let log_dir = log_dir()?;

    // Create the log directory if it doesn't exist
    fs::create_dir_all(&log_dir)?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("app.log"))?;

    CombinedLogger::init(vec![WriteLogger::new(
        LevelFilter::Debug,
        Config::default(),
        log_file,
    )])
    .map_err(|e| Error::new(ErrorKind::Other, e))
}
