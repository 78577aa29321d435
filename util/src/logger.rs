//! Generic logger utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use fern;
use log::{self, info};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Most verbose level allowed for targets which would otherwise flood the log.
///
/// The simulated vehicle publishes state many times per control tick, and the controller traces
/// every evaluation, so neither is shown in full even when running at `Trace`.
const TARGET_MAX_LEVELS: &[(&str, LevelFilter)] = &[
    ("ismc_lib::sim", LevelFilter::Info),
    ("ismc_lib::smc::controller", LevelFilter::Debug),
];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// Records are written to stdout and to the session's log file, stamped with the number of
/// seconds elapsed since the session epoch.
///
/// # Notes
///
/// - `min_level` must be `Info` or more verbose, as mission start and end are logged at `Info`.
/// - Noisy targets are capped, see `TARGET_MAX_LEVELS`.
///
/// # Safety
///
/// - This function must only be called once to prevent corrupting logs.
pub fn logger_init(
    min_level: self::LevelFilter,
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    if min_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file =
        fern::log_file(session.log_file_path.clone()).map_err(LoggerInitError::LogFileInitError)?;

    // Setup the logger using fern's builder pattern
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            // If debug or trace include the target, otherwise don't include it
            if record.level() > log::Level::Info {
                out.finish(format_args!(
                    "[{:10.6} {}] {}: {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "[{:10.6} {}] {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    message
                ))
            }
        })
        .level(min_level);

    for &(target, max_level) in TARGET_MAX_LEVELS {
        dispatch = dispatch.level_for(target, capped_level(min_level, max_level));
    }

    dispatch
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// The level for a capped target, never more verbose than `max_level`.
fn capped_level(min_level: LevelFilter, max_level: LevelFilter) -> LevelFilter {
    min_level.min(max_level)
}

/// Get the string representation of a log level
fn level_to_str(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info => "INF".normal(),
        log::Level::Warn => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold(),
    }
}
