//! Session management
//!
//! A session is one execution of a binary. Each session gets its own directory holding the log
//! file, CSV archives, and any data saved at runtime.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use erased_serde::Serialize;
use log::{info, warn};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;

// Internal imports
use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A chrono format string which diplays a timestamp. See
/// https://docs.rs/chrono/0.4.11/chrono/format/strftime/index.html for more
/// information.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// How long the save thread blocks waiting for data before checking the stop flag.
const SAVE_POLL_PERIOD: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

type SaveItem = (PathBuf, Box<dyn Serialize + Send>);

/// A struct storing information about the current session
#[derive(Clone)]
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The root directory for this session's archives
    pub arch_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,

    save_sender: Sender<SaveItem>,

    save_stop: Arc<AtomicBool>,

    save_done: Arc<AtomicBool>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (ISMC_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error(
        "Cannot initialise the session epoch, have you already initialised the \
         session? (conquer_once error: {0})"
    )]
    CannotInitEpoch(conquer_once::TryInitError),

    #[error("Cannot get the epoch time, did you forget to initialise the session?")]
    CannotGetEpoch,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session within the given directory.
    ///
    /// This will create a new session directory named `{exec_name}_{timestamp}` inside
    /// `$ISMC_SW_ROOT/{sessions_dir}`.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        // Set the session epoch
        SESSION_EPOCH
            .try_init_once(Utc::now)
            .map_err(SessionError::CannotInitEpoch)?;

        // Format the session epoch as a timestamp
        let timestamp = match SESSION_EPOCH.get() {
            Some(e) => e.format(TIMESTAMP_FORMAT),
            None => return Err(SessionError::CannotGetEpoch),
        };

        // Get the root directory
        let mut path =
            crate::host::get_ismc_sw_root().map_err(|_| SessionError::SwRootNotSet)?;
        path.push(sessions_dir);
        path.push(format!("{}_{}", exec_name, timestamp));

        // Create the session and archive directories
        let arch_path = path.join("arch");
        fs::create_dir_all(&arch_path).map_err(SessionError::CannotCreateDir)?;

        // Create the log file path
        let log_file_path = path.join(format!("{}.log", exec_name));

        // Spawn the background save thread
        let (tx, rx) = channel();
        let save_stop = Arc::new(AtomicBool::new(false));
        let save_done = Arc::new(AtomicBool::new(false));
        {
            let session_root = path.clone();
            let stop = save_stop.clone();
            let done = save_done.clone();
            thread::spawn(move || save_thread(stop, done, session_root, rx));
        }

        Ok(Session {
            session_root: path,
            arch_root: arch_path,
            log_file_path,
            save_sender: tx,
            save_stop,
            save_done,
        })
    }

    /// Exit the session, waiting for the save thread to write any pending data.
    pub fn exit(self) {
        self.save_stop.store(true, Ordering::Relaxed);

        info!("Stopping save thread");

        while !self.save_done.load(Ordering::Relaxed) {
            thread::sleep(SAVE_POLL_PERIOD);
        }

        info!("Save thread exited");
    }

    /// Saves the given data to the given session-relative path in a background thread.
    ///
    /// Only `.json` paths are supported.
    pub fn save<P: AsRef<Path>, T: Serialize + Send + 'static>(&self, path: P, data: T) {
        if let Err(e) = self
            .save_sender
            .send((path.as_ref().to_path_buf(), Box::new(data)))
        {
            warn!(
                "Could not send data to be saved to path {:?}: {}",
                path.as_ref(),
                e
            )
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the number of seconds elapsed since the start of the session.
///
/// Returns `NAN` if the session has not been started yet.
pub fn get_elapsed_seconds() -> f64 {
    match SESSION_EPOCH.get() {
        Some(e) => time::duration_to_seconds(Utc::now() - *e).unwrap_or(std::f64::NAN),
        None => std::f64::NAN,
    }
}

/// Return a reference to the session's epoch.
///
/// # Panics
/// - This function will panic if the session epoch has not been
///   initialised, which is performed on creating a new Session instance.
pub fn get_epoch() -> &'static DateTime<Utc> {
    match SESSION_EPOCH.get() {
        Some(e) => e,
        None => panic!("Cannot get the session epoch!"),
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

fn save_thread(
    stop: Arc<AtomicBool>,
    done: Arc<AtomicBool>,
    session_root: PathBuf,
    receiver: Receiver<SaveItem>,
) {
    loop {
        match receiver.recv_timeout(SAVE_POLL_PERIOD) {
            Ok((path, data)) => write_json(&session_root.join(path), &data),
            // Only stop once the queue has drained
            Err(RecvTimeoutError::Timeout) => {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    done.store(true, Ordering::Relaxed);
}

fn write_json(full_path: &Path, data: &Box<dyn Serialize + Send>) {
    match full_path.extension().and_then(|s| s.to_str()) {
        Some("json") => (),
        ext => {
            warn!(
                "Unrecognised file path extension for {:?} (got {:?})",
                full_path, ext
            );
            return;
        }
    }

    // Create the parent path if needed
    if let Some(parent) = full_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Couldn't create parent directory for {:?}: {}", full_path, e);
            return;
        }
    }

    let file = match OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(true)
        .open(full_path)
    {
        Ok(f) => f,
        Err(e) => {
            warn!("Couldn't create file {:?}: {}", full_path, e);
            return;
        }
    };

    if let Err(e) = serde_json::to_writer_pretty(&file, data) {
        warn!("Couldn't serialize data for file {:?}: {}", full_path, e);
    }
}
