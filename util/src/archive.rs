//! Struct archiving functionality
//!
//! An [`Archiver`] writes one CSV row per call to [`Archiver::serialise`]. Records must be flat
//! structs (no nested sequences, maps, or `#[serde(flatten)]`), and should carry their own
//! timestamp field, usually from [`crate::session::get_elapsed_seconds`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
pub struct Archiver {
    writer: Writer<File>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create the archive file: {0}")]
    FileCreateError(std::io::Error),

    #[error("Cannot write a record to the archive: {0}")]
    WriteError(csv::Error),

    #[error("Cannot flush the archive: {0}")]
    FlushError(std::io::Error),
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trait which enables a struct to be archived as a timestamped csv.
///
/// To implement this trait, the struct shall own one or more `Archiver`s, set up in its
/// constructor, and write its current records to them in `write`.
pub trait Archived {
    /// Write the archives for this struct
    fn write(&mut self) -> Result<(), ArchiveError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    ///
    /// Any missing parent directories are created, and an existing file at the path is
    /// truncated.
    pub fn from_path<P: AsRef<Path>>(session: &Session, path: P) -> Result<Self, ArchiveError> {
        let session_path = session.arch_root.join(path);

        if let Some(parent) = session_path.parent() {
            fs::create_dir_all(parent).map_err(ArchiveError::FileCreateError)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(session_path)
            .map_err(ArchiveError::FileCreateError)?;

        let writer = WriterBuilder::new().has_headers(true).from_writer(file);

        Ok(Self { writer })
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(&mut self, record: T) -> Result<(), ArchiveError> {
        self.writer
            .serialize(record)
            .map_err(ArchiveError::WriteError)?;
        self.writer.flush().map_err(ArchiveError::FlushError)
    }
}
