//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::Path;
use thiserror::Error;
use toml;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (ISMC_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot load the parameter file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the "$ISMC_SW_ROOT/params" directory
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    // Get the params dir
    let mut path = crate::host::get_ismc_sw_root().map_err(|_| LoadError::SwRootNotSet)?;
    path.push("params");
    path.push(param_file_path);

    load_from_path(path)
}

/// Load a parameter file from an explicit path.
pub fn load_from_path<P, A>(path: A) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    A: AsRef<Path>,
{
    // Load the file into a string
    let params_str = read_to_string(path).map_err(LoadError::FileLoadError)?;

    parse(&params_str)
}

/// Parse parameters from a TOML string.
pub fn parse<P>(params_str: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    toml::from_str(params_str).map_err(LoadError::DeserialiseError)
}
