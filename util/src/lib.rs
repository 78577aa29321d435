//! Utility library for the ISMC flight software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod archive;
pub mod host;
pub mod logger;
pub mod maths;
pub mod params;
pub mod session;
pub mod time;
