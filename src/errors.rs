use std::io;
use std::path::PathBuf;

use thiserror::Error;
use zip::result::ZipError;

use crate::dex::{HeaderError, ImageError};

/// File-level failures. Each aborts the current input file; remaining
/// files still run, and the process exit code goes nonzero.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to read archive: {0}")]
    Zip(#[from] ZipError),
    #[error("failed to parse DEX: {0}")]
    Dex(#[from] ::dex::Error),
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("no DEX image found in {0}")]
    NoDexFound(PathBuf),
}
