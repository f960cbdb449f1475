//! Opaque reference to the data a job transfers.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// What to transfer. The queue never reads the bytes behind `source`;
/// only the executor does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Display name (usually the file name).
    pub name: String,
    /// Size in bytes as known at submission.
    pub size: u64,
    /// Where the executor reads the content from.
    pub source: PathBuf,
}

impl Payload {
    pub fn new(name: impl Into<String>, size: u64, source: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            size,
            source: source.into(),
        }
    }

    /// Build a payload from a file on disk, taking name and size from the filesystem.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, meta.len(), path))
    }
}
