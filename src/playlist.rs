//! Playlist file reading
//!
//! Plain UTF-8 text, one path per line. Blank lines and `#` comments are
//! skipped, which also makes extended M3U files readable.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FuseError, Result};

/// Read an ordered list of file paths from a playlist file
pub fn read_playlist(path: &Path) -> Result<Vec<PathBuf>> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FuseError::NotFound {
            path: path.display().to_string(),
        },
        std::io::ErrorKind::PermissionDenied => FuseError::PermissionDenied {
            path: path.display().to_string(),
        },
        _ => FuseError::Io(e),
    })?;

    let files: Vec<PathBuf> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect();

    if files.is_empty() {
        return Err(FuseError::InvalidOption {
            reason: format!("playlist '{}' contains no file entries", path.display()),
        });
    }
    Ok(files)
}
