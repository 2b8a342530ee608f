//! Input file validation and disk-space checks
//!
//! Checks run in a fixed order and stop at the first failure: existence,
//! readability, non-empty, size limit, then container decodability. All
//! checks happen before any destructive action, so a validation failure can
//! never leave partial output behind.

use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::error::{FuseError, Result};
use crate::wav;

/// Default per-file size limit (1 GiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// Free-space safety margin added to the estimated output size (100 MiB)
pub const DISK_SPACE_MARGIN: u64 = 100 * 1024 * 1024;

/// Validates input audio files before they enter the pipeline
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: u64,
}

impl Default for FileValidator {
    fn default() -> Self {
        FileValidator {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl FileValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validator with a non-default size limit
    pub fn with_max_size(max_file_size: u64) -> Self {
        FileValidator { max_file_size }
    }

    /// Validate one input file, short-circuiting on the first failure
    pub fn validate(&self, path: &Path) -> Result<()> {
        let path_str = path.display().to_string();

        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FuseError::NotFound { path: path_str });
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(FuseError::PermissionDenied { path: path_str });
            }
            Err(e) => return Err(FuseError::Io(e)),
        };

        // Readability is separate from existence: a file can be visible but
        // not openable.
        if let Err(e) = fs::File::open(path) {
            return match e.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    Err(FuseError::PermissionDenied { path: path_str })
                }
                _ => Err(FuseError::Io(e)),
            };
        }

        let size = metadata.len();
        if size == 0 {
            return Err(FuseError::EmptyFile { path: path_str });
        }
        if size > self.max_file_size {
            return Err(FuseError::TooLarge {
                path: path_str,
                size_mb: size / 1024 / 1024,
                limit_mb: self.max_file_size / 1024 / 1024,
            });
        }

        let info = wav::probe(path)?;
        if info.frame_count == 0 {
            return Err(FuseError::ZeroDuration { path: path_str });
        }

        debug!(
            "validated {}: {} ({} frames, {} bytes)",
            path.display(),
            info.format,
            info.frame_count,
            size
        );
        Ok(())
    }
}

/// Check that the target's volume has room for `estimated_bytes` plus margin
///
/// The result is advisory: when the free-space query itself fails we warn
/// and report `true`, matching the tool's historical behavior. The combiner
/// treats a `false` as fatal for its operation; other callers may not.
pub fn check_disk_space(target_path: &Path, estimated_bytes: u64) -> bool {
    let dir = volume_dir(target_path);
    let available = match fs2::available_space(dir) {
        Ok(a) => a,
        Err(e) => {
            warn!("could not verify available disk space: {}", e);
            return true;
        }
    };

    let required = estimated_bytes + DISK_SPACE_MARGIN;
    if available < required {
        debug!(
            "insufficient space on {}: {} required, {} available",
            dir.display(),
            required,
            available
        );
        return false;
    }
    true
}

/// Free bytes on the target's volume, if the query succeeds
pub fn available_space_for(target_path: &Path) -> Option<u64> {
    fs2::available_space(volume_dir(target_path)).ok()
}

/// Directory whose filesystem will hold the target file
fn volume_dir(target_path: &Path) -> &Path {
    match target_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav::{PcmBuffer, SampleFormat};
    use std::io::Write;
    use tempfile::tempdir;

    const MONO_16: SampleFormat = SampleFormat {
        sample_rate: 44100,
        channels: 1,
        bits_per_sample: 16,
        big_endian: false,
    };

    fn write_valid_wav(path: &Path, frames: usize) {
        let buffer = PcmBuffer::new(MONO_16, vec![0u8; frames * 2]);
        wav::write_atomic(path, &buffer).unwrap();
    }

    #[test]
    fn test_missing_file() {
        let err = FileValidator::new()
            .validate(Path::new("/nonexistent/input.wav"))
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        fs::File::create(&path).unwrap();

        let err = FileValidator::new().validate(&path).unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_FILE");
    }

    #[test]
    fn test_too_large() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("large.wav");
        write_valid_wav(&path, 4410);

        let err = FileValidator::with_max_size(16)
            .validate(&path)
            .unwrap_err();
        assert_eq!(err.error_code(), "TOO_LARGE");
    }

    #[test]
    fn test_not_a_wav() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(b"definitely not a RIFF container").unwrap();
        drop(f);

        let err = FileValidator::new().validate(&path).unwrap_err();
        assert!(
            matches!(err, FuseError::Corrupt { .. } | FuseError::Unsupported { .. }),
            "got {:?}",
            err
        );
    }

    #[test]
    fn test_zero_duration() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zero.wav");
        write_valid_wav(&path, 0);

        // Header-only container is non-empty on disk but has no frames
        let err = FileValidator::new().validate(&path).unwrap_err();
        assert_eq!(err.error_code(), "ZERO_DURATION");
    }

    #[test]
    fn test_valid_file_passes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ok.wav");
        write_valid_wav(&path, 441);

        assert!(FileValidator::new().validate(&path).is_ok());
    }

    #[test]
    fn test_disk_space_for_small_estimate() {
        let dir = tempdir().unwrap();
        // A tiny estimate should always fit on any test machine
        assert!(check_disk_space(&dir.path().join("out.wav"), 1024));
    }
}
