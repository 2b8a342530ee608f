//! Error handling for wavfuse
//!
//! Every failure the combination pipeline can hit maps to one structured
//! kind. Errors are terminal for the operation that raised them; nothing is
//! retried. Suggestion text is carried here so the CLI can print it, but the
//! library itself never writes to stdout/stderr.

use thiserror::Error;

/// Result type alias for wavfuse operations
pub type Result<T> = std::result::Result<T, FuseError>;

/// Main error type for wavfuse operations
#[derive(Error, Debug)]
pub enum FuseError {
    // File validation errors
    #[error("cannot open '{path}' - file not found")]
    NotFound { path: String },

    #[error("cannot read '{path}' - permission denied")]
    PermissionDenied { path: String },

    #[error("'{path}' is empty (0 bytes)")]
    EmptyFile { path: String },

    #[error("'{path}' is too large ({size_mb} MB, limit {limit_mb} MB)")]
    TooLarge {
        path: String,
        size_mb: u64,
        limit_mb: u64,
    },

    // Container errors
    #[error("'{path}' is not a supported audio file: {reason}")]
    Unsupported { path: String, reason: String },

    #[error("'{path}' has a corrupt or malformed container: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("'{path}' has invalid duration (no audio frames)")]
    ZeroDuration { path: String },

    // Combination errors
    #[error("audio format mismatch: '{path_a}' is {format_a}, '{path_b}' is {format_b}")]
    FormatMismatch {
        path_a: String,
        format_a: String,
        path_b: String,
        format_b: String,
    },

    #[error("insufficient disk space: {required_mb} MB required, {available_mb} MB available")]
    InsufficientDiskSpace {
        required_mb: u64,
        available_mb: u64,
    },

    // Parameter errors (normally caught by the CLI before the core runs)
    #[error("invalid option: {reason}")]
    InvalidOption { reason: String },

    // I/O errors (read/write/rename failures)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FuseError {
    /// Get the stable error code for this error kind
    pub fn error_code(&self) -> &'static str {
        match self {
            FuseError::NotFound { .. } => "NOT_FOUND",
            FuseError::PermissionDenied { .. } => "PERMISSION_DENIED",
            FuseError::EmptyFile { .. } => "EMPTY_FILE",
            FuseError::TooLarge { .. } => "TOO_LARGE",
            FuseError::Unsupported { .. } => "UNSUPPORTED",
            FuseError::Corrupt { .. } => "CORRUPT",
            FuseError::ZeroDuration { .. } => "ZERO_DURATION",
            FuseError::FormatMismatch { .. } => "FORMAT_MISMATCH",
            FuseError::InsufficientDiskSpace { .. } => "INSUFFICIENT_DISK_SPACE",
            FuseError::InvalidOption { .. } => "INVALID_OPTION",
            FuseError::Io(_) => "IO_FAILURE",
        }
    }

    /// Get suggestion lines for this error, for the CLI to print
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            FuseError::NotFound { .. } => vec!["check the file path and try again"],
            FuseError::PermissionDenied { .. } => {
                vec!["check file permissions (chmod +r <file>)"]
            }
            FuseError::EmptyFile { .. } => {
                vec!["ensure the file contains valid audio data"]
            }
            FuseError::TooLarge { .. } => {
                vec!["split the file or raise the size limit"]
            }
            FuseError::Unsupported { .. } => vec![
                "ensure the file is in WAV format and not corrupted",
                "try converting with: ffmpeg -i input.mp3 output.wav",
            ],
            FuseError::Corrupt { .. } => {
                vec!["the file may be truncated - try re-exporting from source"]
            }
            FuseError::ZeroDuration { .. } => {
                vec!["ensure the file contains valid audio frames"]
            }
            FuseError::FormatMismatch { .. } => vec![
                "convert files to matching format using ffmpeg:",
                "  ffmpeg -i input.wav -ar <rate> -ac <channels> output.wav",
            ],
            FuseError::InsufficientDiskSpace { .. } => {
                vec!["free up disk space or choose a different output location"]
            }
            FuseError::InvalidOption { .. } => vec!["see --help for accepted values"],
            FuseError::Io(_) => vec!["check file permissions and disk space"],
        }
    }
}
