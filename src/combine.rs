//! Two-file combination pipeline
//!
//! Orchestrates one combine operation end to end: validate both inputs,
//! probe formats, read (optionally preview-bounded) PCM, loop the first
//! buffer, normalize, crossfade or concatenate, then write atomically.
//! The pipeline owns every buffer it holds; each stage consumes its input
//! and hands ownership to the next.
//!
//! The combiner is silent: it returns structured results and errors and
//! leaves all user-facing output to the CLI layer.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;

use crate::error::{FuseError, Result};
use crate::process::{self, SampleCodec};
use crate::validate::{self, FileValidator, DISK_SPACE_MARGIN};
use crate::wav::{self, PcmBuffer};

// ============================================================================
// Request / result types
// ============================================================================

/// Processing options shared by single combines and playlist chains
#[derive(Debug, Clone)]
pub struct CombineOptions {
    /// Crossfade length in seconds; 0 = straight concatenation
    pub crossfade_seconds: f64,
    /// Target peak in (0, 1], or `None` to skip normalization
    pub normalize_target: Option<f64>,
    /// Bound processing to the first N seconds of each input
    pub preview_seconds: Option<f64>,
    /// Times to repeat the first input (1 = no looping)
    pub loop_count: u32,
    /// Report what would be done without reading samples or writing
    pub dry_run: bool,
}

impl Default for CombineOptions {
    fn default() -> Self {
        CombineOptions {
            crossfade_seconds: 0.0,
            normalize_target: None,
            preview_seconds: None,
            loop_count: 1,
            dry_run: false,
        }
    }
}

/// One combine operation: two inputs, one output, plus options
///
/// Immutable once constructed; passed by reference into [`Combiner::combine`].
#[derive(Debug, Clone)]
pub struct CombineRequest {
    pub input_a: PathBuf,
    pub input_b: PathBuf,
    pub output: PathBuf,
    pub options: CombineOptions,
}

impl CombineRequest {
    pub fn new(input_a: PathBuf, input_b: PathBuf, output: PathBuf) -> Self {
        CombineRequest {
            input_a,
            input_b,
            output,
            options: CombineOptions::default(),
        }
    }

    pub fn with_options(
        input_a: PathBuf,
        input_b: PathBuf,
        output: PathBuf,
        options: CombineOptions,
    ) -> Self {
        CombineRequest {
            input_a,
            input_b,
            output,
            options,
        }
    }

    /// Range-check option values; normally already done by the CLI
    fn check_options(&self) -> Result<()> {
        let opts = &self.options;
        if !opts.crossfade_seconds.is_finite() || opts.crossfade_seconds < 0.0 {
            return Err(FuseError::InvalidOption {
                reason: "crossfade duration must be zero or positive".to_string(),
            });
        }
        if let Some(target) = opts.normalize_target {
            if !target.is_finite() || target <= 0.0 || target > 1.0 {
                return Err(FuseError::InvalidOption {
                    reason: "normalization level must be between 0.0 and 1.0".to_string(),
                });
            }
        }
        if let Some(preview) = opts.preview_seconds {
            if !preview.is_finite() || preview <= 0.0 {
                return Err(FuseError::InvalidOption {
                    reason: "preview duration must be positive".to_string(),
                });
            }
        }
        if opts.loop_count < 1 {
            return Err(FuseError::InvalidOption {
                reason: "loop count must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Metadata for one input as shown in a dry-run report
#[derive(Debug, Clone, Serialize)]
pub struct InputReport {
    pub path: String,
    pub size_bytes: u64,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

/// What a combine would do, produced without touching any samples
#[derive(Debug, Clone, Serialize)]
pub struct DryRunReport {
    pub input_a: InputReport,
    pub input_b: InputReport,
    pub output: String,
    pub estimated_size_bytes: u64,
    pub estimated_duration_secs: f64,
    pub crossfade_seconds: f64,
    pub normalize_target: Option<f64>,
    pub loop_count: u32,
}

/// Successful outcome of one combine operation
#[derive(Debug, Clone)]
pub struct CombineResult {
    pub output: PathBuf,
    /// Size of the written container; 0 for dry runs
    pub bytes_written: u64,
    pub dry_run: Option<DryRunReport>,
}

// ============================================================================
// Combiner
// ============================================================================

/// Runs combine operations with a configured validator
#[derive(Debug, Default)]
pub struct Combiner {
    validator: FileValidator,
}

impl Combiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validator(validator: FileValidator) -> Self {
        Combiner { validator }
    }

    /// Combine two inputs into one output per the request
    ///
    /// On any failure no partial output is left at the destination; the
    /// atomic write path cleans up its own temporary.
    pub fn combine(&self, request: &CombineRequest) -> Result<CombineResult> {
        request.check_options()?;

        self.validator.validate(&request.input_a)?;
        self.validator.validate(&request.input_b)?;

        let info_a = wav::probe(&request.input_a)?;
        let info_b = wav::probe(&request.input_b)?;
        let size_a = fs::metadata(&request.input_a)?.len();
        let size_b = fs::metadata(&request.input_b)?.len();

        if request.options.dry_run {
            let report = DryRunReport {
                input_a: input_report(&request.input_a, size_a, &info_a),
                input_b: input_report(&request.input_b, size_b, &info_b),
                output: request.output.display().to_string(),
                estimated_size_bytes: size_a + size_b,
                estimated_duration_secs: info_a.duration_secs() + info_b.duration_secs(),
                crossfade_seconds: request.options.crossfade_seconds,
                normalize_target: request.options.normalize_target,
                loop_count: request.options.loop_count,
            };
            return Ok(CombineResult {
                output: request.output.clone(),
                bytes_written: 0,
                dry_run: Some(report),
            });
        }

        let format = info_a.format;
        if !format.is_compatible(&info_b.format) {
            return Err(FuseError::FormatMismatch {
                path_a: request.input_a.display().to_string(),
                format_a: format.to_string(),
                path_b: request.input_b.display().to_string(),
                format_b: info_b.format.to_string(),
            });
        }

        let estimated_bytes = size_a + size_b;
        if !validate::check_disk_space(&request.output, estimated_bytes) {
            let available = validate::available_space_for(&request.output).unwrap_or(0);
            return Err(FuseError::InsufficientDiskSpace {
                required_mb: (estimated_bytes + DISK_SPACE_MARGIN) / 1024 / 1024,
                available_mb: available / 1024 / 1024,
            });
        }

        // Preview mode bounds each input independently
        let preview_frames = request
            .options
            .preview_seconds
            .map(|secs| (secs * format.sample_rate as f64) as u64);

        let buffer_a = wav::read_frames(&request.input_a, preview_frames)?;
        let buffer_a = process::loop_repeat(buffer_a, request.options.loop_count);
        let buffer_b = wav::read_frames(&request.input_b, preview_frames)?;

        let (buffer_a, buffer_b) = match request.options.normalize_target {
            Some(target) => (
                process::normalize(buffer_a, target),
                process::normalize(buffer_b, target),
            ),
            None => (buffer_a, buffer_b),
        };

        let merged = merge(buffer_a, buffer_b, request.options.crossfade_seconds);

        let bytes_written = wav::write_atomic(&request.output, &merged)?;
        debug!(
            "combined {} + {} -> {} ({} bytes)",
            request.input_a.display(),
            request.input_b.display(),
            request.output.display(),
            bytes_written
        );

        Ok(CombineResult {
            output: request.output.clone(),
            bytes_written,
            dry_run: None,
        })
    }
}

/// Splice two buffers, crossfading over the overlap when requested
///
/// With a fade: output is [A minus overlap] + [faded region] + [B minus
/// overlap], the overlap clamped to what both buffers can supply. Without
/// one (or for bit depths the fade cannot interpret) the buffers are
/// concatenated unchanged.
fn merge(buffer_a: PcmBuffer, buffer_b: PcmBuffer, crossfade_seconds: f64) -> PcmBuffer {
    let format = *buffer_a.format();
    let fade_frames = (crossfade_seconds * format.sample_rate as f64) as usize;
    let fade_bytes = fade_frames * format.frame_size();

    let fadeable = SampleCodec::for_format(&format).is_some();
    if fade_bytes == 0 || !fadeable {
        if fade_bytes > 0 {
            debug!(
                "crossfade skipped: {}-bit samples are passed through unchanged",
                format.bits_per_sample
            );
        }
        let mut data = buffer_a.into_data();
        data.extend_from_slice(buffer_b.data());
        return PcmBuffer::new(format, data);
    }

    let a = buffer_a.data();
    let b = buffer_b.data();

    let fade_start = a.len().saturating_sub(fade_bytes);
    let overlap = (a.len() - fade_start).min(b.len());

    let tail_a = PcmBuffer::new(format, a[fade_start..fade_start + overlap].to_vec());
    let head_b = PcmBuffer::new(format, b[..overlap].to_vec());
    let faded = process::crossfade(&tail_a, &head_b);

    let mut data = Vec::with_capacity(fade_start + faded.len() + (b.len() - overlap));
    data.extend_from_slice(&a[..fade_start]);
    data.extend_from_slice(faded.data());
    data.extend_from_slice(&b[overlap..]);
    PcmBuffer::new(format, data)
}

fn input_report(path: &Path, size_bytes: u64, info: &wav::WavInfo) -> InputReport {
    InputReport {
        path: path.display().to_string(),
        size_bytes,
        duration_secs: info.duration_secs(),
        sample_rate: info.format.sample_rate,
        channels: info.format.channels,
        bits_per_sample: info.format.bits_per_sample,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav::SampleFormat;
    use tempfile::tempdir;

    const MONO_16: SampleFormat = SampleFormat {
        sample_rate: 44100,
        channels: 1,
        bits_per_sample: 16,
        big_endian: false,
    };

    fn write_wav(path: &Path, format: SampleFormat, samples: &[i16]) {
        let mut data = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            data.extend_from_slice(&s.to_le_bytes());
        }
        wav::write_atomic(path, &PcmBuffer::new(format, data)).unwrap();
    }

    #[test]
    fn test_concat_without_fade_is_byte_exact() {
        let dir = tempdir().unwrap();
        let a_path = dir.path().join("a.wav");
        let b_path = dir.path().join("b.wav");
        let out = dir.path().join("out.wav");

        let a_samples: Vec<i16> = (0..441).collect();
        let b_samples: Vec<i16> = (0..441).map(|i| -i).collect();
        write_wav(&a_path, MONO_16, &a_samples);
        write_wav(&b_path, MONO_16, &b_samples);

        let request = CombineRequest::new(a_path, b_path, out.clone());
        let result = Combiner::new().combine(&request).unwrap();
        assert!(result.bytes_written > 0);

        let merged = wav::read_frames(&out, None).unwrap();
        let mut expected = Vec::new();
        for s in a_samples.iter().chain(b_samples.iter()) {
            expected.extend_from_slice(&s.to_le_bytes());
        }
        assert_eq!(merged.data(), &expected[..]);
    }

    #[test]
    fn test_format_mismatch_creates_no_output() {
        let dir = tempdir().unwrap();
        let a_path = dir.path().join("a.wav");
        let b_path = dir.path().join("b.wav");
        let out = dir.path().join("out.wav");

        write_wav(&a_path, MONO_16, &[0; 100]);
        let other = SampleFormat {
            sample_rate: 48000,
            ..MONO_16
        };
        write_wav(&b_path, other, &[0; 100]);

        let request = CombineRequest::new(a_path, b_path, out.clone());
        let err = Combiner::new().combine(&request).unwrap_err();
        assert_eq!(err.error_code(), "FORMAT_MISMATCH");
        assert!(!out.exists());
        assert!(!dir.path().join("out.wav.tmp").exists());
    }

    #[test]
    fn test_loop_count_multiplies_first_input() {
        let dir = tempdir().unwrap();
        let a_path = dir.path().join("a.wav");
        let b_path = dir.path().join("b.wav");
        let out = dir.path().join("out.wav");

        write_wav(&a_path, MONO_16, &[5; 100]);
        write_wav(&b_path, MONO_16, &[7; 50]);

        let options = CombineOptions {
            loop_count: 3,
            ..Default::default()
        };
        let request = CombineRequest::with_options(a_path, b_path, out.clone(), options);
        Combiner::new().combine(&request).unwrap();

        let merged = wav::read_frames(&out, None).unwrap();
        assert_eq!(merged.frame_count(), 100 * 3 + 50);
    }

    #[test]
    fn test_preview_bounds_both_inputs() {
        let dir = tempdir().unwrap();
        let a_path = dir.path().join("a.wav");
        let b_path = dir.path().join("b.wav");
        let out = dir.path().join("out.wav");

        // One second each at 44100 Hz
        write_wav(&a_path, MONO_16, &vec![1; 44100]);
        write_wav(&b_path, MONO_16, &vec![2; 44100]);

        let options = CombineOptions {
            preview_seconds: Some(0.1),
            ..Default::default()
        };
        let request = CombineRequest::with_options(a_path, b_path, out.clone(), options);
        Combiner::new().combine(&request).unwrap();

        let merged = wav::read_frames(&out, None).unwrap();
        assert_eq!(merged.frame_count(), 4410 * 2);
    }

    #[test]
    fn test_dry_run_reads_no_samples_and_writes_nothing() {
        let dir = tempdir().unwrap();
        let a_path = dir.path().join("a.wav");
        let b_path = dir.path().join("b.wav");
        let out = dir.path().join("out.wav");

        write_wav(&a_path, MONO_16, &[0; 4410]);
        write_wav(&b_path, MONO_16, &[0; 8820]);

        let options = CombineOptions {
            dry_run: true,
            crossfade_seconds: 1.5,
            ..Default::default()
        };
        let request = CombineRequest::with_options(a_path, b_path, out.clone(), options);
        let result = Combiner::new().combine(&request).unwrap();

        assert!(!out.exists());
        assert_eq!(result.bytes_written, 0);
        let report = result.dry_run.expect("dry run report");
        assert_eq!(report.input_a.sample_rate, 44100);
        assert!((report.input_a.duration_secs - 0.1).abs() < 1e-9);
        assert!((report.estimated_duration_secs - 0.3).abs() < 1e-9);
        assert!((report.crossfade_seconds - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_options_rejected_before_validation() {
        let request = CombineRequest::with_options(
            PathBuf::from("/nonexistent/a.wav"),
            PathBuf::from("/nonexistent/b.wav"),
            PathBuf::from("/nonexistent/out.wav"),
            CombineOptions {
                normalize_target: Some(1.5),
                ..Default::default()
            },
        );
        let err = Combiner::new().combine(&request).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_OPTION");
    }

    #[test]
    fn test_crossfade_overlap_shortens_output() {
        let dir = tempdir().unwrap();
        let a_path = dir.path().join("a.wav");
        let b_path = dir.path().join("b.wav");
        let out = dir.path().join("out.wav");

        write_wav(&a_path, MONO_16, &vec![1000; 44100]);
        write_wav(&b_path, MONO_16, &vec![-1000; 44100]);

        let options = CombineOptions {
            crossfade_seconds: 0.5,
            ..Default::default()
        };
        let request = CombineRequest::with_options(a_path, b_path, out.clone(), options);
        Combiner::new().combine(&request).unwrap();

        // 1 s + 1 s with 0.5 s overlap = exactly 1.5 s
        let merged = wav::read_frames(&out, None).unwrap();
        assert_eq!(merged.frame_count(), 44100 + 44100 - 22050);
    }
}
