//! WAV container read/write
//!
//! Byte-accurate access to uncompressed PCM WAV files via hound. Decoded
//! sample data is kept as raw interleaved little-endian bytes (8-bit audio
//! stays unsigned, as stored in the container) so that reading and writing a
//! buffer reproduces the data chunk exactly.
//!
//! Writing is atomic: the full container goes to a sibling `<path>.tmp`
//! first and is renamed over the destination only after a successful
//! finalize. A failed write never leaves a partial file at the final path.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use hound::{SampleFormat as WavSampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::error::{FuseError, Result};

// ============================================================================
// Sample format
// ============================================================================

/// PCM stream format descriptor
///
/// Two formats are compatible only when all four fields match exactly;
/// wavfuse never resamples or remixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
    /// Bits per sample (8, 16, 24 or 32)
    pub bits_per_sample: u16,
    /// Sample byte order; always false for WAV-sourced buffers
    pub big_endian: bool,
}

impl SampleFormat {
    /// Bytes per single-channel sample
    pub fn bytes_per_sample(&self) -> usize {
        self.bits_per_sample as usize / 8
    }

    /// Bytes per frame (one sample for every channel)
    pub fn frame_size(&self) -> usize {
        self.channels as usize * self.bytes_per_sample()
    }

    /// Exact-match compatibility check (no resampling, no remixing)
    pub fn is_compatible(&self, other: &SampleFormat) -> bool {
        self == other
    }

    fn from_spec(spec: WavSpec) -> Self {
        SampleFormat {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            big_endian: false,
        }
    }

    fn to_spec(self) -> WavSpec {
        WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: WavSampleFormat::Int,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {}-bit",
            self.sample_rate, self.channels, self.bits_per_sample
        )
    }
}

/// Container metadata returned by [`probe`] without materializing samples
#[derive(Debug, Clone, Copy)]
pub struct WavInfo {
    pub format: SampleFormat,
    /// Total number of frames in the data chunk
    pub frame_count: u64,
}

impl WavInfo {
    /// Stream duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frame_count as f64 / self.format.sample_rate as f64
    }
}

// ============================================================================
// PCM buffer
// ============================================================================

/// Owned raw PCM sample data plus its format
///
/// The byte length is always a whole number of frames; a trailing partial
/// frame is dropped at construction, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    format: SampleFormat,
    data: Vec<u8>,
}

impl PcmBuffer {
    /// Wrap raw sample bytes, truncating any trailing partial frame
    pub fn new(format: SampleFormat, mut data: Vec<u8>) -> Self {
        let frame_size = format.frame_size();
        if frame_size > 0 {
            let whole = (data.len() / frame_size) * frame_size;
            data.truncate(whole);
        }
        PcmBuffer { format, data }
    }

    pub fn format(&self) -> &SampleFormat {
        &self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Byte length of the sample data
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of whole frames held
    pub fn frame_count(&self) -> u64 {
        let frame_size = self.format.frame_size();
        if frame_size == 0 {
            0
        } else {
            (self.data.len() / frame_size) as u64
        }
    }

    /// Duration in seconds at this buffer's sample rate
    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.format.sample_rate as f64
    }

    /// Consume the buffer, returning its raw bytes
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

// ============================================================================
// Probe / read / write
// ============================================================================

/// Parse a WAV header and return format metadata plus the total frame count
///
/// Never reads sample data. Non-integer-PCM codecs (including float WAV) are
/// rejected as `Unsupported`; malformed or truncated headers as `Corrupt`.
pub fn probe(path: &Path) -> Result<WavInfo> {
    let reader = open_checked(path)?;
    let format = SampleFormat::from_spec(reader.spec());
    let frame_count = reader.duration() as u64;
    Ok(WavInfo {
        format,
        frame_count,
    })
}

/// Read up to `max_frames` frames (or the full stream) into a [`PcmBuffer`]
///
/// Samples are re-encoded into the canonical interleaved little-endian byte
/// layout. The allocation is bounded up front by the requested frame count,
/// so preview reads of large files stay cheap.
pub fn read_frames(path: &Path, max_frames: Option<u64>) -> Result<PcmBuffer> {
    let mut reader = open_checked(path)?;
    let format = SampleFormat::from_spec(reader.spec());

    let total_frames = reader.duration() as u64;
    let frames = match max_frames {
        Some(limit) => limit.min(total_frames),
        None => total_frames,
    };
    let sample_count = (frames as usize) * format.channels as usize;
    let mut data = Vec::with_capacity(frames as usize * format.frame_size());

    match format.bits_per_sample {
        8 => {
            // Stored unsigned in the container; hound hands back signed
            for sample in reader.samples::<i8>().take(sample_count) {
                let s = sample.map_err(|e| corrupt(path, e))?;
                data.push((s as i16 + 128) as u8);
            }
        }
        16 => {
            for sample in reader.samples::<i16>().take(sample_count) {
                let s = sample.map_err(|e| corrupt(path, e))?;
                data.extend_from_slice(&s.to_le_bytes());
            }
        }
        24 => {
            for sample in reader.samples::<i32>().take(sample_count) {
                let s = sample.map_err(|e| corrupt(path, e))?;
                data.extend_from_slice(&s.to_le_bytes()[..3]);
            }
        }
        32 => {
            for sample in reader.samples::<i32>().take(sample_count) {
                let s = sample.map_err(|e| corrupt(path, e))?;
                data.extend_from_slice(&s.to_le_bytes());
            }
        }
        bits => {
            return Err(FuseError::Unsupported {
                path: path.display().to_string(),
                reason: format!("{}-bit integer audio", bits),
            });
        }
    }

    debug!(
        "read {} frames ({} bytes) from {}",
        frames,
        data.len(),
        path.display()
    );
    Ok(PcmBuffer::new(format, data))
}

/// Write a full WAV container atomically
///
/// The container is written to `<path>.tmp` in the same directory and
/// renamed into place on success, replacing any pre-existing file. On any
/// failure the temporary file is removed and the destination is untouched.
/// Returns the byte size of the written file.
pub fn write_atomic(path: &Path, buffer: &PcmBuffer) -> Result<u64> {
    let format = *buffer.format();
    if format.big_endian {
        return Err(FuseError::Unsupported {
            path: path.display().to_string(),
            reason: "big-endian PCM cannot be stored in a WAV container".to_string(),
        });
    }

    let tmp = tmp_path(path);
    debug!("writing temporary container {}", tmp.display());

    if let Err(e) = write_container(&tmp, buffer) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(FuseError::Io(e));
    }

    debug!("renamed into place: {}", path.display());
    Ok(fs::metadata(path)?.len())
}

/// Sibling temporary path for an atomic write (`<path>.tmp`)
fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

fn write_container(tmp: &Path, buffer: &PcmBuffer) -> Result<()> {
    let format = *buffer.format();
    let mut writer =
        WavWriter::create(tmp, format.to_spec()).map_err(|e| wav_error(tmp, e))?;

    let data = buffer.data();
    match format.bits_per_sample {
        8 => {
            for &byte in data {
                writer
                    .write_sample((byte as i16 - 128) as i8)
                    .map_err(|e| wav_error(tmp, e))?;
            }
        }
        16 => {
            for chunk in data.chunks_exact(2) {
                let s = i16::from_le_bytes([chunk[0], chunk[1]]);
                writer.write_sample(s).map_err(|e| wav_error(tmp, e))?;
            }
        }
        24 => {
            for chunk in data.chunks_exact(3) {
                // Sign-extend the 3-byte sample into an i32 for hound
                let s = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], 0]) << 8 >> 8;
                writer.write_sample(s).map_err(|e| wav_error(tmp, e))?;
            }
        }
        32 => {
            for chunk in data.chunks_exact(4) {
                let s = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                writer.write_sample(s).map_err(|e| wav_error(tmp, e))?;
            }
        }
        bits => {
            return Err(FuseError::Unsupported {
                path: tmp.display().to_string(),
                reason: format!("{}-bit integer audio", bits),
            });
        }
    }

    writer.finalize().map_err(|e| wav_error(tmp, e))?;
    Ok(())
}

/// Open a WAV file and reject anything that is not integer PCM
fn open_checked(path: &Path) -> Result<WavReader<std::io::BufReader<fs::File>>> {
    let reader = WavReader::open(path).map_err(|e| wav_error(path, e))?;
    let spec = reader.spec();

    if spec.sample_format != WavSampleFormat::Int {
        return Err(FuseError::Unsupported {
            path: path.display().to_string(),
            reason: "non-integer PCM encoding".to_string(),
        });
    }
    if !matches!(spec.bits_per_sample, 8 | 16 | 24 | 32) {
        return Err(FuseError::Unsupported {
            path: path.display().to_string(),
            reason: format!("{}-bit integer audio", spec.bits_per_sample),
        });
    }

    Ok(reader)
}

/// Map hound errors onto wavfuse error kinds
fn wav_error(path: &Path, err: hound::Error) -> FuseError {
    let path_str = path.display().to_string();
    match err {
        hound::Error::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            FuseError::Corrupt {
                path: path_str,
                reason: "unexpected end of file".to_string(),
            }
        }
        hound::Error::IoError(e) => FuseError::Io(e),
        hound::Error::Unsupported => FuseError::Unsupported {
            path: path_str,
            reason: "unsupported container features".to_string(),
        },
        other => FuseError::Corrupt {
            path: path_str,
            reason: other.to_string(),
        },
    }
}

fn corrupt(path: &Path, err: hound::Error) -> FuseError {
    match err {
        hound::Error::IoError(e) if e.kind() != std::io::ErrorKind::UnexpectedEof => {
            FuseError::Io(e)
        }
        other => FuseError::Corrupt {
            path: path.display().to_string(),
            reason: other.to_string(),
        },
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const MONO_16: SampleFormat = SampleFormat {
        sample_rate: 44100,
        channels: 1,
        bits_per_sample: 16,
        big_endian: false,
    };

    fn write_test_wav(path: &Path, format: SampleFormat, samples: &[i16]) {
        let mut writer = WavWriter::create(path, format.to_spec()).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_partial_frame_dropped() {
        let format = SampleFormat {
            channels: 2,
            ..MONO_16
        };
        // 2 ch x 16-bit = 4-byte frames; 10 bytes = 2 frames + 2 stray bytes
        let buffer = PcmBuffer::new(format, vec![0u8; 10]);
        assert_eq!(buffer.len(), 8);
        assert_eq!(buffer.frame_count(), 2);
    }

    #[test]
    fn test_probe_reports_format_and_frames() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("probe.wav");
        write_test_wav(&path, MONO_16, &[0i16; 441]);

        let info = probe(&path).unwrap();
        assert_eq!(info.format, MONO_16);
        assert_eq!(info.frame_count, 441);
        assert!((info.duration_secs() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_probe_missing_file_is_io_failure() {
        let err = probe(Path::new("/nonexistent/missing.wav")).unwrap_err();
        assert_eq!(err.error_code(), "IO_FAILURE");
    }

    #[test]
    fn test_probe_truncated_header_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trunc.wav");
        // A valid RIFF prefix cut off mid-header
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(b"RIFF\x24\x00\x00\x00WAVEfmt ").unwrap();
        drop(f);

        let err = probe(&path).unwrap_err();
        assert!(
            matches!(err, FuseError::Corrupt { .. } | FuseError::Unsupported { .. }),
            "got {:?}",
            err
        );
    }

    #[test]
    fn test_read_frames_full_and_bounded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("read.wav");
        let samples: Vec<i16> = (0..100).collect();
        write_test_wav(&path, MONO_16, &samples);

        let full = read_frames(&path, None).unwrap();
        assert_eq!(full.frame_count(), 100);
        assert_eq!(full.data()[0..2], 0i16.to_le_bytes());
        assert_eq!(full.data()[198..200], 99i16.to_le_bytes());

        let bounded = read_frames(&path, Some(10)).unwrap();
        assert_eq!(bounded.frame_count(), 10);
        assert_eq!(bounded.data(), &full.data()[..20]);
    }

    #[test]
    fn test_write_atomic_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let samples: Vec<i16> = vec![100, -200, 32767, -32768];
        let mut data = Vec::new();
        for s in &samples {
            data.extend_from_slice(&s.to_le_bytes());
        }
        let buffer = PcmBuffer::new(MONO_16, data.clone());

        let bytes = write_atomic(&path, &buffer).unwrap();
        assert!(bytes > data.len() as u64); // header + data

        let back = read_frames(&path, None).unwrap();
        assert_eq!(back.data(), &data[..]);
        // No stray temporary left behind
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_write_atomic_missing_directory_leaves_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone").join("out.wav");
        let buffer = PcmBuffer::new(MONO_16, vec![0u8; 4]);

        assert!(write_atomic(&path, &buffer).is_err());
        assert!(!path.exists());
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_read_rejects_float_wav() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: WavSampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.5f32).unwrap();
        writer.finalize().unwrap();

        let err = read_frames(&path, None).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED");
    }
}
