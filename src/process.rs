//! PCM signal transforms
//!
//! Peak detection, peak normalization, linear crossfade and loop
//! replication over raw interleaved sample bytes. Transforms never mutate
//! their inputs; each produces a new owned buffer.
//!
//! Sample-level interpretation is implemented for 16-bit PCM only. Buffers
//! with other bit depths are passed through unchanged: `peak_level` reports
//! 0.0 and `normalize` returns its input. [`SampleCodec::for_format`] makes
//! that branch explicit by returning `None` for unsupported depths.

use log::debug;

use crate::wav::{PcmBuffer, SampleFormat};

/// Peaks below this fraction of full scale are treated as silence
pub const SILENCE_FLOOR: f64 = 0.001;

/// Full-scale amplitude for 16-bit signed samples
const FULL_SCALE_16: f64 = 32767.0;

// ============================================================================
// Sample codec
// ============================================================================

/// Endianness-aware 16-bit sample codec
///
/// Shared by peak detection, normalization and crossfade so the byte-order
/// branch lives in exactly one place.
#[derive(Debug, Clone, Copy)]
pub struct SampleCodec {
    big_endian: bool,
}

impl SampleCodec {
    /// Bytes consumed per decoded sample
    pub const STEP: usize = 2;

    /// Codec for a format, or `None` when the bit depth has no sample-level
    /// interpretation here (such buffers pass through transforms unchanged)
    pub fn for_format(format: &SampleFormat) -> Option<Self> {
        if format.bits_per_sample == 16 {
            Some(SampleCodec {
                big_endian: format.big_endian,
            })
        } else {
            None
        }
    }

    /// Decode one signed 16-bit sample at `offset`
    #[inline]
    pub fn decode(&self, data: &[u8], offset: usize) -> i16 {
        let pair = [data[offset], data[offset + 1]];
        if self.big_endian {
            i16::from_be_bytes(pair)
        } else {
            i16::from_le_bytes(pair)
        }
    }

    /// Encode one signed 16-bit sample at `offset`
    #[inline]
    pub fn encode(&self, value: i16, data: &mut [u8], offset: usize) {
        let pair = if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
        data[offset] = pair[0];
        data[offset + 1] = pair[1];
    }
}

// ============================================================================
// Transforms
// ============================================================================

/// Peak amplitude as a fraction of full scale
///
/// Scans every sample; returns 0.0 for empty buffers and for bit depths
/// without a codec.
pub fn peak_level(buffer: &PcmBuffer) -> f64 {
    let codec = match SampleCodec::for_format(buffer.format()) {
        Some(c) => c,
        None => return 0.0,
    };

    let data = buffer.data();
    let mut max_amplitude: i32 = 0;
    let mut offset = 0;
    while offset + SampleCodec::STEP <= data.len() {
        let amplitude = (codec.decode(data, offset) as i32).abs();
        if amplitude > max_amplitude {
            max_amplitude = amplitude;
        }
        offset += SampleCodec::STEP;
    }

    max_amplitude as f64 / FULL_SCALE_16
}

/// Scale a buffer so its peak reaches `target_peak` (0.0 to 1.0)
///
/// Quiet buffers are only ever amplified: when the measured peak is already
/// at or above target the input is returned unchanged rather than attenuated.
/// That matches the tool's long-standing behavior; change here if downward
/// normalization is ever wanted. Buffers with a peak under [`SILENCE_FLOOR`]
/// are treated as silence and returned unchanged.
pub fn normalize(buffer: PcmBuffer, target_peak: f64) -> PcmBuffer {
    let codec = match SampleCodec::for_format(buffer.format()) {
        Some(c) => c,
        None => {
            debug!(
                "normalize: {}-bit depth has no codec, passing through",
                buffer.format().bits_per_sample
            );
            return buffer;
        }
    };

    let current_peak = peak_level(&buffer);
    if current_peak < SILENCE_FLOOR {
        debug!("normalize: buffer is effectively silent, skipping");
        return buffer;
    }

    let mut scale = target_peak / current_peak;
    if scale > 1.0 {
        // Never push the peak past full scale
        scale = scale.min(1.0 / current_peak);
    } else {
        // Already at or above target
        return buffer;
    }

    let format = *buffer.format();
    let mut data = buffer.into_data();
    let mut offset = 0;
    while offset + SampleCodec::STEP <= data.len() {
        let sample = codec.decode(&data, offset) as f64 * scale;
        let clamped = (sample as i32).clamp(-32768, 32767) as i16;
        codec.encode(clamped, &mut data, offset);
        offset += SampleCodec::STEP;
    }

    debug!("normalize: scaled by {:.4} toward peak {:.3}", scale, target_peak);
    PcmBuffer::new(format, data)
}

/// Linear crossfade between the tail of one clip and the head of the next
///
/// Output length is the shorter of the two inputs. The fade factor ramps
/// 0 to 1 across the region in byte-offset units (stepping by one sample),
/// and the mix `a*(1-f) + b*f` is truncated toward zero; both details match
/// the historical output bit-for-bit and must not be "improved" casually.
///
/// For bit depths without a codec the head buffer's prefix is returned
/// unblended; callers normally skip the fade entirely in that case.
pub fn crossfade(tail_a: &PcmBuffer, head_b: &PcmBuffer) -> PcmBuffer {
    let format = *tail_a.format();
    let fade_len = tail_a.len().min(head_b.len());

    let codec = match SampleCodec::for_format(&format) {
        Some(c) => c,
        None => {
            debug!(
                "crossfade: {}-bit depth has no codec, hard cut",
                format.bits_per_sample
            );
            return PcmBuffer::new(format, head_b.data()[..fade_len].to_vec());
        }
    };

    let a = tail_a.data();
    let b = head_b.data();
    let mut out = vec![0u8; fade_len];

    let mut offset = 0;
    while offset + SampleCodec::STEP <= fade_len {
        let fade_factor = offset as f32 / fade_len as f32;

        let s_a = codec.decode(a, offset) as f32;
        let s_b = codec.decode(b, offset) as f32;
        let mixed = (s_a * (1.0 - fade_factor) + s_b * fade_factor) as i32;
        let clamped = mixed.clamp(-32768, 32767) as i16;

        codec.encode(clamped, &mut out, offset);
        offset += SampleCodec::STEP;
    }

    PcmBuffer::new(format, out)
}

/// Replicate a buffer `count` times back to back
///
/// `count <= 1` returns the input unchanged.
pub fn loop_repeat(buffer: PcmBuffer, count: u32) -> PcmBuffer {
    if count <= 1 {
        return buffer;
    }

    let format = *buffer.format();
    let data = buffer.into_data();
    let mut out = Vec::with_capacity(data.len() * count as usize);
    for _ in 0..count {
        out.extend_from_slice(&data);
    }

    debug!("loop_repeat: {} copies, {} bytes total", count, out.len());
    PcmBuffer::new(format, out)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MONO_16: SampleFormat = SampleFormat {
        sample_rate: 44100,
        channels: 1,
        bits_per_sample: 16,
        big_endian: false,
    };

    fn buffer_from_samples(samples: &[i16]) -> PcmBuffer {
        let mut data = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            data.extend_from_slice(&s.to_le_bytes());
        }
        PcmBuffer::new(MONO_16, data)
    }

    fn samples_of(buffer: &PcmBuffer) -> Vec<i16> {
        buffer
            .data()
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect()
    }

    #[test]
    fn test_peak_of_silence_is_zero() {
        let buffer = buffer_from_samples(&[0; 512]);
        assert_eq!(peak_level(&buffer), 0.0);
        assert_eq!(peak_level(&buffer_from_samples(&[])), 0.0);
    }

    #[test]
    fn test_peak_of_full_scale_is_one() {
        let buffer = buffer_from_samples(&[0, 1000, 32767, -500]);
        assert!((peak_level(&buffer) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_peak_is_endianness_aware() {
        let be = SampleFormat {
            big_endian: true,
            ..MONO_16
        };
        // 0x7FFF big-endian
        let buffer = PcmBuffer::new(be, vec![0x7F, 0xFF]);
        assert!((peak_level(&buffer) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_amplifies_to_target() {
        // Peak 0.25 of full scale, target 0.5: expect 2x gain
        let buffer = buffer_from_samples(&[8192, -4096, 0]);
        let result = normalize(buffer, 0.5);
        let samples = samples_of(&result);
        assert_eq!(samples[0], 16383); // truncated 8192 * (0.5 / (8192/32767))
        let peak = peak_level(&result);
        assert!(peak <= 0.5 + 1e-4, "peak {} overshoots target", peak);
    }

    #[test]
    fn test_normalize_skips_silence() {
        let buffer = buffer_from_samples(&[1, -1, 0]);
        let result = normalize(buffer.clone(), 0.8);
        assert_eq!(result, buffer);
    }

    #[test]
    fn test_normalize_never_attenuates() {
        // Peak already above target: buffer returned unchanged
        let buffer = buffer_from_samples(&[32000, -16000]);
        let result = normalize(buffer.clone(), 0.5);
        assert_eq!(result, buffer);
    }

    #[test]
    fn test_normalize_at_target_is_identity() {
        let buffer = buffer_from_samples(&[16383, 100]);
        let target = peak_level(&buffer);
        let result = normalize(buffer.clone(), target);
        assert_eq!(result, buffer);
    }

    #[test]
    fn test_normalize_passes_through_other_depths() {
        let format = SampleFormat {
            bits_per_sample: 24,
            ..MONO_16
        };
        let buffer = PcmBuffer::new(format, vec![1, 2, 3, 4, 5, 6]);
        let result = normalize(buffer.clone(), 0.8);
        assert_eq!(result, buffer);
        assert_eq!(peak_level(&buffer), 0.0);
    }

    #[test]
    fn test_crossfade_endpoints() {
        let a = buffer_from_samples(&[10000; 100]);
        let b = buffer_from_samples(&[-10000; 100]);
        let faded = crossfade(&a, &b);
        let samples = samples_of(&faded);

        assert_eq!(samples.len(), 100);
        // Start of the ramp is pure A
        assert_eq!(samples[0], 10000);
        // End of the ramp is within one step of pure B
        assert!((samples[99] as i32 + 10000).abs() <= 200, "got {}", samples[99]);
        // Midpoint is near zero
        assert!(samples[50].abs() <= 200, "got {}", samples[50]);
    }

    #[test]
    fn test_crossfade_length_is_min_of_inputs() {
        let a = buffer_from_samples(&[1; 80]);
        let b = buffer_from_samples(&[2; 30]);
        assert_eq!(crossfade(&a, &b).len(), 60);
        assert_eq!(crossfade(&b, &a).len(), 60);
    }

    #[test]
    fn test_crossfade_clamps_to_range() {
        let a = buffer_from_samples(&[32767; 10]);
        let b = buffer_from_samples(&[32767; 10]);
        let faded = crossfade(&a, &b);
        for s in samples_of(&faded) {
            assert!(s <= 32767);
        }
    }

    #[test]
    fn test_loop_repeat_identity_and_replication() {
        let buffer = buffer_from_samples(&[1, 2, 3]);
        assert_eq!(loop_repeat(buffer.clone(), 1), buffer);

        let doubled = loop_repeat(buffer.clone(), 2);
        assert_eq!(doubled.len(), buffer.len() * 2);
        let mut expected = buffer.data().to_vec();
        expected.extend_from_slice(buffer.data());
        assert_eq!(doubled.data(), &expected[..]);

        let five = loop_repeat(buffer.clone(), 5);
        assert_eq!(five.len(), buffer.len() * 5);
    }
}
