//! Sample format tags and their byte-level conversion rules.

/// Tagged sample encoding carried by a [`crate::frame::Frame`].
///
/// All multi-byte encodings are canonically little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    /// Signed 8-bit PCM.
    Int8,
    /// Signed 16-bit PCM, little-endian.
    Int16,
    /// Signed 24-bit PCM, packed 3 bytes per sample, little-endian.
    Int24,
    /// Signed 32-bit PCM, little-endian.
    Int32,
    /// 32-bit IEEE float, nominally in `[-1.0, 1.0]`.
    Float32,
}

impl AudioFormat {
    /// Size in bytes of a single (mono) sample in this format.
    #[must_use]
    pub const fn sample_size_bytes(self) -> usize {
        match self {
            AudioFormat::Int8 => 1,
            AudioFormat::Int16 => 2,
            AudioFormat::Int24 => 3,
            AudioFormat::Int32 | AudioFormat::Float32 => 4,
        }
    }
}

/// Converts a native-format interleaved byte buffer into `f32` samples in
/// `[-1.0, 1.0]`, the inverse of the `to_pcm16_le` rules in §4.1.
///
/// Trailing bytes that don't form a whole sample are dropped.
#[must_use]
pub fn pcm_to_float32(format: AudioFormat, bytes: &[u8]) -> Vec<f32> {
    let size = format.sample_size_bytes();
    let n = bytes.len() / size;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let chunk = &bytes[i * size..i * size + size];
        let sample = match format {
            AudioFormat::Int8 => (chunk[0] as i8) as f32 / 127.0,
            AudioFormat::Int16 => i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32767.0,
            AudioFormat::Int24 => {
                let raw = i32::from(chunk[0]) | (i32::from(chunk[1]) << 8) | (i32::from(chunk[2]) << 16);
                let signed = (raw << 8) >> 8;
                signed as f32 / 8_388_607.0
            }
            AudioFormat::Int32 => {
                i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f32 / 2_147_483_647.0
            }
            AudioFormat::Float32 => f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
        };
        out.push(sample.clamp(-1.0, 1.0));
    }
    out
}

/// Converts `f32` samples in `[-1.0, 1.0]` back into the given native PCM format.
#[must_use]
pub fn float32_to_pcm(format: AudioFormat, samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * format.sample_size_bytes());
    for &s in samples {
        let s = s.clamp(-1.0, 1.0);
        match format {
            AudioFormat::Int8 => out.push((s * 127.0).round() as i8 as u8),
            AudioFormat::Int16 => out.extend_from_slice(&((s * 32767.0).round() as i16).to_le_bytes()),
            AudioFormat::Int24 => {
                let v = (s * 8_388_607.0).round() as i32;
                out.push((v & 0xFF) as u8);
                out.push(((v >> 8) & 0xFF) as u8);
                out.push(((v >> 16) & 0xFF) as u8);
            }
            AudioFormat::Int32 => {
                out.extend_from_slice(&((s as f64 * 2_147_483_647.0).round() as i32).to_le_bytes());
            }
            AudioFormat::Float32 => out.extend_from_slice(&s.to_le_bytes()),
        }
    }
    out
}

/// Converts a native-format interleaved byte buffer to signed 16-bit
/// little-endian, per the exact rules of §4.1.
///
/// If `bytes.len()` is not a multiple of the source sample size, the trailing
/// partial sample is dropped (caller should log a warning).
#[must_use]
pub fn to_pcm16_le(format: AudioFormat, bytes: &[u8]) -> Vec<u8> {
    let size = format.sample_size_bytes();
    let n = bytes.len() / size;
    let mut out = Vec::with_capacity(n * 2);
    for i in 0..n {
        let chunk = &bytes[i * size..i * size + size];
        let v16: i16 = match format {
            AudioFormat::Int16 => i16::from_le_bytes([chunk[0], chunk[1]]),
            AudioFormat::Float32 => {
                let f = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]).clamp(-1.0, 1.0);
                round_ties_even(f * 32767.0) as i16
            }
            AudioFormat::Int8 => ((chunk[0] as i8) as i16).saturating_mul(256),
            AudioFormat::Int24 => {
                let raw = i32::from(chunk[0]) | (i32::from(chunk[1]) << 8) | (i32::from(chunk[2]) << 16);
                let signed = (raw << 8) >> 8;
                (signed >> 8) as i16
            }
            AudioFormat::Int32 => {
                let v = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                (v >> 16) as i16
            }
        };
        out.extend_from_slice(&v16.to_le_bytes());
    }
    out
}

/// Rounds to the nearest integer, breaking ties to even (banker's rounding),
/// as required for FLOAT32 → INT16 conversion.
#[must_use]
pub fn round_ties_even(x: f32) -> f64 {
    let x = f64::from(x);
    let floor = x.floor();
    let diff = x - floor;
    if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else if (floor as i64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Every INT16 sample survives `pcm_to_float32` → `float32_to_pcm`
        /// exactly, per the round-trip invariant (`x.to_float32().to_int16_le()
        /// == x.payload`). `i16::MIN` has no symmetric counterpart once clamped
        /// into `[-1.0, 1.0]` (`-32768 / 32767` overshoots `-1.0`), so it is the
        /// one value excluded here; see DESIGN.md's scale-factor entry.
        #[test]
        fn int16_round_trips_exactly(raw in any::<i16>()) {
            prop_assume!(raw != i16::MIN);
            let bytes = raw.to_le_bytes();
            let floats = pcm_to_float32(AudioFormat::Int16, &bytes);
            let back = float32_to_pcm(AudioFormat::Int16, &floats);
            prop_assert_eq!(i16::from_le_bytes([back[0], back[1]]), raw);
        }
    }

    #[test]
    fn int16_identity() {
        let bytes = 1234i16.to_le_bytes().to_vec();
        assert_eq!(to_pcm16_le(AudioFormat::Int16, &bytes), bytes);
    }

    #[test]
    fn float32_round_trip_within_lsb() {
        let samples = [0.5f32, -0.25, 0.999, -0.999];
        for &s in &samples {
            let pcm = float32_to_pcm(AudioFormat::Float32, &[s]);
            let pcm16 = to_pcm16_le(AudioFormat::Float32, &pcm);
            let back = pcm_to_float32(AudioFormat::Int16, &pcm16)[0];
            assert!((back - s).abs() <= 1.0 / 32768.0 + 1e-6);
        }
    }

    #[test]
    fn ties_even_rounds_half_to_even() {
        assert_eq!(round_ties_even(0.5), 0.0);
        assert_eq!(round_ties_even(1.5), 2.0);
        assert_eq!(round_ties_even(2.5), 2.0);
    }

    #[test]
    fn int8_sign_extend_and_scale() {
        let bytes = [(-1i8) as u8];
        let out = to_pcm16_le(AudioFormat::Int8, &bytes);
        assert_eq!(i16::from_le_bytes([out[0], out[1]]), -256);
    }
}
