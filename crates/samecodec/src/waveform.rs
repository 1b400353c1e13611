//! SAME waveform parameters and correlation templates

use nalgebra::DVector;
use num_complex::Complex;

/// Mark frequency (Hz), binary one
///
/// The exact protocol value is 2083⅓ Hz.
pub const FSK_MARK_HZ: f64 = 6250.0 / 3.0;

/// Space frequency (Hz), binary zero
pub const FSK_SPACE_HZ: f64 = 1562.5;

/// Baud rate (Hz)
///
/// The exact protocol value is 520⅚ bits per second.
pub const BAUD_HZ: f64 = 3125.0 / 6.0;

/// Preamble byte
///
/// The preamble byte is repeated sixteen times before every
/// SAME burst. It contains many bit transitions so that bit
/// and byte synchronization are acquired quickly.
pub const PREAMBLE: u8 = 0xab;

/// Number of preamble bytes before each burst
pub const PREAMBLE_LEN: usize = 16;

/// Number of times each SAME burst is transmitted
pub const BURST_REPEATS: usize = 3;

/// End-of-message token
pub const EOM_TOKEN: &str = "NNNN";

/// Maximum SAME header length, in bytes
pub const MAX_MESSAGE_LENGTH: usize = 268;

/// SAME bit period at the given sampling rate, in fractional samples
pub fn samples_per_bit(fs: u32) -> f64 {
    fs as f64 / BAUD_HZ
}

/// Correlation template length at the given sampling rate
///
/// The demodulator correlates over a window of approximately
/// one bit period.
pub fn correlation_length(fs: u32) -> usize {
    f64::floor(samples_per_bit(fs)) as usize
}

/// Generate mark and space correlation templates
///
/// Returns a tuple of (`mark`, `space`) complex cisoid templates
/// for the given input sampling rate `fs`. Correlating a sample
/// window against one of these templates and taking the squared
/// magnitude measures the tone energy at that frequency,
/// regardless of the transmitter's carrier phase.
pub fn correlation_templates(fs: u32) -> (DVector<Complex<f32>>, DVector<Complex<f32>>) {
    let npoints = correlation_length(fs);
    let mark = cisoid(npoints, (FSK_MARK_HZ / fs as f64) as f32);
    let space = cisoid(npoints, (FSK_SPACE_HZ / fs as f64) as f32);
    (mark, space)
}

// Complex exponential at a fixed frequency
//
// `freq_fs` is the frequency as a fraction of the sampling rate.
fn cisoid(points: usize, freq_fs: f32) -> DVector<Complex<f32>> {
    DVector::from_iterator(
        points,
        (0..points).map(|n| {
            Complex::from_polar(1.0f32, 2.0 * std::f32::consts::PI * freq_fs * n as f32)
        }),
    )
}

/// Iterate over the bits of `bytes` in SAME transmission order
///
/// SAME transmits each byte least significant bit first.
pub fn bit_iter(bytes: &[u8]) -> impl Iterator<Item = bool> + '_ {
    bytes
        .iter()
        .flat_map(|byte| (0..8).map(move |bit| (byte >> bit) & 0x01 == 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_correlation_length() {
        // one bit is exactly 84 samples at the native encoder rate
        assert_eq!(84, correlation_length(43750));

        // and a fractional 42.336 samples at the decoder rate
        assert_eq!(42, correlation_length(22050));
        assert_approx_eq!(42.336, samples_per_bit(22050), 1e-3);
    }

    #[test]
    fn test_cisoid_is_unit_magnitude() {
        let (mark, space) = correlation_templates(22050);
        assert_eq!(42, mark.len());
        assert_eq!(42, space.len());
        for tap in mark.iter().chain(space.iter()) {
            assert_approx_eq!(1.0f32, tap.norm(), 1e-6);
        }
    }

    #[test]
    fn test_bit_iter() {
        // 0xAB = 1010_1011, transmitted LSB first
        const EXPECT: &[bool] = &[true, true, false, true, false, true, false, true];

        let bits: Vec<bool> = bit_iter(&[PREAMBLE]).collect();
        assert_eq!(EXPECT, bits.as_slice());

        assert_eq!(16, bit_iter(&[0x00, 0xff]).count());
    }
}
