//! Sliding sample window and correlation arithmetic
//!
//! The [`Window`] keeps the most recent N input samples in a
//! contiguous slice so the demodulator can correlate against
//! them without copying. Pushing one sample ages off the
//! oldest. The window survives chunk boundaries, which is what
//! makes streaming demodulation bit-exact with one-shot
//! demodulation.

use nalgebra::DVector;
use num_complex::Complex;
use slice_ring_buffer::SliceRingBuffer;

/// Fixed-size lookback window of audio samples
#[derive(Clone, Debug)]
pub struct Window {
    buf: SliceRingBuffer<f32>,
    len: usize,
}

impl Window {
    /// Create a window of `len` samples, zero-filled
    pub fn new(len: usize) -> Self {
        let mut buf = SliceRingBuffer::with_capacity(len);
        for _i in 0..len {
            buf.push_back(0.0f32);
        }
        Self { buf, len }
    }

    /// Reset to zero initial conditions
    pub fn reset(&mut self) {
        self.buf.clear();
        for _i in 0..self.len {
            self.buf.push_back(0.0f32);
        }
    }

    /// Window length
    pub fn len(&self) -> usize {
        self.len
    }

    /// Shift one sample onto the window
    ///
    /// The new sample becomes the last element of
    /// [`as_slice()`](Window::as_slice); the oldest sample ages off.
    pub fn push(&mut self, sample: f32) {
        let _ = self.buf.pop_front();
        self.buf.push_back(sample);
    }

    /// Current window contents, oldest sample first
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        self.buf.as_slice()
    }
}

impl AsRef<[f32]> for Window {
    fn as_ref(&self) -> &[f32] {
        self.as_slice()
    }
}

/// Tone energy of `window` at the frequency of the cisoid `template`
///
/// Computes `|Σ window[n]·template[n]|²`. The squared magnitude of
/// the complex correlation is insensitive to the carrier phase of
/// the incoming tone, so no phase alignment with the transmitter
/// is needed.
pub fn tone_energy(window: &[f32], template: &DVector<Complex<f32>>) -> f32 {
    let mut acc = Complex::new(0.0f32, 0.0f32);
    for (&sample, tap) in window.iter().zip(template.iter()) {
        acc += tap.scale(sample);
    }
    acc.norm_sqr()
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_window() {
        let mut wind = Window::new(4);
        assert_eq!(4, wind.len());
        assert_eq!(&[0.0f32, 0.0, 0.0, 0.0], wind.as_slice());

        wind.push(1.0);
        assert_eq!(&[0.0f32, 0.0, 0.0, 1.0], wind.as_slice());

        wind.push(2.0);
        wind.push(3.0);
        wind.push(4.0);
        wind.push(5.0);
        assert_eq!(&[2.0f32, 3.0, 4.0, 5.0], wind.as_slice());

        wind.reset();
        assert_eq!(4, wind.len());
        assert_eq!(&[0.0f32, 0.0, 0.0, 0.0], wind.as_slice());
    }

    #[test]
    fn test_tone_energy_discriminates() {
        const FS: u32 = 22050;

        let (mark, space) = crate::waveform::correlation_templates(FS);

        // synthesize one bit of pure mark tone
        let tone: Vec<f32> = (0..mark.len())
            .map(|n| {
                f32::sin(
                    2.0 * std::f32::consts::PI
                        * (crate::waveform::FSK_MARK_HZ / FS as f64) as f32
                        * n as f32,
                )
            })
            .collect();

        let at_mark = tone_energy(&tone, &mark);
        let at_space = tone_energy(&tone, &space);
        assert!(at_mark > 10.0 * at_space);
    }

    #[test]
    fn test_tone_energy_phase_invariant() {
        const FS: u32 = 22050;

        let (mark, _) = crate::waveform::correlation_templates(FS);

        // the same tone at two different carrier phases measures
        // (nearly) the same energy
        let energy_at = |phase: f32| {
            let tone: Vec<f32> = (0..mark.len())
                .map(|n| {
                    f32::sin(
                        2.0 * std::f32::consts::PI
                            * (crate::waveform::FSK_MARK_HZ / FS as f64) as f32
                            * n as f32
                            + phase,
                    )
                })
                .collect();
            tone_energy(&tone, &mark)
        };

        let e0 = energy_at(0.0);
        let e1 = energy_at(std::f32::consts::FRAC_PI_2);
        assert_approx_eq!(e0 / e1, 1.0f32, 0.05);
    }
}
