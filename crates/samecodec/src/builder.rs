//! Decoder configuration

use std::time::Duration;

use crate::demod::{DemodTuning, FskDemodulator};
use crate::framing::Framer;
use crate::receiver::SameDecoder;
use crate::waveform;

/// Builds a SAME decoder session
///
/// The builder comes with a sensible set of default options; all
/// you really need to provide is the input sampling rate. The
/// decoder was designed to work at 22050 Hz. The defaults are
/// *not* part of this crate's API and may be revised in any minor
/// release; if you care strongly about a setting, configure it
/// here.
///
/// ```
/// use samecodec::SameDecoderBuilder;
///
/// let decoder = SameDecoderBuilder::new(22050)
///     .with_integrator_limit(10)
///     .with_dll_gain(0.5)
///     .build();
/// assert_eq!(22050, decoder.input_rate());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct SameDecoderBuilder {
    input_rate: u32,
    integrator_limit: i32,
    dll_gain: f32,
    dedup_window_secs: f32,
    max_input_secs: f32,
    processing_budget_secs: f32,
}

impl SameDecoderBuilder {
    /// New decoder builder for the given input sampling rate (Hz)
    ///
    /// Audio sampled at any other rate must be resampled to
    /// `input_rate` before it reaches the decoder.
    pub fn new(input_rate: u32) -> Self {
        Self {
            input_rate,
            integrator_limit: 10,
            dll_gain: 0.5,
            dedup_window_secs: Framer::default_dedup_window_bits() as f32
                / waveform::BAUD_HZ as f32,
            max_input_secs: 300.0,
            processing_budget_secs: 30.0,
        }
    }

    /// Build a decoder session
    ///
    /// The session is immediately ready to accept samples.
    pub fn build(&self) -> SameDecoder {
        let tuning = DemodTuning {
            integrator_limit: self.integrator_limit,
            dll_gain: self.dll_gain,
            ..DemodTuning::default()
        };
        let demod = FskDemodulator::with_tuning(self.input_rate, tuning);
        let framer = Framer::new(
            (self.dedup_window_secs as f64 * waveform::BAUD_HZ) as u64,
        );
        SameDecoder::assemble(
            demod,
            framer,
            self.input_rate,
            (self.max_input_secs as f64 * self.input_rate as f64) as u64,
            Duration::from_secs_f32(self.processing_budget_secs),
        )
    }

    /// Bit-decision integrator saturation bound
    ///
    /// Larger values ride out longer noise spikes but slow the
    /// response to genuine bit transitions. `multimon-ng` uses 10.
    pub fn with_integrator_limit(&mut self, limit: i32) -> &mut Self {
        self.integrator_limit = i32::max(limit, 1);
        self
    }

    /// DLL phase correction gain, `0.0 ..= 1.0`
    ///
    /// Controls how aggressively observed bit transitions pull
    /// the sampling phase. `multimon-ng` uses 0.5.
    pub fn with_dll_gain(&mut self, gain: f32) -> &mut Self {
        self.dll_gain = f32::clamp(gain, 0.0, 1.0);
        self
    }

    /// Duplicate-suppression window (seconds of stream time)
    ///
    /// An identical header re-received within this window is
    /// treated as one of the protocol's three retransmissions and
    /// reported only once.
    pub fn with_dedup_window(&mut self, secs: f32) -> &mut Self {
        self.dedup_window_secs = f32::max(secs, 0.0);
        self
    }

    /// One-shot decode input duration ceiling (seconds of audio)
    pub fn with_max_input(&mut self, secs: f32) -> &mut Self {
        self.max_input_secs = f32::max(secs, 0.0);
        self
    }

    /// One-shot decode wall-clock processing budget (seconds)
    ///
    /// A decode that exceeds this budget aborts with a timeout
    /// error rather than hanging. Streaming sessions are not
    /// subject to any budget.
    pub fn with_processing_budget(&mut self, secs: f32) -> &mut Self {
        self.processing_budget_secs = f32::max(secs, 0.0);
        self
    }

    /// Input sampling rate (Hz)
    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Integrator saturation bound
    pub fn integrator_limit(&self) -> i32 {
        self.integrator_limit
    }

    /// DLL phase correction gain
    pub fn dll_gain(&self) -> f32 {
        self.dll_gain
    }

    /// Duplicate-suppression window (seconds)
    pub fn dedup_window(&self) -> f32 {
        self.dedup_window_secs
    }

    /// One-shot input duration ceiling (seconds)
    pub fn max_input(&self) -> f32 {
        self.max_input_secs
    }

    /// One-shot processing budget (seconds)
    pub fn processing_budget(&self) -> f32 {
        self.processing_budget_secs
    }
}

impl Default for SameDecoderBuilder {
    fn default() -> Self {
        Self::new(22050)
    }
}
