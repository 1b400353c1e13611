//! AFSK modulator for SAME
//!
//! Converts a SAME header into mark/space tone audio. The
//! modulator is pure and deterministic: the same message always
//! produces bit-identical samples, and no state outlives a call.
//!
//! Each transmission is structured as
//!
//! ```txt
//! silence, 3 × [ preamble | header | silence ] [, 3 × [ preamble | NNNN | silence ] ]
//! ```
//!
//! Tone phase is carried continuously across bit boundaries
//! within a burst; a phase discontinuity would put a wideband
//! click into the waveform and corrupt demodulation.

use crate::message::{MessageDecodeErr, MessageHeader};
use crate::waveform;

/// Modulator configuration
///
/// The defaults produce the standard SAME waveform at the
/// conventional 43750 Hz encoder rate, where one bit is exactly
/// 84 samples and both tones complete a whole number of cycles
/// per bit.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct ModulatorConfig {
    sample_rate: u32,
    mark_hz: f64,
    space_hz: f64,
    baud_hz: f64,
    amplitude: f32,
    leading_silence_secs: f32,
    burst_gap_secs: f32,
    preamble_len: usize,
    burst_repeats: usize,
    include_eom: bool,
}

impl ModulatorConfig {
    /// New configuration with standard SAME parameters
    pub fn new() -> Self {
        Self {
            sample_rate: 43750,
            mark_hz: waveform::FSK_MARK_HZ,
            space_hz: waveform::FSK_SPACE_HZ,
            baud_hz: waveform::BAUD_HZ,
            amplitude: 0.8,
            leading_silence_secs: 0.5,
            burst_gap_secs: 1.0,
            preamble_len: waveform::PREAMBLE_LEN,
            burst_repeats: waveform::BURST_REPEATS,
            include_eom: false,
        }
    }

    /// Set the output sampling rate (Hz)
    ///
    /// Any rate comfortably above twice the mark frequency works;
    /// bit boundaries are computed cumulatively, so rates that do
    /// not divide the baud rate evenly accumulate no timing drift.
    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Set the peak tone amplitude, `0.0 ..= 1.0`
    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = f32::clamp(amplitude, 0.0, 1.0);
        self
    }

    /// Set the silence duration before the first burst (seconds)
    pub fn with_leading_silence(mut self, secs: f32) -> Self {
        self.leading_silence_secs = f32::max(secs, 0.0);
        self
    }

    /// Set the silence duration after each burst (seconds)
    ///
    /// The protocol calls for one second between bursts.
    pub fn with_burst_gap(mut self, secs: f32) -> Self {
        self.burst_gap_secs = f32::max(secs, 0.0);
        self
    }

    /// Set the number of preamble bytes before each burst
    pub fn with_preamble_len(mut self, len: usize) -> Self {
        self.preamble_len = len;
        self
    }

    /// Also transmit the end-of-message (`NNNN`) bursts
    ///
    /// When enabled, the three `NNNN` bursts follow the header
    /// bursts directly, with no voice message in between.
    pub fn with_end_of_message(mut self, include: bool) -> Self {
        self.include_eom = include;
        self
    }

    /// Output sampling rate (Hz)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Peak tone amplitude
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }
}

impl Default for ModulatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// SAME AFSK modulator
///
/// ```
/// use samecodec::{MessageBuilder, Modulator, ModulatorConfig};
///
/// let hdr = MessageBuilder::new()
///     .with_event("RWT")
///     .with_location_str("024031").unwrap()
///     .with_duration(0, 15)
///     .with_issue_daytime(319, 17, 0)
///     .with_callsign("PHILLYWX")
///     .build().unwrap();
///
/// let modulator = Modulator::new(ModulatorConfig::new());
/// let audio = modulator.modulate(&hdr);
/// assert!(!audio.is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct Modulator {
    cfg: ModulatorConfig,
}

impl Modulator {
    /// New modulator with the given configuration
    pub fn new(cfg: ModulatorConfig) -> Self {
        Self { cfg }
    }

    /// Modulate a validated header
    ///
    /// Returns mono PCM samples in `[-1.0, 1.0]` at the configured
    /// sampling rate: leading silence, then the header burst
    /// repeated three times, then the `NNNN` bursts if configured.
    pub fn modulate(&self, header: &MessageHeader) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.estimated_len(header.as_str().len()));
        self.silence(&mut out, self.cfg.leading_silence_secs);
        self.append_bursts(header.as_str().as_bytes(), &mut out);
        if self.cfg.include_eom {
            self.append_bursts(waveform::EOM_TOKEN.as_bytes(), &mut out);
        }
        out
    }

    /// Validate and modulate wire-format header text
    ///
    /// The text must match the strict SAME grammar; nothing is
    /// generated for a malformed message.
    pub fn modulate_str(&self, text: &str) -> Result<Vec<f32>, MessageDecodeErr> {
        let header = MessageHeader::new(text)?;
        Ok(self.modulate(&header))
    }

    /// Modulate a standalone end-of-message transmission
    ///
    /// The `NNNN` token, with preamble, repeated three times.
    pub fn end_of_message(&self) -> Vec<f32> {
        let mut out = Vec::new();
        self.silence(&mut out, self.cfg.leading_silence_secs);
        self.append_bursts(waveform::EOM_TOKEN.as_bytes(), &mut out);
        out
    }

    /// The configuration in use
    pub fn config(&self) -> &ModulatorConfig {
        &self.cfg
    }

    // Append `burst_repeats` bursts of preamble + payload, each
    // followed by the inter-burst gap
    fn append_bursts(&self, payload: &[u8], out: &mut Vec<f32>) {
        let mut bytes = Vec::with_capacity(self.cfg.preamble_len + payload.len());
        bytes.resize(self.cfg.preamble_len, waveform::PREAMBLE);
        bytes.extend_from_slice(payload);

        for _i in 0..self.cfg.burst_repeats {
            self.append_tones(&bytes, out);
            self.silence(out, self.cfg.burst_gap_secs);
        }
    }

    // Synthesize one burst of continuous-phase AFSK
    fn append_tones(&self, bytes: &[u8], out: &mut Vec<f32>) {
        const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

        let fs = self.cfg.sample_rate as f64;
        let samples_per_bit = fs / self.cfg.baud_hz;

        let mut phase = 0.0f64;
        let mut emitted: usize = 0;
        for (bit_index, bit) in waveform::bit_iter(bytes).enumerate() {
            let freq = if bit { self.cfg.mark_hz } else { self.cfg.space_hz };
            let rad_per_sample = TWO_PI * freq / fs;

            // cumulative rounding keeps the bit clock exact at any rate
            let bit_end = ((bit_index + 1) as f64 * samples_per_bit).round() as usize;
            while emitted < bit_end {
                phase += rad_per_sample;
                if phase > TWO_PI {
                    phase -= TWO_PI;
                }
                out.push(f64::sin(phase) as f32 * self.cfg.amplitude);
                emitted += 1;
            }
        }
    }

    fn silence(&self, out: &mut Vec<f32>, secs: f32) {
        let n = (secs as f64 * self.cfg.sample_rate as f64).round() as usize;
        out.extend(std::iter::repeat(0.0f32).take(n));
    }

    fn estimated_len(&self, payload_len: usize) -> usize {
        let bits = (self.cfg.preamble_len + payload_len + 8) * 8;
        let samples_per_bit = self.cfg.sample_rate as f64 / self.cfg.baud_hz;
        let burst = (bits as f64 * samples_per_bit) as usize
            + (self.cfg.burst_gap_secs as f64 * self.cfg.sample_rate as f64) as usize;
        (self.cfg.leading_silence_secs as f64 * self.cfg.sample_rate as f64) as usize
            + burst * self.cfg.burst_repeats * 2
    }
}

/// Convert float samples to 16-bit PCM
///
/// Samples are clamped to `[-1.0, 1.0]` first.
pub fn samples_to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&sa| (f32::clamp(sa, -1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::message::MessageBuilder;
    use crate::samecodes::Originator;

    fn test_header() -> MessageHeader {
        MessageBuilder::new()
            .with_originator(Originator::WeatherService)
            .with_event("TOR")
            .with_location_str("024031")
            .unwrap()
            .with_duration(0, 30)
            .with_issue_daytime(319, 14, 23)
            .with_callsign("PHILLYWX")
            .build()
            .expect("bad test header")
    }

    #[test]
    fn test_modulate_deterministic() {
        let modulator = Modulator::new(ModulatorConfig::new());
        let hdr = test_header();

        let one = modulator.modulate(&hdr);
        let two = modulator.modulate(&hdr);
        assert_eq!(one, two);
        assert!(!one.is_empty());
    }

    #[test]
    fn test_modulate_length() {
        // at 43750 Hz one bit is exactly 84 samples, so lengths
        // are exactly predictable
        let cfg = ModulatorConfig::new();
        let modulator = Modulator::new(cfg);
        let hdr = test_header();

        let nbits = (cfg.preamble_len + hdr.as_str().len()) * 8;
        let burst = nbits * 84 + 43750;
        let expect = (0.5f64 * 43750.0).round() as usize + 3 * burst;

        assert_eq!(expect, modulator.modulate(&hdr).len());
    }

    #[test]
    fn test_modulate_phase_continuity() {
        let cfg = ModulatorConfig::new();
        let modulator = Modulator::new(cfg);
        let audio = modulator.modulate(&test_header());

        // within the preamble tone, adjacent samples can differ by
        // at most amplitude * 2*sin(pi*f_mark/fs); allow some slack
        let leading = (0.5f64 * 43750.0).round() as usize;
        let max_step = 0.25f32;
        for pair in audio[leading..leading + 2000].windows(2) {
            assert!(
                (pair[1] - pair[0]).abs() <= max_step,
                "phase discontinuity: {} -> {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_modulate_str_rejects_invalid() {
        let modulator = Modulator::new(ModulatorConfig::new());
        assert!(modulator.modulate_str("ZCZC-WXR-TOR-garbage").is_err());
        assert!(modulator
            .modulate_str("ZCZC-WXR-TOR-024031+0030-3191423-PHILLYWX-")
            .is_ok());
    }

    #[test]
    fn test_eom_is_shorter_than_header() {
        let modulator = Modulator::new(ModulatorConfig::new());
        let eom = modulator.end_of_message();
        let hdr = modulator.modulate(&test_header());
        assert!(!eom.is_empty());
        assert!(eom.len() < hdr.len());
    }

    #[test]
    fn test_samples_to_i16() {
        let pcm = samples_to_i16(&[0.0, 1.0, -1.0, 2.0]);
        assert_eq!(0, pcm[0]);
        assert_eq!(i16::MAX, pcm[1]);
        assert_eq!(-i16::MAX, pcm[2]);
        assert_eq!(i16::MAX, pcm[3]);
    }
}
