//! Full decoder chain
//!
//! The [`SameDecoder`] composes the Layer 1 demodulator and the
//! Layer 2 framer behind two entry points:
//!
//! * [`decode_buffer()`](SameDecoder::decode_buffer) for a
//!   complete recording (an uploaded file, say), with input and
//!   processing ceilings so pathological input cannot exhaust
//!   the host; and
//!
//! * [`process()`](SameDecoder::process) for live streams fed
//!   chunk by chunk. All demodulation and framing state lives
//!   inside the decoder value, so a chunked stream decodes
//!   bit-exactly like a contiguous one.
//!
//! A `SameDecoder` *is* a streaming session. Chunks of one
//! stream must arrive in order through one decoder; Rust's
//! `&mut` receiver enforces the exclusive access this requires.
//! Independent streams get independent decoders and may run in
//! parallel freely. Dropping the decoder is session teardown.

#[cfg(not(test))]
use log::{debug, info};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as info;

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::demod::{DemodEvent, FskDemodulator};
use crate::framing::Framer;
use crate::message::Message;

/// Error decoding an audio buffer
///
/// These cover the one-shot entry point only. Desynchronization,
/// noise, and partially-recovered headers are *not* errors; see
/// [`Message::Partial`].
#[derive(Error, Clone, Debug, PartialEq)]
pub enum DecodeErr {
    /// The input buffer contains no samples
    #[error("audio buffer is empty")]
    EmptyAudio,

    /// The input is longer than the decoder's duration ceiling
    #[error("audio is {got:.1} s long; the decode ceiling is {limit:.1} s")]
    AudioTooLong {
        /// Input duration, seconds
        got: f32,
        /// Configured ceiling, seconds
        limit: f32,
    },

    /// Decoding exceeded the wall-clock processing budget
    #[error("decode exceeded its {budget:.1} s processing budget")]
    Timeout {
        /// Configured budget, seconds
        budget: f32,
    },
}

/// A complete SAME decoder session
///
/// Create one with a [`SameDecoderBuilder`](crate::SameDecoderBuilder):
///
/// ```
/// use samecodec::{Message, SameDecoderBuilder};
///
/// let mut decoder = SameDecoderBuilder::new(22050).build();
///
/// // one-shot: a complete buffer of f32 mono PCM at 22050 Hz
/// let audio = vec![0.0f32; 22050];
/// let messages = decoder.decode_buffer(&audio).unwrap();
/// assert!(messages.is_empty()); // silence carries no messages
/// ```
#[derive(Clone, Debug)]
pub struct SameDecoder {
    demod: FskDemodulator,
    framer: Framer,
    input_rate: u32,
    input_sample_counter: u64,
    max_input_samples: u64,
    processing_budget: Duration,
}

impl SameDecoder {
    pub(crate) fn assemble(
        demod: FskDemodulator,
        framer: Framer,
        input_rate: u32,
        max_input_samples: u64,
        processing_budget: Duration,
    ) -> Self {
        Self {
            demod,
            framer,
            input_rate,
            input_sample_counter: 0,
            max_input_samples,
            processing_budget,
        }
    }

    /// Input sampling rate (Hz)
    ///
    /// Samples fed to this decoder must be at this rate; resample
    /// upstream if the source differs.
    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Lifetime count of input samples processed
    pub fn input_sample_counter(&self) -> u64 {
        self.input_sample_counter
    }

    /// Clear all demodulation and framing state
    ///
    /// Afterward the decoder behaves like a freshly-built one.
    pub fn reset(&mut self) {
        self.demod.reset();
        self.framer.reset();
        self.input_sample_counter = 0;
    }

    /// Feed a chunk of a live stream
    ///
    /// Accepts f32 mono PCM at [`input_rate()`](Self::input_rate)
    /// and returns the messages completed during this chunk,
    /// typically zero or one. Chunks may be any size, including
    /// empty. State persists between calls; chunking is
    /// indistinguishable from a contiguous stream.
    ///
    /// Losing synchronization mid-stream never ends the session:
    /// a partially-received header is reported as
    /// [`Message::Partial`] and the decoder resumes searching.
    pub fn process(&mut self, samples: &[f32]) -> Vec<Message> {
        let mut out = Vec::new();
        for &sample in samples {
            self.input_sample_counter = self.input_sample_counter.wrapping_add(1);
            match self.demod.input(sample) {
                Some(DemodEvent::Byte(byte)) => {
                    out.extend(self.framer.input(byte, self.demod.bit_clock()));
                }
                Some(DemodEvent::SyncAcquired) | Some(DemodEvent::SyncLost) => {
                    out.extend(self.framer.flush(self.demod.bit_clock()));
                }
                None => {}
            }
        }

        if !out.is_empty() {
            info!(
                "decoder [{:<12}]: {} message(s) this chunk",
                self.input_sample_counter,
                out.len()
            );
        }
        out
    }

    /// Decode one complete audio buffer
    ///
    /// Resets the session, then processes the whole buffer and
    /// returns every message found, in order. A header still
    /// being accumulated when the buffer ends is flushed as a
    /// partial message.
    ///
    /// Fails *before* processing if the buffer is empty or longer
    /// than the configured duration ceiling, and *during*
    /// processing if the wall-clock budget is exhausted. No
    /// partial results are fabricated on failure.
    pub fn decode_buffer(&mut self, samples: &[f32]) -> Result<Vec<Message>, DecodeErr> {
        if samples.is_empty() {
            return Err(DecodeErr::EmptyAudio);
        }
        if samples.len() as u64 > self.max_input_samples {
            return Err(DecodeErr::AudioTooLong {
                got: samples.len() as f32 / self.input_rate as f32,
                limit: self.max_input_samples as f32 / self.input_rate as f32,
            });
        }

        self.reset();
        debug!(
            "decoder: one-shot decode of {:.1} s of audio",
            samples.len() as f32 / self.input_rate as f32
        );

        let deadline = Instant::now() + self.processing_budget;
        let mut out = Vec::new();
        for chunk in samples.chunks(Self::BUDGET_CHECK_INTERVAL) {
            if Instant::now() > deadline {
                return Err(DecodeErr::Timeout {
                    budget: self.processing_budget.as_secs_f32(),
                });
            }
            out.extend(self.process(chunk));
        }

        // end of recording: anything still accumulating is as
        // partial as it will ever be
        out.extend(self.framer.flush(self.demod.bit_clock()));
        Ok(out)
    }

    // Samples between wall-clock budget checks
    const BUDGET_CHECK_INTERVAL: usize = 16384;
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::builder::SameDecoderBuilder;
    use crate::message::MessageBuilder;
    use crate::modulator::{Modulator, ModulatorConfig};
    use crate::samecodes::Originator;

    const FS: u32 = 22050;
    const TORNADO: &str = "ZCZC-WXR-TOR-024031+0030-3191423-PHILLYWX-";

    fn tornado_header() -> crate::message::MessageHeader {
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

    fn tornado_signal(include_eom: bool) -> Vec<f32> {
        let modulator = Modulator::new(
            ModulatorConfig::new()
                .with_sample_rate(FS)
                .with_end_of_message(include_eom),
        );
        modulator.modulate(&tornado_header())
    }

    // fixed-seed xorshift; deterministic noise without an RNG crate
    struct Noise(u32);

    impl Noise {
        fn next(&mut self) -> f32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            self.0 = x;
            (x as f32 / u32::MAX as f32) * 2.0 - 1.0
        }
    }

    #[test]
    fn test_round_trip_clean() {
        let header = tornado_header();
        let audio = tornado_signal(false);

        let mut decoder = SameDecoderBuilder::new(FS).build();
        let messages = decoder.decode_buffer(&audio).expect("decode failed");

        assert_eq!(1, messages.len(), "got: {:?}", messages);
        let decoded = messages[0].header().expect("expected complete message");

        assert_eq!(TORNADO, decoded.as_str());
        assert_eq!(header.as_str(), decoded.as_str());
        assert_eq!(Originator::WeatherService, decoded.originator());
        assert_eq!("WXR", decoded.originator_str());
        assert_eq!("TOR", decoded.event_str());
        assert_eq!(
            vec!["024031"],
            decoded.location_str_iter().collect::<Vec<_>>()
        );
        assert_eq!((0, 30), decoded.valid_duration_fields());
        assert_eq!((319, 14, 23), decoded.issue_daytime_fields());
        assert_eq!("PHILLYWX", decoded.callsign());
    }

    #[test]
    fn test_round_trip_with_eom() {
        let audio = tornado_signal(true);

        let mut decoder = SameDecoderBuilder::new(FS).build();
        let messages = decoder.decode_buffer(&audio).expect("decode failed");

        assert_eq!(2, messages.len(), "got: {:?}", messages);
        assert_eq!(TORNADO, messages[0].header().expect("not a header").as_str());
        assert_eq!(Message::EndOfMessage, messages[1]);
    }

    #[test]
    fn test_silence_yields_nothing() {
        let mut decoder = SameDecoderBuilder::new(FS).build();
        let silence = vec![0.0f32; FS as usize * 3];
        let messages = decoder.decode_buffer(&silence).expect("decode failed");
        assert!(messages.is_empty());
    }

    #[test]
    fn test_empty_buffer_rejected() {
        let mut decoder = SameDecoderBuilder::new(FS).build();
        assert_eq!(Err(DecodeErr::EmptyAudio), decoder.decode_buffer(&[]));
    }

    #[test]
    fn test_overlong_buffer_rejected() {
        let mut decoder = SameDecoderBuilder::new(FS)
            .with_max_input(2.0)
            .build();
        let audio = vec![0.0f32; FS as usize * 3];
        match decoder.decode_buffer(&audio) {
            Err(DecodeErr::AudioTooLong { got, limit }) => {
                assert!(got > limit);
            }
            other => panic!("expected AudioTooLong, got {:?}", other),
        }
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        let audio = tornado_signal(false);

        let mut decoder = SameDecoderBuilder::new(FS).build();
        let expect = decoder.decode_buffer(&audio).expect("decode failed");
        assert_eq!(1, expect.len());

        for chunk_size in [160usize, 1024, 4410, 1 << 16] {
            let mut session = SameDecoderBuilder::new(FS).build();
            let mut messages = Vec::new();
            for chunk in audio.chunks(chunk_size) {
                messages.extend(session.process(chunk));
            }
            assert_eq!(expect, messages, "chunk size {}", chunk_size);
        }
    }

    #[test]
    fn test_noise_burst_then_message() {
        let mut audio = Vec::new();
        let mut noise = Noise(0x2545_f491);
        for _i in 0..8000 {
            audio.push(noise.next() * 0.5);
        }
        audio.extend(tornado_signal(false));

        let mut decoder = SameDecoderBuilder::new(FS).build();
        let messages = decoder.decode_buffer(&audio).expect("decode failed");

        // noise may cost a burst or generate partial fragments,
        // but the message itself must come through, exactly once
        let headers: Vec<_> = messages.iter().filter_map(|m| m.header()).collect();
        assert_eq!(1, headers.len(), "got: {:?}", messages);
        assert_eq!(TORNADO, headers[0].as_str());
    }

    #[test]
    fn test_sessions_are_independent() {
        let audio = tornado_signal(false);

        // interleave a live decode with an unrelated session
        // chewing on silence; the bystander must not disturb it
        let mut live = SameDecoderBuilder::new(FS).build();
        let mut bystander = SameDecoderBuilder::new(FS).build();

        let mut messages = Vec::new();
        for chunk in audio.chunks(4410) {
            messages.extend(live.process(chunk));
            let _ = bystander.process(&vec![0.0f32; 4410]);
        }

        assert_eq!(1, messages.len());
        assert_eq!(TORNADO, messages[0].header().expect("not a header").as_str());
        assert_eq!(0, bystander.process(&[]).len());
    }

    #[test]
    fn test_reset_between_buffers() {
        let audio = tornado_signal(false);
        let mut decoder = SameDecoderBuilder::new(FS).build();

        // decode_buffer resets internally, so the same decoder
        // serves repeated one-shot requests
        for _i in 0..2 {
            let messages = decoder.decode_buffer(&audio).expect("decode failed");
            assert_eq!(1, messages.len());
        }
    }
}
