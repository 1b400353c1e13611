//! # samecodec: SAME/EAS Modulation and Demodulation
//!
//! This crate encodes and decodes
//! [Specific Area Message Encoding](https://en.wikipedia.org/wiki/Specific_Area_Message_Encoding)
//! (SAME) messages, the digital headers which bracket Emergency
//! Alert System audio messages. It contains both directions of
//! the codec:
//!
//! * a [`Modulator`] which turns a validated SAME header into
//!   audio-frequency-shift-keyed (AFSK) PCM samples; and
//!
//! * a [`SameDecoder`] which recovers headers from audio, either
//!   from a complete buffer or incrementally from a live stream.
//!
//! ## Disclaimer
//!
//! This crate has not been certified as a weather radio receiver
//! or for any other purpose, and transmitting SAME audio over the
//! air is tightly regulated. Keep generated audio away from
//! anything that might take it seriously.
//!
//! ## Encoding
//!
//! Build a message from structured fields, then modulate it:
//!
//! ```
//! use samecodec::{MessageBuilder, Modulator, ModulatorConfig, Originator};
//!
//! let hdr = MessageBuilder::new()
//!     .with_originator(Originator::WeatherService)
//!     .with_event("TOR")
//!     .with_location_str("024031").unwrap()
//!     .with_duration(0, 30)
//!     .with_issue_daytime(319, 14, 23)
//!     .with_callsign("PHILLYWX")
//!     .build().unwrap();
//!
//! assert_eq!("ZCZC-WXR-TOR-024031+0030-3191423-PHILLYWX-", hdr.as_str());
//!
//! let audio = Modulator::new(ModulatorConfig::new()).modulate(&hdr);
//! assert!(!audio.is_empty());
//! ```
//!
//! Every field is validated before any audio is produced; see
//! [`MessageBuildErr`] for what can go wrong.
//!
//! ## Decoding
//!
//! The decoder accepts f32 mono PCM at its configured sampling
//! rate (22050 Hz is the conventional choice). Obtaining that
//! audio — from a sound card, a software-defined radio, or a
//! file — is outside the scope of this crate, as is resampling:
//! if your source runs at another rate, resample before feeding
//! the decoder.
//!
//! ```
//! use samecodec::{Message, SameDecoderBuilder};
//!
//! let mut decoder = SameDecoderBuilder::new(22050).build();
//!
//! // feed chunks of any size as they arrive
//! # let chunk = vec![0.0f32; 4096];
//! for msg in decoder.process(&chunk) {
//!     match msg {
//!         Message::Header(hdr) => println!("alert: {}", hdr),
//!         Message::Partial(part) => println!("heard something: {}", part.raw),
//!         Message::EndOfMessage => println!("end of alert"),
//!     }
//! }
//! ```
//!
//! Each `SameDecoder` is one decoding session and owns all of its
//! demodulation state. Feed one stream per decoder, in order;
//! run as many decoders in parallel as you like.
//!
//! Noisy audio is normal. Headers that terminate but fail strict
//! validation, and headers cut off by a loss of synchronization,
//! are reported as [`Message::Partial`] rather than dropped.
//! Losing synchronization itself is silent: the decoder simply
//! resumes searching for the preamble.
//!
//! ## Crate features
//!
//! * `chrono` *(default)*: issue-time calculations as true UTC
//!   timestamps. If enabled, `chrono` becomes part of this
//!   crate's public API.

mod builder;
mod demod;
mod filter;
mod framing;
mod location;
mod message;
mod modulator;
mod receiver;
mod samecodes;
mod waveform;

pub use builder::SameDecoderBuilder;
pub use demod::{DemodEvent, DemodTuning, FskDemodulator};
pub use framing::Framer;
pub use location::{
    InvalidLocationCode, LocationCode, LocationLookup, LocationRecord, MemoryLocationTable,
    Subdivision,
};
pub use message::{
    Message, MessageBuildErr, MessageBuilder, MessageDecodeErr, MessageHeader, PartialHeader,
    MAX_LOCATIONS,
};
pub use modulator::{samples_to_i16, Modulator, ModulatorConfig};
pub use receiver::{DecodeErr, SameDecoder};
pub use samecodes::{event_display_name, Originator};
pub use waveform::{BAUD_HZ, FSK_MARK_HZ, FSK_SPACE_HZ, MAX_MESSAGE_LENGTH, PREAMBLE};

#[cfg(feature = "chrono")]
pub use message::InvalidDateErr;
