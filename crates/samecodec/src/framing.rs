//! SAME message framing
//!
//! The [`Framer`] assembles the demodulator's byte stream into
//! [`Message`]s. It searches for the `ZCZC` start-of-header
//! marker, accumulates header text into a bounded buffer, and
//! hands terminated headers to the message model for parsing.
//! The end-of-message marker `NNNN` is recognized on a parallel
//! path and reported as an event; it never halts the framer,
//! because a live stream carries many messages.
//!
//! SAME transmissions repeat each burst three times. The framer
//! suppresses re-emission of an identical header (or `NNNN`)
//! within a short window of stream time, so callers see each
//! message once.

use arrayvec::ArrayVec;

#[cfg(not(test))]
use log::{debug, info, warn};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as info;
#[cfg(test)]
use std::println as warn;

use crate::message::{self, Message};
use crate::waveform::MAX_MESSAGE_LENGTH;

/// SAME/EAS message framer
///
/// Bytes enter through [`input()`](Framer::input), along with the
/// demodulator's bit clock. When the demodulator reports losing
/// (or re-acquiring) synchronization, call
/// [`flush()`](Framer::flush): a header cut off mid-transmission
/// is emitted as a partial message rather than dropped, because
/// callers should see that *something* was heard.
#[derive(Clone, Debug)]
pub struct Framer {
    state: State,

    // most recently emitted text and the bit clock at emission
    last_emit: Option<(String, u64)>,

    // suppress re-emission of identical text within this many bits
    dedup_window_bits: u64,
}

// Framer state
#[derive(Clone, Debug)]
enum State {
    // Slide a four-byte window over the stream, watching for the
    // ZCZC or NNNN marker
    Searching { window: u32 },

    // Collect header text until the terminating dash
    Accumulating { buf: ArrayVec<u8, MAX_MESSAGE_LENGTH> },
}

impl Framer {
    /// New framer
    ///
    /// `dedup_window_bits` is the span of stream time, measured in
    /// bit periods, within which a repeated identical header is
    /// treated as a protocol retransmission and suppressed. See
    /// [`Framer::default_dedup_window_bits`].
    pub fn new(dedup_window_bits: u64) -> Self {
        Self {
            state: State::searching(),
            last_emit: None,
            dedup_window_bits,
        }
    }

    /// Default duplicate-suppression window, in bit periods
    ///
    /// Wide enough to cover three maximum-length bursts with their
    /// one-second gaps, with margin; about thirty seconds of
    /// stream time.
    pub fn default_dedup_window_bits() -> u64 {
        16_000
    }

    /// Reset to initial conditions, forgetting emission history
    pub fn reset(&mut self) {
        self.state = State::searching();
        self.last_emit = None;
    }

    /// Handle one received byte
    ///
    /// `bit_clock` is the demodulator's lifetime bit count; it
    /// orders emissions for duplicate suppression. Returns a
    /// message if this byte completed one.
    pub fn input(&mut self, byte: u8, bit_clock: u64) -> Option<Message> {
        match &mut self.state {
            State::Searching { window } => {
                *window = (*window << 8) | byte as u32;
                if *window == PREFIX_START_WORD {
                    debug!("framer: header start at bit {}", bit_clock);
                    let mut buf = ArrayVec::new();
                    buf.try_extend_from_slice(message::PREFIX_MESSAGE_START.as_bytes())
                        .expect(PANIC_BUFFER);
                    self.state = State::Accumulating { buf };
                    None
                } else if *window == PREFIX_END_WORD {
                    *window = 0;
                    self.emit(Message::EndOfMessage, bit_clock)
                } else {
                    None
                }
            }

            State::Accumulating { buf } => {
                if !byte.is_ascii() {
                    // the demodulator never produces these; treat
                    // direct misuse as noise
                    debug!("framer: non-ASCII byte 0x{:02x} in header; discarded", byte);
                    self.state = State::searching();
                    return None;
                }

                if buf.try_push(byte).is_err() {
                    // no terminator within the length bound: noise
                    warn!(
                        "framer: header exceeded {} bytes without terminating; discarded",
                        MAX_MESSAGE_LENGTH
                    );
                    self.state = State::searching();
                    return None;
                }

                if byte != b'-' {
                    return None;
                }

                // every dash is a candidate terminator
                let text = std::str::from_utf8(buf.as_slice()).expect(PANIC_ASCII);
                if !message::is_complete_header(text) {
                    return None;
                }

                let msg = Message::parse(text);
                self.state = State::searching();
                self.emit(msg, bit_clock)
            }
        }
    }

    /// Flush on loss (or re-acquisition) of byte synchronization
    ///
    /// If a header was being accumulated, whatever was recovered
    /// is emitted as a partial message, provided there is enough
    /// of it to be worth reporting. The framer resumes searching
    /// either way.
    pub fn flush(&mut self, bit_clock: u64) -> Option<Message> {
        let state = std::mem::replace(&mut self.state, State::searching());
        match state {
            State::Accumulating { buf } if buf.len() >= MIN_PARTIAL_LENGTH => {
                let text = std::str::from_utf8(buf.as_slice()).expect(PANIC_ASCII);
                info!("framer: sync lost mid-header; flushing \"{}\"", text);
                self.emit(Message::parse(text), bit_clock)
            }
            _ => None,
        }
    }

    // Emit a message, unless it repeats the previous emission
    // within the duplicate-suppression window
    fn emit(&mut self, msg: Message, bit_clock: u64) -> Option<Message> {
        if let Some((last_text, last_clock)) = &self.last_emit {
            let is_repeat = last_text == msg.as_str()
                && bit_clock.saturating_sub(*last_clock) < self.dedup_window_bits;
            if is_repeat {
                debug!(
                    "framer: suppressing retransmission of \"{}\" at bit {}",
                    msg.as_str(),
                    bit_clock
                );
                // a fresh retransmission extends the window
                self.last_emit = Some((msg.as_str().to_owned(), bit_clock));
                return None;
            }
        }

        info!("framer: message at bit {}: \"{}\"", bit_clock, msg.as_str());
        self.last_emit = Some((msg.as_str().to_owned(), bit_clock));
        Some(msg)
    }
}

impl State {
    fn searching() -> Self {
        State::Searching { window: 0 }
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new(Self::default_dedup_window_bits())
    }
}

const PREFIX_START_WORD: u32 = u32::from_be_bytes([b'Z', b'C', b'Z', b'C']);
const PREFIX_END_WORD: u32 = u32::from_be_bytes([b'N', b'N', b'N', b'N']);

// Do not report flushed fragments shorter than this; four marker
// bytes plus a dash and a partial field carry no information
const MIN_PARTIAL_LENGTH: usize = 8;

const PANIC_BUFFER: &str = "header buffer shorter than its prefix";
const PANIC_ASCII: &str = "framer admitted non-ASCII bytes";

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "ZCZC-WXR-TOR-024031+0030-3191423-PHILLYWX-";

    // feed a string byte-by-byte, advancing the clock one byte at
    // a time; returns emitted messages and the final clock
    fn feed(framer: &mut Framer, text: &str, mut clock: u64) -> (Vec<Message>, u64) {
        let mut out = Vec::new();
        for byte in text.bytes() {
            clock += 8;
            out.extend(framer.input(byte, clock));
        }
        (out, clock)
    }

    #[test]
    fn test_single_header() {
        let mut framer = Framer::default();

        // leading garbage must not confuse the prefix search
        let (msgs, _clock) = feed(&mut framer, "X1@Q", 0);
        assert!(msgs.is_empty());

        let (msgs, _clock) = feed(&mut framer, HEADER, 100);
        assert_eq!(1, msgs.len());
        let hdr = msgs[0].header().expect("expected complete header");
        assert_eq!(HEADER, hdr.as_str());
    }

    #[test]
    fn test_triple_header_dedup() {
        let mut framer = Framer::default();

        let mut clock = 0;
        let mut all = Vec::new();
        for _i in 0..3 {
            let (msgs, c) = feed(&mut framer, HEADER, clock);
            all.extend(msgs);
            // about one second of silence between bursts
            clock = c + 521;
        }

        assert_eq!(1, all.len(), "retransmissions must be suppressed");
    }

    #[test]
    fn test_repeat_outside_window_emits_again() {
        let mut framer = Framer::default();

        let (msgs, clock) = feed(&mut framer, HEADER, 0);
        assert_eq!(1, msgs.len());

        // a genuinely new transmission of the same message, long
        // after the retransmission window
        let (msgs, _clock) = feed(
            &mut framer,
            HEADER,
            clock + Framer::default_dedup_window_bits() + 1,
        );
        assert_eq!(1, msgs.len());
    }

    #[test]
    fn test_end_of_message() {
        let mut framer = Framer::default();

        let mut clock = 0;
        let mut all = Vec::new();
        for _i in 0..3 {
            let (msgs, c) = feed(&mut framer, "NNNN", clock);
            all.extend(msgs);
            clock = c + 521;
        }

        assert_eq!(vec![Message::EndOfMessage], all);
    }

    #[test]
    fn test_partial_flush_on_desync() {
        let mut framer = Framer::default();

        let (msgs, clock) = feed(&mut framer, "ZCZC-WXR-TOR-0240", 0);
        assert!(msgs.is_empty());

        let msg = framer.flush(clock).expect("expected partial");
        match msg {
            Message::Partial(part) => {
                assert_eq!(Some("WXR"), part.originator.as_deref());
                assert_eq!(Some("TOR"), part.event.as_deref());
            }
            _ => unreachable!(),
        }

        // the framer searches again afterwards
        let (msgs, _clock) = feed(&mut framer, HEADER, clock + 1000);
        assert_eq!(1, msgs.len());
    }

    #[test]
    fn test_tiny_fragment_discarded() {
        let mut framer = Framer::default();
        let (msgs, clock) = feed(&mut framer, "ZCZC-W", 0);
        assert!(msgs.is_empty());
        assert_eq!(None, framer.flush(clock));
    }

    #[test]
    fn test_unterminated_header_discarded() {
        let mut framer = Framer::default();

        // no terminator before the buffer bound: treated as noise
        let junk: String = std::iter::repeat('A').take(MAX_MESSAGE_LENGTH + 8).collect();
        let (msgs, clock) = feed(&mut framer, "ZCZC-", 0);
        assert!(msgs.is_empty());
        let (msgs, clock) = feed(&mut framer, &junk, clock);
        assert!(msgs.is_empty());

        // and decoding continues normally
        let (msgs, _clock) = feed(&mut framer, HEADER, clock);
        assert_eq!(1, msgs.len());
    }

    #[test]
    fn test_internal_dashes_do_not_terminate() {
        const TWO_LOCATIONS: &str = "ZCZC-WXR-SVR-024031-024033+0100-3191500-PHILLYWX-";

        let mut framer = Framer::default();
        let (msgs, _clock) = feed(&mut framer, TWO_LOCATIONS, 0);
        assert_eq!(1, msgs.len());
        assert_eq!(TWO_LOCATIONS, msgs[0].as_str());
    }

    #[test]
    fn test_header_then_eom() {
        let mut framer = Framer::default();
        let (mut msgs, clock) = feed(&mut framer, HEADER, 0);
        let (more, _clock) = feed(&mut framer, "NNNN", clock + 2000);
        msgs.extend(more);

        assert_eq!(2, msgs.len());
        assert!(msgs[0].header().is_some());
        assert_eq!(Message::EndOfMessage, msgs[1]);
    }
}
