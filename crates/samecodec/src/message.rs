//! SAME message model: grammar, validation, and (de)serialization
//!
//! A SAME header, as received "off the wire" in ASCII, looks like
//!
//! ```txt
//! ZCZC-WXR-TOR-024031+0030-3191423-PHILLYWX-
//! ```
//!
//! There are two ways to obtain a [`MessageHeader`]:
//!
//! * the encode path builds one from structured fields with a
//!   [`MessageBuilder`], which validates every field before any
//!   audio is generated; and
//!
//! * the decode path recovers text from noisy audio. Decoded text
//!   frequently has missing or corrupted fields, so the tolerant
//!   [`Message::parse`] never rejects: headers that fail the strict
//!   grammar come back as a [`PartialHeader`] carrying whatever
//!   fields could be recovered.

use std::convert::TryFrom;
use std::fmt;

#[cfg(feature = "chrono")]
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::location::LocationCode;
use crate::samecodes::Originator;
use crate::waveform::MAX_MESSAGE_LENGTH;

pub(crate) const PREFIX_MESSAGE_START: &str = "ZCZC";
pub(crate) const PREFIX_MESSAGE_END: &str = "NNNN";

/// Maximum number of location codes in one header
pub const MAX_LOCATIONS: usize = 31;

/// A decoded SAME message
///
/// Complete, structurally-valid headers decode as
/// [`Header`](Message::Header). Headers which terminated but failed
/// the strict grammar — routine with noisy radio audio — decode as
/// [`Partial`](Message::Partial) rather than being dropped. The
/// end-of-message token `NNNN` is its own variant, because a live
/// stream carries many messages and their conclusions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// A complete, structurally-valid header
    Header(MessageHeader),

    /// A header with missing or unparseable fields
    ///
    /// Never silently dropped and never a hard failure: callers
    /// should see that *something* was heard.
    Partial(PartialHeader),

    /// End of audio message (`NNNN`)
    EndOfMessage,
}

impl Message {
    /// Parse recovered header text
    ///
    /// This parse is tolerant and cannot fail. Text matching the
    /// strict SAME grammar becomes [`Message::Header`]; anything
    /// else becomes [`Message::Partial`] with whatever fields
    /// matched. Text beginning with `NNNN` is the end-of-message
    /// marker.
    pub fn parse(raw: &str) -> Message {
        if raw.starts_with(PREFIX_MESSAGE_END) {
            return Message::EndOfMessage;
        }

        match MessageHeader::new(raw) {
            Ok(hdr) => Message::Header(hdr),
            Err(_e) => Message::Partial(PartialHeader::from_raw(raw)),
        }
    }

    /// The complete header, if this message has one
    pub fn header(&self) -> Option<&MessageHeader> {
        match self {
            Message::Header(hdr) => Some(hdr),
            _ => None,
        }
    }

    /// True for the [`Partial`](Message::Partial) variant
    pub fn is_partial(&self) -> bool {
        matches!(self, Message::Partial(_))
    }

    /// Wire-format string representation
    pub fn as_str(&self) -> &str {
        match self {
            Message::Header(hdr) => hdr.as_str(),
            Message::Partial(part) => part.raw.as_str(),
            Message::EndOfMessage => PREFIX_MESSAGE_END,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

impl AsRef<str> for Message {
    #[inline]
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Error decoding a strict `MessageHeader`
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageDecodeErr {
    /// Header contains non-ASCII characters
    #[error("invalid SAME header: text contains non-ASCII characters")]
    NotAscii,

    /// Header is shorter than the minimum length for a valid message
    #[error("invalid SAME header: decoded text too short")]
    TooShort,

    /// Header does not match the general format
    #[error("invalid SAME header: text does not match required pattern")]
    Malformed,
}

/// Error building a header from structured fields
///
/// Every variant names the offending field. Build errors are
/// raised before any audio is generated.
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MessageBuildErr {
    /// Event code is not three uppercase ASCII letters
    #[error("event code \"{0}\" must be exactly three uppercase letters")]
    InvalidEvent(String),

    /// No location codes were supplied
    #[error("at least one location code is required")]
    NoLocations,

    /// Too many location codes
    #[error("at most {MAX_LOCATIONS} location codes are permitted, got {0}")]
    TooManyLocations(usize),

    /// Duration is zero or not on an allowed increment
    ///
    /// Durations up to one hour must be multiples of fifteen
    /// minutes; longer durations must be multiples of thirty.
    #[error("duration {0:02}{1:02} is not an allowed purge time increment")]
    InvalidDuration(u8, u8),

    /// Timestamp fields are out of range
    #[error("issue time {0:03}{1:02}{2:02} is not a valid JJJHHMM day/time")]
    InvalidTimestamp(u16, u8, u8),

    /// Callsign is empty, too long, or contains forbidden characters
    #[error("callsign \"{0}\" must be 1-8 characters of A-Z, 0-9, slash, or space")]
    InvalidCallsign(String),

    /// The serialized header would exceed the SAME length limit
    #[error("serialized header would be {0} characters; the limit is {MAX_MESSAGE_LENGTH}")]
    TooLong(usize),

    /// A mandatory field was never supplied to the builder
    #[error("required field \"{0}\" was not set")]
    MissingField(&'static str),
}

/// A complete, structurally-valid SAME header
///
/// Stores the canonical wire string; field accessors slice into
/// it. Immutable once built. Instances are constructed by
/// [`MessageHeader::new`] (decode path) or by a
/// [`MessageBuilder`] (encode path).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageHeader {
    // canonical text, including the leading `ZCZC-` and final `-`
    message: String,

    // start of the purge time field, at its leading `+`
    offset_time: usize,
}

impl MessageHeader {
    /// Construct from wire-format text
    ///
    /// The text must match the strict SAME grammar. Trailing
    /// garbage after the final `-` is removed. Use
    /// [`Message::parse`] for the tolerant alternative.
    pub fn new<S>(message: S) -> Result<Self, MessageDecodeErr>
    where
        S: Into<String>,
    {
        let mut message: String = message.into();
        if !message.is_ascii() {
            return Err(MessageDecodeErr::NotAscii);
        }

        let (offset_time, hdr_length) = check_header(&message)?;
        message.truncate(hdr_length);

        Ok(Self {
            message,
            offset_time,
        })
    }

    /// Canonical wire text
    pub fn as_str(&self) -> &str {
        &self.message
    }

    /// Originator code
    pub fn originator(&self) -> Originator {
        Originator::from(self.originator_str())
    }

    /// Originator code, as its three-character string
    pub fn originator_str(&self) -> &str {
        &self.message[Self::OFFSET_ORG..Self::OFFSET_ORG + 3]
    }

    /// Event code, as its three-character string
    pub fn event_str(&self) -> &str {
        &self.message[Self::OFFSET_EVT..Self::OFFSET_EVT + 3]
    }

    /// Human-readable event name, if the code is known
    pub fn event_name(&self) -> Option<&'static str> {
        crate::samecodes::event_display_name(self.event_str())
    }

    /// Iterator over location code strings
    ///
    /// Values are guaranteed to be six-digit strings, in
    /// transmission order.
    pub fn location_str_iter(&self) -> std::str::Split<'_, char> {
        self.message[Self::OFFSET_AREA_START..self.offset_time].split('-')
    }

    /// Iterator over parsed location codes
    pub fn locations(&self) -> impl Iterator<Item = LocationCode> + '_ {
        self.location_str_iter()
            .map(|s| s.parse().expect(Self::PANIC_MSG))
    }

    /// Message validity duration, as (`hours`, `minutes`)
    ///
    /// This is the purge time of the *message*, not the expected
    /// duration of the hazard.
    pub fn valid_duration_fields(&self) -> (u8, u8) {
        let dur = &self.message[self.offset_time + 1..self.offset_time + 5];
        (
            dur[0..2].parse().expect(Self::PANIC_MSG),
            dur[2..4].parse().expect(Self::PANIC_MSG),
        )
    }

    /// Message issue day and time, as (`day of year`, `hour`, `minute`)
    ///
    /// Times are UTC. Day `001` is 1 January.
    pub fn issue_daytime_fields(&self) -> (u16, u8, u8) {
        let issue = &self.message[self.offset_time + Self::OFFSET_FROMPLUS_ISSUETIME
            ..self.offset_time + Self::OFFSET_FROMPLUS_ISSUETIME + 7];
        (
            issue[0..3].parse().expect(Self::PANIC_MSG),
            issue[3..5].parse().expect(Self::PANIC_MSG),
            issue[5..7].parse().expect(Self::PANIC_MSG),
        )
    }

    /// Sending station callsign
    pub fn callsign(&self) -> &str {
        let end = self.message.len();
        &self.message[self.offset_time + Self::OFFSET_FROMPLUS_CALLSIGN..end - 1]
    }

    /// Estimated message issuance datetime (UTC)
    ///
    /// SAME headers do not carry a year. The issuance time is
    /// projected into the year of the `received` timestamp, which
    /// only needs to be within ±90 days of true UTC. An error is
    /// returned when no valid timestamp can be constructed (for
    /// example, day 366 projected into a non-leap year).
    ///
    /// Requires `chrono`.
    #[cfg(feature = "chrono")]
    pub fn issue_datetime(&self, received: &DateTime<Utc>) -> Result<DateTime<Utc>, InvalidDateErr> {
        calculate_issue_time(
            self.issue_daytime_fields(),
            (received.year(), received.ordinal()),
        )
    }

    /// Obtain the owned message String
    pub fn release(self) -> String {
        self.message
    }

    const OFFSET_ORG: usize = 5;
    const OFFSET_EVT: usize = 9;
    const OFFSET_AREA_START: usize = 13;
    const OFFSET_FROMPLUS_ISSUETIME: usize = 6;
    const OFFSET_FROMPLUS_CALLSIGN: usize = 14;
    const PANIC_MSG: &'static str = "MessageHeader validity check admitted a malformed message";
}

impl fmt::Display for MessageHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

impl AsRef<str> for MessageHeader {
    #[inline]
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for MessageHeader {
    type Error = MessageDecodeErr;

    #[inline]
    fn try_from(inp: String) -> Result<Self, Self::Error> {
        Self::new(inp)
    }
}

impl From<MessageHeader> for String {
    #[inline]
    fn from(msg: MessageHeader) -> String {
        msg.release()
    }
}

/// An invalid issuance time
#[cfg(feature = "chrono")]
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
#[error("message issuance time not valid for its receive time")]
pub struct InvalidDateErr {}

/// A header with missing or unparseable fields
///
/// Produced by the tolerant [`Message::parse`] when the strict
/// grammar does not match. Each field is present only if its
/// own pattern matched; the full recovered text is always
/// available in `raw`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartialHeader {
    /// The recovered text, as heard
    pub raw: String,

    /// Originator code, if a three-letter field was found
    pub originator: Option<String>,

    /// Event code, if a three-letter field was found
    pub event: Option<String>,

    /// Location codes which matched the six-digit pattern
    pub locations: Vec<String>,

    /// Duration field (`+HHMM`), if found
    pub duration: Option<String>,

    /// Issue time field (`JJJHHMM`), if found
    pub timestamp: Option<String>,

    /// Callsign, if a terminated final field was found
    pub callsign: Option<String>,
}

impl PartialHeader {
    /// Extract whatever fields match from recovered text
    fn from_raw(raw: &str) -> Self {
        lazy_static! {
            static ref RE_CODE: Regex = Regex::new(r"^[A-Z]{3}$").expect(PANIC_BAD_REGEX);
            static ref RE_LOCATION: Regex = Regex::new(r"^[0-9]{6}$").expect(PANIC_BAD_REGEX);
            static ref RE_DURATION: Regex = Regex::new(r"^\+[0-9]{4}").expect(PANIC_BAD_REGEX);
            static ref RE_TIMESTAMP: Regex = Regex::new(r"^[0-9]{7}$").expect(PANIC_BAD_REGEX);
        }

        let mut out = PartialHeader {
            raw: raw.to_owned(),
            ..Default::default()
        };

        // drop the ZCZC marker and walk the dash-delimited fields
        let body = raw
            .strip_prefix(PREFIX_MESSAGE_START)
            .unwrap_or(raw)
            .trim_start_matches('-');

        let mut past_duration = false;
        for (index, field) in body.split('-').enumerate() {
            // the duration rides on the last location code: `024031+0030`
            if let Some(plus) = field.find('+') {
                let (loc, dur) = field.split_at(plus);
                if RE_LOCATION.is_match(loc) {
                    out.locations.push(loc.to_owned());
                }
                if RE_DURATION.is_match(dur) {
                    out.duration = Some(dur[0..5].to_owned());
                }
                past_duration = true;
                continue;
            }

            if !past_duration {
                match index {
                    0 if RE_CODE.is_match(field) => out.originator = Some(field.to_owned()),
                    1 if RE_CODE.is_match(field) => out.event = Some(field.to_owned()),
                    _ if RE_LOCATION.is_match(field) => out.locations.push(field.to_owned()),
                    _ => {}
                }
            } else if RE_TIMESTAMP.is_match(field) {
                out.timestamp = Some(field.to_owned());
            } else if !field.is_empty()
                && field.len() <= 8
                && out.timestamp.is_some()
                && out.callsign.is_none()
            {
                out.callsign = Some(field.to_owned());
            }
        }

        out
    }
}

/// Builds a SAME header from structured fields
///
/// All fields are validated when [`build()`](MessageBuilder::build)
/// is called; nothing is emitted for an invalid message.
///
/// ```
/// use samecodec::{MessageBuilder, Originator};
///
/// let hdr = MessageBuilder::new()
///     .with_originator(Originator::WeatherService)
///     .with_event("TOR")
///     .with_location_str("024031").unwrap()
///     .with_duration(0, 30)
///     .with_issue_daytime(319, 14, 23)
///     .with_callsign("PHILLYWX")
///     .build()
///     .unwrap();
///
/// assert_eq!("ZCZC-WXR-TOR-024031+0030-3191423-PHILLYWX-", hdr.as_str());
/// ```
#[derive(Clone, Debug, Default)]
pub struct MessageBuilder {
    originator: Option<Originator>,
    event: String,
    locations: Vec<LocationCode>,
    duration: Option<(u8, u8)>,
    issue: Option<(u16, u8, u8)>,
    callsign: String,
}

impl MessageBuilder {
    /// New builder with no fields set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the originator code
    ///
    /// If never called, the originator is inferred from the event
    /// code the way broadcast encoders conventionally do: see
    /// [`Originator::for_event`].
    pub fn with_originator(mut self, originator: Originator) -> Self {
        self.originator = Some(originator);
        self
    }

    /// Set the three-letter event code
    pub fn with_event<S>(mut self, event: S) -> Self
    where
        S: Into<String>,
    {
        self.event = event.into();
        self
    }

    /// Append a location code
    pub fn with_location(mut self, location: LocationCode) -> Self {
        self.locations.push(location);
        self
    }

    /// Append a location code from its six-digit string
    pub fn with_location_str(
        self,
        location: &str,
    ) -> Result<Self, crate::location::InvalidLocationCode> {
        let location = location.parse()?;
        Ok(self.with_location(location))
    }

    /// Set the message validity duration
    pub fn with_duration(mut self, hours: u8, minutes: u8) -> Self {
        self.duration = Some((hours, minutes));
        self
    }

    /// Set the issue day-of-year and UTC time
    pub fn with_issue_daytime(mut self, day: u16, hour: u8, minute: u8) -> Self {
        self.issue = Some((day, hour, minute));
        self
    }

    /// Set the issue time from a UTC datetime
    ///
    /// Requires `chrono`.
    #[cfg(feature = "chrono")]
    pub fn with_issue_datetime(self, when: &DateTime<Utc>) -> Self {
        self.with_issue_daytime(when.ordinal() as u16, when.hour() as u8, when.minute() as u8)
    }

    /// Set the sending station callsign
    ///
    /// Minus signs are replaced with slashes, per the SAME
    /// convention, since `-` is the field delimiter.
    pub fn with_callsign<S>(mut self, callsign: S) -> Self
    where
        S: Into<String>,
    {
        self.callsign = callsign.into().replace('-', "/");
        self
    }

    /// Validate all fields and serialize the canonical header
    pub fn build(&self) -> Result<MessageHeader, MessageBuildErr> {
        if self.event.len() != 3 || !self.event.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(MessageBuildErr::InvalidEvent(self.event.clone()));
        }

        if self.locations.is_empty() {
            return Err(MessageBuildErr::NoLocations);
        }
        if self.locations.len() > MAX_LOCATIONS {
            return Err(MessageBuildErr::TooManyLocations(self.locations.len()));
        }

        let (hours, minutes) = self
            .duration
            .ok_or(MessageBuildErr::MissingField("duration"))?;
        let total_minutes = hours as u32 * 60 + minutes as u32;
        let allowed = total_minutes > 0
            && hours <= 99
            && minutes < 60
            && if total_minutes <= 60 {
                total_minutes % 15 == 0
            } else {
                total_minutes % 30 == 0
            };
        if !allowed {
            return Err(MessageBuildErr::InvalidDuration(hours, minutes));
        }

        let (day, hour, minute) = self.issue.ok_or(MessageBuildErr::MissingField("issue"))?;
        if day < 1 || day > 366 || hour > 23 || minute > 59 {
            return Err(MessageBuildErr::InvalidTimestamp(day, hour, minute));
        }

        if self.callsign.is_empty()
            || self.callsign.len() > 8
            || !self
                .callsign
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'/' || b == b' ')
        {
            return Err(MessageBuildErr::InvalidCallsign(self.callsign.clone()));
        }

        let originator = self
            .originator
            .unwrap_or_else(|| Originator::for_event(&self.event));

        let mut text = format!("ZCZC-{}-{}", originator.as_str(), self.event);
        for location in &self.locations {
            text.push('-');
            text.push_str(&location.to_string());
        }
        text.push_str(&format!(
            "+{:02}{:02}-{:03}{:02}{:02}-{}-",
            hours, minutes, day, hour, minute, self.callsign
        ));

        if text.len() > MAX_MESSAGE_LENGTH {
            return Err(MessageBuildErr::TooLong(text.len()));
        }

        MessageHeader::new(text).map_err(|_e| {
            // all individual fields passed their own checks
            unreachable!("{}", MessageHeader::PANIC_MSG)
        })
    }
}

const PANIC_BAD_REGEX: &str = "bad SAME regexp";

// Check header text for basic format compliance
//
// Validates that the text may be split into fields correctly, but
// does *not* validate field contents beyond their shape. Returns a
// tuple of
//
// 1. start position of the purge time field, at its leading `+`
// 2. total length of the header (the input may be longer)
fn check_header(hdr: &str) -> Result<(usize, usize), MessageDecodeErr> {
    lazy_static! {
        static ref RE: Regex =
            Regex::new(r"^ZCZC-[A-Z]{3}-[A-Z]{3}(-[0-9]{6})+(\+[0-9]{4}-[0-9]{7}-[^-]{1,8}-)")
                .expect(PANIC_BAD_REGEX);
    }

    if hdr.len() < MIN_HEADER_LENGTH {
        return Err(MessageDecodeErr::TooShort);
    }

    let mtc = RE
        .captures(hdr)
        .ok_or(MessageDecodeErr::Malformed)?
        .get(2)
        .ok_or(MessageDecodeErr::Malformed)?;

    Ok((mtc.start(), mtc.end()))
}

// True if `hdr` is one entire well-formed header, ending at its
// final dash. The framer uses this to detect header completion.
pub(crate) fn is_complete_header(hdr: &str) -> bool {
    match check_header(hdr) {
        Ok((_offset, length)) => length == hdr.len(),
        Err(_e) => false,
    }
}

// Minimum length of a valid header: one location and a
// single-character callsign
const MIN_HEADER_LENGTH: usize = 35;

// Calculate message issuance time
//
// Projects the `JJJHHMM` fields of the `message` into a full UTC
// datetime near the `received` (year, ordinal day) estimate.
#[cfg(feature = "chrono")]
fn calculate_issue_time(
    message: (u16, u8, u8),
    received: (i32, u32),
) -> Result<DateTime<Utc>, InvalidDateErr> {
    let (day_of_year, hour, minute) = message;
    let (rx_year, rx_day_of_year) = received;

    let daydiff = rx_day_of_year as i32 - day_of_year as i32;
    let msg_year = if daydiff >= 180 {
        // the UTC new year has likely arrived; the message is
        // from next year
        rx_year.saturating_add(1)
    } else if daydiff <= -180 {
        // a message from last UTC year
        rx_year.saturating_sub(1)
    } else {
        rx_year
    };

    NaiveDate::from_yo_opt(msg_year, day_of_year as u32)
        .and_then(|d| d.and_hms_opt(hour as u32, minute as u32, 0))
        .map(|dt| dt.and_utc())
        .ok_or(InvalidDateErr {})
}
