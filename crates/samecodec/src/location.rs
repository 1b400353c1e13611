//! SAME location (FIPS) codes
//!
//! SAME messages address one or more six-digit `PSSCCC` location
//! codes: a county subdivision digit, a two-digit state FIPS
//! code, and a three-digit county FIPS code. The codec itself
//! only needs the structure; resolving a code to a human-readable
//! place name is a collaborator's job, expressed here as the
//! [`LocationLookup`] trait.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use strum::EnumMessage;
use thiserror::Error;

/// An invalid SAME location code
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
#[error("invalid location code \"{0}\": must be six decimal digits")]
pub struct InvalidLocationCode(pub String);

/// County subdivision, per 47 CFR 11.31
///
/// The first digit of a SAME location code selects a ninth of
/// the county. Digit `0` addresses the entire county.
///
/// ```
/// use samecodec::Subdivision;
///
/// assert_eq!(Subdivision::Northwest, Subdivision::from_digit(1).unwrap());
/// assert_eq!("Northwest portion", Subdivision::Northwest.as_display_str());
/// ```
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::EnumMessage, strum_macros::EnumString,
)]
pub enum Subdivision {
    /// The entire county
    #[strum(serialize = "0", detailed_message = "Entire county")]
    Whole,

    #[strum(serialize = "1", detailed_message = "Northwest portion")]
    Northwest,

    #[strum(serialize = "2", detailed_message = "North portion")]
    North,

    #[strum(serialize = "3", detailed_message = "Northeast portion")]
    Northeast,

    #[strum(serialize = "4", detailed_message = "West portion")]
    West,

    #[strum(serialize = "5", detailed_message = "Central portion")]
    Central,

    #[strum(serialize = "6", detailed_message = "East portion")]
    East,

    #[strum(serialize = "7", detailed_message = "Southwest portion")]
    Southwest,

    #[strum(serialize = "8", detailed_message = "South portion")]
    South,

    #[strum(serialize = "9", detailed_message = "Southeast portion")]
    Southeast,
}

impl Subdivision {
    /// Convert from the leading digit of a location code
    pub fn from_digit(digit: u8) -> Option<Subdivision> {
        if digit > 9 {
            return None;
        }
        let s = [b'0' + digit];
        let s = std::str::from_utf8(&s).ok()?;
        Subdivision::from_str(s).ok()
    }

    /// The wire digit for this subdivision
    pub fn as_digit(&self) -> u8 {
        self.get_serializations()[0].as_bytes()[0] - b'0'
    }

    /// Human-readable description, like "`Northwest portion`"
    pub fn as_display_str(&self) -> &'static str {
        self.get_detailed_message().expect("missing definition")
    }
}

impl fmt::Display for Subdivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_display_str().fmt(f)
    }
}

/// A six-digit `PSSCCC` SAME location code
///
/// ```
/// use samecodec::{LocationCode, Subdivision};
///
/// let loc: LocationCode = "124031".parse().unwrap();
/// assert_eq!(Subdivision::Northwest, loc.subdivision());
/// assert_eq!(24, loc.state());
/// assert_eq!(31, loc.county());
/// assert_eq!("124031", &loc.to_string());
/// assert_eq!("24031", &loc.county_fips());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LocationCode {
    subdivision: Subdivision,
    state: u8,
    county: u16,
}

impl LocationCode {
    /// Construct from parts
    ///
    /// `state` must be a two-digit FIPS state code and `county`
    /// a three-digit FIPS county code.
    pub fn new(subdivision: Subdivision, state: u8, county: u16) -> Option<Self> {
        if state > 99 || county > 999 {
            return None;
        }
        Some(Self {
            subdivision,
            state,
            county,
        })
    }

    /// County subdivision addressed by this code
    pub fn subdivision(&self) -> Subdivision {
        self.subdivision
    }

    /// Two-digit FIPS state code
    pub fn state(&self) -> u8 {
        self.state
    }

    /// Three-digit FIPS county code
    pub fn county(&self) -> u16 {
        self.county
    }

    /// Base county FIPS code, as five digits (`SSCCC`)
    ///
    /// This is the form most FIPS databases key on; the
    /// subdivision digit is dropped.
    pub fn county_fips(&self) -> String {
        format!("{:02}{:03}", self.state, self.county)
    }
}

impl FromStr for LocationCode {
    type Err = InvalidLocationCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || InvalidLocationCode(s.to_owned());
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }

        let subdivision =
            Subdivision::from_digit(s.as_bytes()[0] - b'0').ok_or_else(err)?;
        let state: u8 = s[1..3].parse().map_err(|_| err())?;
        let county: u16 = s[3..6].parse().map_err(|_| err())?;

        Ok(Self {
            subdivision,
            state,
            county,
        })
    }
}

impl fmt::Display for LocationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:02}{:03}",
            self.subdivision.as_digit(),
            self.state,
            self.county
        )
    }
}

/// A resolved place name for a location code
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocationRecord {
    /// County or place name, like "`Montgomery County`"
    pub name: String,

    /// State abbreviation, like "`MD`"
    pub state: String,
}

/// Collaborator interface: resolve location codes to place names
///
/// Implementations typically wrap a FIPS database. The codec
/// never requires a lookup to succeed; unknown codes are still
/// perfectly valid SAME locations.
pub trait LocationLookup {
    /// Look up a location code
    ///
    /// Returns `None` when the base county is not known.
    fn lookup(&self, code: &LocationCode) -> Option<LocationRecord>;
}

/// An in-memory [`LocationLookup`], keyed by five-digit county FIPS
///
/// Suitable for tests and for embedding a small fixed table.
#[derive(Clone, Debug, Default)]
pub struct MemoryLocationTable {
    entries: HashMap<String, LocationRecord>,
}

impl MemoryLocationTable {
    /// New, empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a county record keyed by five-digit FIPS (`SSCCC`)
    pub fn insert<S>(&mut self, county_fips: S, record: LocationRecord)
    where
        S: Into<String>,
    {
        self.entries.insert(county_fips.into(), record);
    }
}

impl LocationLookup for MemoryLocationTable {
    fn lookup(&self, code: &LocationCode) -> Option<LocationRecord> {
        self.entries.get(&code.county_fips()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subdivision() {
        // "124031" is the Northwest portion of county 24031
        let loc: LocationCode = "124031".parse().expect("bad code");
        assert_eq!(Subdivision::Northwest, loc.subdivision());
        assert_eq!("Northwest portion", loc.subdivision().as_display_str());
        assert_eq!(24, loc.state());
        assert_eq!(31, loc.county());
        assert_eq!("24031", &loc.county_fips());
        assert_eq!("124031", &loc.to_string());
    }

    #[test]
    fn test_parse_whole_county() {
        let loc: LocationCode = "024031".parse().expect("bad code");
        assert_eq!(Subdivision::Whole, loc.subdivision());
        assert_eq!("024031", &loc.to_string());
    }

    #[test]
    fn test_parse_rejects() {
        assert!("02403".parse::<LocationCode>().is_err());
        assert!("0240311".parse::<LocationCode>().is_err());
        assert!("02403A".parse::<LocationCode>().is_err());
        assert!("".parse::<LocationCode>().is_err());
    }

    #[test]
    fn test_memory_lookup() {
        let mut table = MemoryLocationTable::new();
        table.insert(
            "24031",
            LocationRecord {
                name: "Montgomery County".to_owned(),
                state: "MD".to_owned(),
            },
        );

        let whole: LocationCode = "024031".parse().unwrap();
        let northwest: LocationCode = "124031".parse().unwrap();
        let missing: LocationCode = "051059".parse().unwrap();

        // the subdivision digit does not affect the county key
        assert_eq!(
            Some("Montgomery County"),
            table.lookup(&whole).map(|r| r.name).as_deref()
        );
        assert!(table.lookup(&northwest).is_some());
        assert_eq!(None, table.lookup(&missing));
    }
}
