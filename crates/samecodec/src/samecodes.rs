//! SAME originator and event codes

use std::fmt;
use std::str::FromStr;

use strum::EnumMessage;

/// SAME message originator code
///
/// Originator codes may be converted `from()` their SAME string
/// representation. Using them `.as_ref()` or via `Display` will
/// show the three-character wire form.
///
/// ```
/// use samecodec::Originator;
///
/// let orig = Originator::from("WXR");
/// assert_eq!(Originator::WeatherService, orig);
/// assert_eq!("WXR", orig.as_ref());
/// assert_eq!("National Weather Service", orig.as_display_str());
///
/// assert_eq!(Originator::Unknown, Originator::from("HUH"));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::EnumMessage)]
pub enum Originator {
    /// An unknown (and probably invalid) originator code
    ///
    /// Receivers should accept any originator code, so an
    /// unknown code is not an error.
    #[strum(serialize = "OOO", detailed_message = "Unknown Originator")]
    Unknown,

    /// Primary Entry Point station for national activations
    #[strum(serialize = "PEP", detailed_message = "Primary Entry Point System")]
    PrimaryEntryPoint,

    /// Civil authorities (usu. state and local government)
    #[strum(serialize = "CIV", detailed_message = "Civil authorities")]
    CivilAuthority,

    /// National Weather Service or Environment Canada
    #[strum(serialize = "WXR", detailed_message = "National Weather Service")]
    WeatherService,

    /// EAS participant (usu. broadcast station)
    #[strum(
        serialize = "EAS",
        detailed_message = "Broadcast station or cable system"
    )]
    BroadcastStation,
}

impl Originator {
    /// Human-readable string representation
    pub fn as_display_str(&self) -> &'static str {
        self.get_detailed_message().expect("missing definition")
    }

    /// SAME string representation
    ///
    /// Returns the three-character SAME code for this `Originator`
    pub fn as_str(&self) -> &'static str {
        self.get_serializations()[0]
    }

    /// Conventional originator for the given event code
    ///
    /// National-level events are attributed to the Primary Entry
    /// Point system, weather events to the weather service, and
    /// everything else to civil authorities. Used when an encoding
    /// request does not name an originator.
    pub fn for_event(event: &str) -> Originator {
        match event {
            "EAN" | "EAT" | "NIC" | "NPT" | "RMT" | "RWT" => Originator::PrimaryEntryPoint,
            "TOR" | "SVR" | "FFW" | "EVI" => Originator::WeatherService,
            _ => Originator::CivilAuthority,
        }
    }
}

impl FromStr for Originator {
    type Err = ();

    fn from_str(s: &str) -> Result<Originator, ()> {
        match s {
            "OOO" => Ok(Originator::Unknown),
            "PEP" => Ok(Originator::PrimaryEntryPoint),
            "CIV" => Ok(Originator::CivilAuthority),
            "WXR" => Ok(Originator::WeatherService),
            "EAS" => Ok(Originator::BroadcastStation),
            _ => Err(()),
        }
    }
}

impl From<&str> for Originator {
    fn from(s: &str) -> Originator {
        match Originator::from_str(s) {
            Ok(orig) => orig,
            Err(_e) => Originator::Unknown,
        }
    }
}

impl AsRef<str> for Originator {
    fn as_ref(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Originator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

/// Display name for a SAME event code
///
/// Returns the human-readable name of a three-character SAME
/// event code, or `None` if the code is not in the table.
/// An unknown code is not invalid; new codes are added from
/// time to time, and receivers must pass them through.
///
/// ```
/// use samecodec::event_display_name;
///
/// assert_eq!(Some("Tornado Warning"), event_display_name("TOR"));
/// assert_eq!(None, event_display_name("XYZ"));
/// ```
pub fn event_display_name(event: &str) -> Option<&'static str> {
    EVENT_NAMES.get(event).copied()
}

// Event codes from 47 CFR 11.31(e)
static EVENT_NAMES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "ADR" => "Administrative Message",
    "AVA" => "Avalanche Watch",
    "AVW" => "Avalanche Warning",
    "BZW" => "Blizzard Warning",
    "CAE" => "Child Abduction Emergency",
    "CDW" => "Civil Danger Warning",
    "CEM" => "Civil Emergency Message",
    "CFA" => "Coastal Flood Watch",
    "CFW" => "Coastal Flood Warning",
    "DMO" => "Practice/Demo Warning",
    "DSW" => "Dust Storm Warning",
    "EAN" => "Emergency Action Notification",
    "EAT" => "Emergency Action Termination",
    "EQW" => "Earthquake Warning",
    "EVI" => "Evacuation Immediate",
    "EWW" => "Extreme Wind Warning",
    "FFA" => "Flash Flood Watch",
    "FFS" => "Flash Flood Statement",
    "FFW" => "Flash Flood Warning",
    "FLA" => "Flood Watch",
    "FLS" => "Flood Statement",
    "FLW" => "Flood Warning",
    "FRW" => "Fire Warning",
    "HLS" => "Hurricane Local Statement",
    "HMW" => "Hazardous Materials Warning",
    "HUA" => "Hurricane Watch",
    "HUW" => "Hurricane Warning",
    "HWA" => "High Wind Watch",
    "HWW" => "High Wind Warning",
    "LAE" => "Local Area Emergency",
    "LEW" => "Law Enforcement Warning",
    "NIC" => "National Information Center",
    "NMN" => "Network Message Notification",
    "NPT" => "National Periodic Test",
    "NUW" => "Nuclear Power Plant Warning",
    "RHW" => "Radiological Hazard Warning",
    "RMT" => "Required Monthly Test",
    "RWT" => "Required Weekly Test",
    "SMW" => "Special Marine Warning",
    "SPS" => "Special Weather Statement",
    "SPW" => "Shelter in Place Warning",
    "SSA" => "Storm Surge Watch",
    "SSW" => "Storm Surge Warning",
    "SVA" => "Severe Thunderstorm Watch",
    "SVR" => "Severe Thunderstorm Warning",
    "SVS" => "Severe Weather Statement",
    "TOA" => "Tornado Watch",
    "TOE" => "911 Telephone Outage Emergency",
    "TOR" => "Tornado Warning",
    "TRA" => "Tropical Storm Watch",
    "TRW" => "Tropical Storm Warning",
    "TSA" => "Tsunami Watch",
    "TSW" => "Tsunami Warning",
    "VOW" => "Volcano Warning",
    "WSA" => "Winter Storm Watch",
    "WSW" => "Winter Storm Warning",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_originator_round_trip() {
        for orig in [
            Originator::PrimaryEntryPoint,
            Originator::CivilAuthority,
            Originator::WeatherService,
            Originator::BroadcastStation,
        ] {
            assert_eq!(orig, Originator::from(orig.as_str()));
        }

        assert_eq!(Originator::Unknown, Originator::from("???"));
        assert_eq!("OOO", Originator::Unknown.as_str());
    }

    #[test]
    fn test_originator_for_event() {
        assert_eq!(
            Originator::PrimaryEntryPoint,
            Originator::for_event("EAN")
        );
        assert_eq!(Originator::WeatherService, Originator::for_event("TOR"));
        assert_eq!(Originator::CivilAuthority, Originator::for_event("CAE"));
    }

    #[test]
    fn test_event_names() {
        assert_eq!(Some("Required Weekly Test"), event_display_name("RWT"));
        assert_eq!(Some("Evacuation Immediate"), event_display_name("EVI"));
        assert_eq!(None, event_display_name(""));
        assert_eq!(None, event_display_name("ZZZ"));
    }
}
