use serde::Serialize;
use strum_macros::{Display, EnumCount, EnumIter, EnumString};

/// Topological scope of an IP address.
///
/// Names parse case-insensitively, so `lan`, `LAN` and `Lan` are the same scope.
#[repr(u8)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    num_derive::FromPrimitive,
    Serialize,
)]
#[strum(ascii_case_insensitive)]
pub enum Scope {
    /// Loopback addresses.
    Localhost = 0,
    /// Link-local, private and unique local addresses.
    #[strum(to_string = "LAN")]
    #[serde(rename = "LAN")]
    Lan = 1,
    /// Multicast and broadcast addresses.
    Multicast = 2,
    /// Everything globally routable.
    Internet = 3,
    /// Unparseable or zero addresses.
    Invalid = 4,
}

impl Scope {
    /// Bit used for this scope in scope sets.
    pub const fn bit(self) -> u8 {
        1 << self as u8
    }
}

#[cfg(test)]
mod test {
    use super::Scope;
    use std::str::FromStr;
    use strum::{EnumCount, IntoEnumIterator};
    use test_case::test_case;

    #[test_case("localhost", Scope::Localhost ; "lower localhost")]
    #[test_case("LocalHost", Scope::Localhost ; "camel localhost")]
    #[test_case("lan", Scope::Lan ; "lower lan")]
    #[test_case("LAN", Scope::Lan ; "upper lan")]
    #[test_case("MULTICAST", Scope::Multicast ; "upper multicast")]
    #[test_case("internet", Scope::Internet ; "lower internet")]
    #[test_case("Invalid", Scope::Invalid ; "title invalid")]
    fn names_parse_case_insensitive(name: &str, scope: Scope) {
        assert_eq!(Scope::from_str(name).unwrap(), scope);
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!(Scope::from_str("intranet").is_err());
    }

    #[test]
    fn bits_are_distinct() {
        let mask = Scope::iter().fold(0u8, |mask, scope| {
            assert_eq!(mask & scope.bit(), 0);
            mask | scope.bit()
        });
        assert_eq!(mask.count_ones() as usize, Scope::COUNT);
    }

    #[test]
    fn display_uses_canonical_names() {
        assert_eq!(Scope::Lan.to_string(), "LAN");
        assert_eq!(Scope::Localhost.to_string(), "Localhost");
    }
}
