use num_traits::FromPrimitive;
use strum_macros::{Display, EnumString};

/// IP protocols that can be named in rules.
///
/// Any other protocol can still be given by its number.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, num_derive::FromPrimitive)]
#[strum(ascii_case_insensitive)]
pub enum Protocol {
    ICMP = 1,
    IGMP = 2,
    TCP = 6,
    UDP = 17,
    RDP = 27,
    DCCP = 33,
    ICMPv6 = 58,
    SCTP = 132,
    UDPLite = 136,
}

/// Protocols that carry ports, the only ones a port filter without protocol accepts.
pub const PORT_PROTOCOLS: [Protocol; 5] = [
    Protocol::TCP,
    Protocol::UDP,
    Protocol::DCCP,
    Protocol::SCTP,
    Protocol::UDPLite,
];

impl Protocol {
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Named protocol for a protocol number, if there is one.
    pub fn from_number(number: u8) -> Option<Self> {
        Self::from_u8(number)
    }

    pub fn has_ports(number: u8) -> bool {
        PORT_PROTOCOLS.iter().any(|p| p.number() == number)
    }
}
