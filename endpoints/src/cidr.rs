use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    ops::{BitAnd, Not},
    str::FromStr,
};

use ipnet::IpNet;

use crate::error::RuleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cidr<T: AsNum> {
    ip: T,
    prefix: u8,
}

pub trait AsNum: Copy {
    type Num: BitAnd<Output = Self::Num>
        + CheckedShr
        + Not<Output = Self::Num>
        + Default
        + Eq
        + Copy;
    const BITS: u8;
    fn as_num(&self) -> Self::Num;
    fn from_num(num: Self::Num) -> Self;
    fn max() -> Self::Num;
}

pub trait CheckedShr
where
    Self: Sized,
{
    fn checked_shr(self, rhs: u32) -> Option<Self>;
}

impl CheckedShr for u32 {
    fn checked_shr(self, rhs: u32) -> Option<Self> {
        u32::checked_shr(self, rhs)
    }
}

impl CheckedShr for u128 {
    fn checked_shr(self, rhs: u32) -> Option<Self> {
        u128::checked_shr(self, rhs)
    }
}

impl AsNum for Ipv4Addr {
    type Num = u32;
    const BITS: u8 = 32;

    fn as_num(&self) -> Self::Num {
        u32::from(*self)
    }

    fn from_num(num: Self::Num) -> Self {
        Ipv4Addr::from(num)
    }

    fn max() -> Self::Num {
        u32::MAX
    }
}

impl AsNum for Ipv6Addr {
    type Num = u128;
    const BITS: u8 = 128;

    fn as_num(&self) -> Self::Num {
        u128::from(*self)
    }

    fn from_num(num: Self::Num) -> Self {
        Ipv6Addr::from(num)
    }

    fn max() -> Self::Num {
        u128::MAX
    }
}

impl<T: AsNum> Cidr<T> {
    /// Creates the network, clearing host bits. `None` if the prefix is too long.
    pub fn new(ip: T, prefix: u8) -> Option<Self> {
        (prefix <= T::BITS).then(|| Self {
            ip: Self::normalize(ip, prefix),
            prefix,
        })
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn network(&self) -> T {
        self.ip
    }

    fn normalize(ip: T, prefix: u8) -> T {
        T::from_num(ip.as_num() & Self::mask_prefix(prefix))
    }

    fn mask(&self) -> T::Num {
        Self::mask_prefix(self.prefix)
    }

    fn mask_prefix(prefix: u8) -> T::Num {
        !(T::max().checked_shr(prefix.into()).unwrap_or_default())
    }

    pub fn contains(&self, ip: &T) -> bool {
        (ip.as_num() & self.mask()) == self.ip.as_num()
    }
}

/// Tests `ip` against the network `base/prefix` without building it.
pub(crate) fn within<T: AsNum>(ip: &T, base: T, prefix: u8) -> bool {
    let mask = Cidr::<T>::mask_prefix(prefix);
    (ip.as_num() & mask) == (base.as_num() & mask)
}

impl<T: AsNum + fmt::Display> fmt::Display for Cidr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefix)
    }
}

/// IP network of either family, as used by network rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    V4(Cidr<Ipv4Addr>),
    V6(Cidr<Ipv6Addr>),
}

impl Network {
    pub fn prefix(&self) -> u8 {
        match self {
            Network::V4(net) => net.prefix(),
            Network::V6(net) => net.prefix(),
        }
    }

    /// Whether the network contains `ip`.
    ///
    /// IPv4-mapped IPv6 addresses are compared as the IPv4 address they carry.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (self, canonical(ip)) {
            (Network::V4(net), IpAddr::V4(ip)) => net.contains(&ip),
            (Network::V6(net), IpAddr::V6(ip)) => net.contains(&ip),
            _ => false,
        }
    }
}

impl FromStr for Network {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RuleError::InvalidCidr(s.to_string());
        let network = match IpNet::from_str(s).map_err(|_| invalid())? {
            IpNet::V4(net) => Cidr::new(net.addr(), net.prefix_len()).map(Network::V4),
            IpNet::V6(net) => Cidr::new(net.addr(), net.prefix_len()).map(Network::V6),
        };
        network.ok_or_else(invalid)
    }
}

impl From<IpNet> for Network {
    fn from(net: IpNet) -> Self {
        // ipnet already bounds the prefix length
        match net.trunc() {
            IpNet::V4(net) => Network::V4(Cidr {
                ip: net.network(),
                prefix: net.prefix_len(),
            }),
            IpNet::V6(net) => Network::V6(Cidr {
                ip: net.network(),
                prefix: net.prefix_len(),
            }),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::V4(net) => write!(f, "{net}"),
            Network::V6(net) => write!(f, "{net}"),
        }
    }
}

/// Unwraps IPv4-mapped IPv6 addresses.
pub(crate) fn canonical(ip: &IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => *ip,
        },
        IpAddr::V4(_) => *ip,
    }
}
