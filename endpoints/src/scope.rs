use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use endpoints_common::Scope;

use crate::cidr::{canonical, within, Network};

/// Classifies IP addresses into [Scope]s.
///
/// Besides the reserved ranges of both address families, additional networks
/// (a VPN range, for example) can be configured to count as [`Scope::Lan`].
#[derive(Debug, Clone, Default)]
pub struct ScopeClassifier {
    lan_networks: Vec<Network>,
}

impl ScopeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lan_networks(networks: impl IntoIterator<Item = Network>) -> Self {
        Self {
            lan_networks: networks.into_iter().collect(),
        }
    }

    /// Scope of `ip`. Every address maps to exactly one scope.
    ///
    /// Checked in order: loopback, LAN, multicast, invalid, and everything
    /// left is internet.
    pub fn classify(&self, ip: &IpAddr) -> Scope {
        let ip = canonical(ip);
        if is_loopback(&ip) {
            Scope::Localhost
        } else if is_lan(&ip) || self.lan_networks.iter().any(|net| net.contains(&ip)) {
            Scope::Lan
        } else if is_multicast(&ip) {
            Scope::Multicast
        } else if is_zero(&ip) {
            Scope::Invalid
        } else {
            Scope::Internet
        }
    }

    /// Like [`classify`](Self::classify), but for unparsed input.
    /// Anything that is not an IP address is [`Scope::Invalid`].
    pub fn classify_str(&self, ip: &str) -> Scope {
        ip.trim()
            .parse::<IpAddr>()
            .map_or(Scope::Invalid, |ip| self.classify(&ip))
    }
}

/// Scope of `ip` using only the reserved ranges.
pub fn classify(ip: &IpAddr) -> Scope {
    ScopeClassifier::default().classify(ip)
}

fn is_loopback(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => ip.is_loopback(), // 127.0.0.0/8
        IpAddr::V6(ip) => ip.is_loopback(), // ::1
    }
}

fn is_lan(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => {
            ip.is_link_local() // 169.254.0.0/16
                || ip.is_private() // 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
                || within(ip, Ipv4Addr::new(100, 64, 0, 0), 10) // CGNAT
        }
        IpAddr::V6(ip) => {
            within(ip, Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10) // link-local
                || within(ip, Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 0), 7) // unique local
                || within(ip, Ipv6Addr::new(0xfec0, 0, 0, 0, 0, 0, 0, 0), 10) // site-local
        }
    }
}

fn is_multicast(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => ip.is_multicast() || ip.is_broadcast(),
        IpAddr::V6(ip) => ip.is_multicast(),
    }
}

fn is_zero(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => within(ip, Ipv4Addr::UNSPECIFIED, 8), // "this network"
        IpAddr::V6(ip) => ip.is_unspecified(),
    }
}
