use std::{
    collections::{BTreeSet, HashMap},
    net::IpAddr,
};

use crate::{
    cidr::Network,
    domain,
    error::LookupError,
    intel::{AsnResolver, CountryResolver, ListOracle, ListSubject},
};

/// In-memory longest-prefix table.
///
/// Used as [AsnResolver] with `u32` values and as [CountryResolver] with
/// country codes.
#[derive(Debug, Clone)]
pub struct PrefixTable<V> {
    entries: Vec<(Network, V)>,
}

pub type AsnTable = PrefixTable<u32>;
pub type CountryTable = PrefixTable<String>;

impl<V> Default for PrefixTable<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> PrefixTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, network: Network, value: V) -> Self {
        self.entries.push((network, value));
        self
    }

    /// Value of the most specific network containing `ip`.
    pub fn lookup(&self, ip: &IpAddr) -> Option<&V> {
        self.entries
            .iter()
            .filter(|(network, _)| network.contains(ip))
            .max_by_key(|(network, _)| network.prefix())
            .map(|(_, value)| value)
    }
}

impl<V> FromIterator<(Network, V)> for PrefixTable<V> {
    fn from_iter<I: IntoIterator<Item = (Network, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl AsnResolver for PrefixTable<u32> {
    fn resolve_asn(&self, ip: &IpAddr) -> Result<Option<u32>, LookupError> {
        Ok(self.lookup(ip).copied())
    }
}

impl CountryResolver for PrefixTable<String> {
    fn resolve_country(&self, ip: &IpAddr) -> Result<Option<String>, LookupError> {
        Ok(self.lookup(ip).cloned())
    }
}

/// In-memory list membership.
#[derive(Debug, Clone, Default)]
pub struct StaticLists {
    members: HashMap<ListSubject, BTreeSet<String>>,
}

impl StaticLists {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domain(mut self, domain: &str, list_id: &str) -> Self {
        self.insert(ListSubject::Domain(domain::normalize(domain)), list_id);
        self
    }

    pub fn with_ip(mut self, ip: IpAddr, list_id: &str) -> Self {
        self.insert(ListSubject::Ip(ip), list_id);
        self
    }

    fn insert(&mut self, subject: ListSubject, list_id: &str) {
        self.members
            .entry(subject)
            .or_default()
            .insert(list_id.to_string());
    }
}

impl ListOracle for StaticLists {
    fn lists_for(&self, subject: &ListSubject) -> Result<BTreeSet<String>, LookupError> {
        Ok(self.members.get(subject).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod test {
    use super::{AsnTable, CountryTable};
    use crate::intel::{AsnResolver, CountryResolver};
    use std::net::IpAddr;
    use test_case::test_case;

    fn asn_table() -> AsnTable {
        AsnTable::new()
            .with_entry("8.8.0.0/16".parse().unwrap(), 1)
            .with_entry("8.8.8.0/24".parse().unwrap(), 15169)
            .with_entry("1.1.1.0/24".parse().unwrap(), 13335)
    }

    #[test_case("8.8.8.8", Some(15169) ; "most specific wins")]
    #[test_case("8.8.4.4", Some(1) ; "less specific fallback")]
    #[test_case("1.1.1.1", Some(13335) ; "other network")]
    #[test_case("9.9.9.9", None ; "unknown network")]
    fn asn_lookup(ip: &str, asn: Option<u32>) {
        let ip: IpAddr = ip.parse().unwrap();
        assert_eq!(asn_table().resolve_asn(&ip), Ok(asn));
    }

    #[test]
    fn country_lookup() {
        let table: CountryTable = [
            ("194.232.104.0/24".parse().unwrap(), "AT".to_string()),
            ("151.101.0.0/16".parse().unwrap(), "US".to_string()),
        ]
        .into_iter()
        .collect();
        let ip: IpAddr = "194.232.104.1".parse().unwrap();
        assert_eq!(table.resolve_country(&ip), Ok(Some("AT".to_string())));
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        assert_eq!(table.resolve_country(&ip), Ok(None));
    }
}
