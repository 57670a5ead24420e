use std::{fmt, net::IpAddr, str::FromStr};

use endpoints_common::Scope;
use num_traits::FromPrimitive;

use crate::{
    cidr::{canonical, Network},
    domain::DomainPattern,
    entity::Entity,
    error::{LookupError, RuleError},
};

/// Outcome of testing a single [Matcher] against an [Entity].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Positive,
    Negative,
    /// The attribute the matcher needs is not available.
    /// Carries the lookup error if a lookup failed.
    Indeterminate(Option<LookupError>),
}

impl MatchOutcome {
    fn from_bool(matched: bool) -> Self {
        if matched {
            Self::Positive
        } else {
            Self::Negative
        }
    }

    fn from_lookup<T>(
        lookup: Result<Option<T>, LookupError>,
        test: impl FnOnce(T) -> bool,
    ) -> Self {
        match lookup {
            Ok(Some(value)) => Self::from_bool(test(value)),
            Ok(None) => Self::Indeterminate(None),
            Err(err) => Self::Indeterminate(Some(err)),
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Self::Positive)
    }
}

/// Set of [Scope]s, one bit per scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScopeSet(u8);

impl ScopeSet {
    pub fn insert(&mut self, scope: Scope) {
        self.0 |= scope.bit();
    }

    pub fn contains(&self, scope: Scope) -> bool {
        self.0 & scope.bit() != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Scope> + '_ {
        (0..u8::BITS as u8)
            .filter_map(Scope::from_u8)
            .filter(|scope| self.contains(*scope))
    }
}

impl FromIterator<Scope> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = Scope>>(iter: I) -> Self {
        let mut set = Self::default();
        iter.into_iter().for_each(|scope| set.insert(scope));
        set
    }
}

/// Compiled endpoint of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Matcher {
    Any,
    /// Any of the given block-list ids.
    Lists(Vec<String>),
    Scopes(ScopeSet),
    Asn(u32),
    /// Upper-case two letter country code.
    Country(String),
    Ip(IpAddr),
    Network(Network),
    Domain(DomainPattern),
}

impl Matcher {
    pub fn matches(&self, entity: &Entity) -> MatchOutcome {
        match self {
            Matcher::Any => MatchOutcome::Positive,
            Matcher::Domain(pattern) => match entity.domain() {
                Some(domain) => MatchOutcome::from_bool(pattern.matches(domain)),
                None => MatchOutcome::Indeterminate(None),
            },
            Matcher::Ip(ip) => match entity.ip() {
                Some(target) => MatchOutcome::from_bool(target == *ip),
                None => MatchOutcome::Indeterminate(None),
            },
            Matcher::Network(network) => match entity.ip() {
                Some(target) => MatchOutcome::from_bool(network.contains(&target)),
                None => MatchOutcome::Indeterminate(None),
            },
            Matcher::Scopes(scopes) => match entity.scope() {
                Some(scope) => MatchOutcome::from_bool(scopes.contains(scope)),
                None => MatchOutcome::Indeterminate(None),
            },
            Matcher::Asn(asn) => MatchOutcome::from_lookup(entity.asn(), |found| found == *asn),
            Matcher::Country(code) => {
                MatchOutcome::from_lookup(entity.country(), |found| found == *code)
            }
            Matcher::Lists(ids) => MatchOutcome::from_lookup(entity.lists(), |found| {
                ids.iter().any(|id| found.contains(id))
            }),
        }
    }
}

impl FromStr for Matcher {
    type Err = RuleError;

    /// Tries the forms in order: `*`, `L:` lists, scopes, `AS` numbers,
    /// country codes, IP addresses, networks and finally domain patterns.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            return Ok(Matcher::Any);
        }
        if let Some(ids) = s.strip_prefix("L:").or_else(|| s.strip_prefix("l:")) {
            return parse_lists(ids).map(Matcher::Lists);
        }
        if s.contains(',') {
            return s
                .split(',')
                .map(|name| {
                    Scope::from_str(name).map_err(|_| RuleError::UnknownScope(name.into()))
                })
                .collect::<Result<ScopeSet, _>>()
                .map(Matcher::Scopes);
        }
        if let Ok(scope) = Scope::from_str(s) {
            return Ok(Matcher::Scopes(ScopeSet::from_iter([scope])));
        }
        if let Some(asn) = asn_digits(s) {
            return asn
                .parse()
                .map(Matcher::Asn)
                .map_err(|_| RuleError::InvalidAsn(s.into()));
        }
        if s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic()) {
            return Ok(Matcher::Country(s.to_ascii_uppercase()));
        }
        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(Matcher::Ip(canonical(&ip)));
        }
        if s.contains('/') {
            return s.parse().map(Matcher::Network);
        }
        s.parse().map(Matcher::Domain)
    }
}

fn asn_digits(s: &str) -> Option<&str> {
    let prefix = s.get(..2)?;
    let digits = &s[2..];
    (prefix.eq_ignore_ascii_case("AS")
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit()))
    .then_some(digits)
}

fn parse_lists(ids: &str) -> Result<Vec<String>, RuleError> {
    ids.split(',')
        .map(|id| {
            let valid = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
            if id.is_empty() || !id.chars().all(valid) {
                Err(RuleError::InvalidListId(id.into()))
            } else {
                Ok(id.to_string())
            }
        })
        .collect()
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, scope) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{scope}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Any => f.write_str("*"),
            Matcher::Lists(ids) => write!(f, "L:{}", ids.join(",")),
            Matcher::Scopes(scopes) => write!(f, "{scopes}"),
            Matcher::Asn(asn) => write!(f, "AS{asn}"),
            Matcher::Country(code) => f.write_str(code),
            Matcher::Ip(ip) => write!(f, "{ip}"),
            Matcher::Network(network) => write!(f, "{network}"),
            Matcher::Domain(pattern) => write!(f, "{pattern}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{MatchOutcome, Matcher, ScopeSet};
    use crate::{
        entity::Entity,
        error::{LookupError, RuleError},
        intel::{CountryResolver, Intel},
        tables::{AsnTable, StaticLists},
    };
    use endpoints_common::Scope;
    use std::{net::IpAddr, sync::Arc};
    use test_case::test_case;

    struct Broken;

    impl CountryResolver for Broken {
        fn resolve_country(&self, _ip: &IpAddr) -> Result<Option<String>, LookupError> {
            Err(LookupError::failed("country", "no database"))
        }
    }

    fn matcher(s: &str) -> Matcher {
        s.parse().unwrap()
    }

    #[test_case("*", Matcher::Any ; "any")]
    #[test_case("L:TRAC,MAL", Matcher::Lists(vec!["TRAC".into(), "MAL".into()]) ; "lists")]
    #[test_case("l:TRAC", Matcher::Lists(vec!["TRAC".into()]) ; "lower list prefix")]
    #[test_case("Localhost,LAN", Matcher::Scopes(ScopeSet::from_iter([Scope::Localhost, Scope::Lan])) ; "scope list")]
    #[test_case("internet", Matcher::Scopes(ScopeSet::from_iter([Scope::Internet])) ; "single scope")]
    #[test_case("AS15169", Matcher::Asn(15169) ; "asn")]
    #[test_case("as0", Matcher::Asn(0) ; "lower asn")]
    #[test_case("at", Matcher::Country("AT".into()) ; "country")]
    #[test_case("10.2.3.4", Matcher::Ip("10.2.3.4".parse().unwrap()) ; "ipv4")]
    #[test_case("fd00::1", Matcher::Ip("fd00::1".parse().unwrap()) ; "ipv6")]
    #[test_case("10.2.3.0/24", Matcher::Network("10.2.3.0/24".parse().unwrap()) ; "network")]
    #[test_case("asia.example.com", Matcher::Domain("asia.example.com".parse().unwrap()) ; "domain starting like asn")]
    fn dispatch(s: &str, expected: Matcher) {
        assert_eq!(matcher(s), expected);
    }

    #[test_case("LAN,Office", RuleError::UnknownScope("Office".into()) ; "unknown scope")]
    #[test_case("AS99999999999", RuleError::InvalidAsn("AS99999999999".into()) ; "asn overflow")]
    #[test_case("L:", RuleError::InvalidListId("".into()) ; "empty list id")]
    #[test_case("L:A,B!", RuleError::InvalidListId("B!".into()) ; "invalid list id")]
    #[test_case("10.2.3.0/33", RuleError::InvalidCidr("10.2.3.0/33".into()) ; "invalid prefix")]
    fn invalid(s: &str, error: RuleError) {
        assert_eq!(s.parse::<Matcher>().unwrap_err(), error);
    }

    #[test_case("*" ; "any")]
    #[test_case("L:TRAC,MAL" ; "lists")]
    #[test_case("Localhost,LAN" ; "scopes")]
    #[test_case("AS15169" ; "asn")]
    #[test_case("AT" ; "country")]
    #[test_case("10.2.3.0/24" ; "network")]
    #[test_case("*.example.com." ; "domain")]
    fn canonical_text(s: &str) {
        assert_eq!(matcher(s).to_string(), s);
    }

    #[test_case("10.2.3.4", MatchOutcome::Positive ; "inside")]
    #[test_case("10.2.2.4", MatchOutcome::Negative ; "below")]
    #[test_case("10.2.4.4", MatchOutcome::Negative ; "above")]
    fn network_containment(ip: &str, outcome: MatchOutcome) {
        let entity = Entity::new().with_ip(ip.parse().unwrap());
        assert_eq!(matcher("10.2.3.0/24").matches(&entity), outcome);
    }

    #[test_case("*.example.com" ; "domain")]
    #[test_case("10.0.0.1" ; "ip")]
    #[test_case("10.0.0.0/8" ; "network")]
    #[test_case("LAN" ; "scope")]
    #[test_case("AS1" ; "asn")]
    #[test_case("AT" ; "country")]
    #[test_case("L:TRAC" ; "lists")]
    fn missing_attribute_is_indeterminate(s: &str) {
        assert_eq!(matcher(s).matches(&Entity::new()), MatchOutcome::Indeterminate(None));
    }

    #[test]
    fn any_matches_empty_entity() {
        assert!(Matcher::Any.matches(&Entity::new()).is_positive());
    }

    #[test]
    fn exact_ip_matches_mapped_address() {
        let entity = Entity::new().with_ip("::ffff:10.0.0.1".parse().unwrap());
        assert!(matcher("10.0.0.1").matches(&entity).is_positive());
    }

    #[test]
    fn asn_lookup() {
        let intel = Intel::new().with_asn_resolver(
            AsnTable::new().with_entry("8.8.8.0/24".parse().unwrap(), 15169),
        );
        let intel = Arc::new(intel);
        let entity = Entity::with_intel(intel.clone()).with_ip("8.8.8.8".parse().unwrap());
        assert_eq!(matcher("AS15169").matches(&entity), MatchOutcome::Positive);
        assert_eq!(matcher("AS13335").matches(&entity), MatchOutcome::Negative);

        let unknown = Entity::with_intel(intel).with_ip("9.9.9.9".parse().unwrap());
        assert_eq!(matcher("AS15169").matches(&unknown), MatchOutcome::Indeterminate(None));
    }

    #[test]
    fn lookup_error_is_carried() {
        let intel = Arc::new(Intel::new().with_country_resolver(Broken));
        let entity = Entity::with_intel(intel).with_ip("8.8.8.8".parse().unwrap());
        assert_eq!(
            matcher("AT").matches(&entity),
            MatchOutcome::Indeterminate(Some(LookupError::failed("country", "no database")))
        );
    }

    #[test]
    fn list_membership() {
        let lists = StaticLists::new()
            .with_domain("tracker.example.com", "TRAC")
            .with_ip("10.0.0.1".parse().unwrap(), "MAL");
        let intel = Arc::new(Intel::new().with_list_oracle(lists));

        let entity = Entity::with_intel(intel.clone()).with_domain("cdn.tracker.example.com");
        assert_eq!(matcher("L:TRAC").matches(&entity), MatchOutcome::Positive);
        assert_eq!(matcher("L:MAL").matches(&entity), MatchOutcome::Negative);
        assert_eq!(matcher("L:MAL,TRAC").matches(&entity), MatchOutcome::Positive);

        let entity = Entity::with_intel(intel).with_ip("10.0.0.1".parse().unwrap());
        assert_eq!(matcher("L:MAL").matches(&entity), MatchOutcome::Positive);
    }

    #[test]
    fn scope_sets() {
        let lan = Entity::new().with_ip("192.168.0.1".parse().unwrap());
        let internet = Entity::new().with_ip("8.8.8.8".parse().unwrap());
        let scopes = matcher("Localhost,LAN");
        assert!(scopes.matches(&lan).is_positive());
        assert_eq!(scopes.matches(&internet), MatchOutcome::Negative);
    }
}
