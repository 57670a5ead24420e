use std::{collections::BTreeSet, net::IpAddr, sync::Arc};

use endpoints_common::Scope;

use crate::{
    cidr::canonical,
    domain,
    error::LookupError,
    intel::{Intel, ListSubject},
    resolvable::{Resolvable, State},
};

/// The remote end of a connection under evaluation.
///
/// Derived attributes (scope, ASN, country and list membership) are looked
/// up the first time a matcher needs them and memoized for the lifetime of
/// the entity. Concurrent readers share one lookup per attribute.
///
/// # Example
/// ```
/// # use endpoints::{Entity, Scope};
/// let entity = Entity::new()
///     .with_domain("Example.com")
///     .with_ip("192.168.0.1".parse().unwrap())
///     .with_protocol(6)
///     .with_port(443);
/// assert_eq!(entity.domain(), Some("example.com."));
/// assert_eq!(entity.scope(), Some(Scope::Lan));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Entity {
    domain: Option<String>,
    ip: Option<IpAddr>,
    protocol: u8,
    port: u16,
    intel: Arc<Intel>,
    scope: Resolvable<Scope>,
    asn: Resolvable<Option<u32>>,
    country: Resolvable<Option<String>>,
    lists: Resolvable<Option<Arc<BTreeSet<String>>>>,
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entity whose derived attributes are resolved with `intel`.
    pub fn with_intel(intel: Arc<Intel>) -> Self {
        Self {
            intel,
            ..Self::default()
        }
    }

    /// Sets the domain. It is lower-cased and made fully qualified.
    pub fn with_domain(mut self, domain: impl AsRef<str>) -> Self {
        self.set_domain(domain);
        self
    }

    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.set_ip(ip);
        self
    }

    pub fn with_protocol(self, protocol: u8) -> Self {
        Self { protocol, ..self }
    }

    pub fn with_port(self, port: u16) -> Self {
        Self { port, ..self }
    }

    pub fn set_domain(&mut self, domain: impl AsRef<str>) {
        let domain = domain.as_ref().trim();
        self.domain = (!domain.is_empty() && domain != ".").then(|| domain::normalize(domain));
        self.lists.reset();
    }

    /// Replaces the IP, forgetting every attribute derived from the old one.
    pub fn set_ip(&mut self, ip: IpAddr) {
        self.ip = Some(canonical(&ip));
        self.scope.reset();
        self.asn.reset();
        self.country.reset();
        self.lists.reset();
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `None` when the entity has no IP.
    pub fn scope(&self) -> Option<Scope> {
        let ip = self.ip?;
        self.scope
            .get_or_resolve(|| Ok(self.intel.scope_classifier().classify(&ip)))
            .ok()
    }

    /// Scope if it was already resolved, without resolving it.
    pub fn cached_scope(&self) -> Option<Scope> {
        match self.scope.state() {
            State::Resolved(scope) => Some(scope),
            _ => None,
        }
    }

    /// `Ok(None)` when the entity has no IP, no resolver is configured or
    /// the address belongs to no known AS.
    pub fn asn(&self) -> Result<Option<u32>, LookupError> {
        let Some(ip) = self.ip else {
            return Ok(None);
        };
        self.asn
            .get_or_resolve(|| self.intel.resolve_asn(ip).unwrap_or(Ok(None)))
    }

    /// Upper-case country code, `Ok(None)` when it cannot be known.
    pub fn country(&self) -> Result<Option<String>, LookupError> {
        let Some(ip) = self.ip else {
            return Ok(None);
        };
        self.country
            .get_or_resolve(|| self.intel.resolve_country(ip).unwrap_or(Ok(None)))
    }

    /// Ids of the lists the domain, one of its parents or the IP is on.
    ///
    /// `Ok(None)` when there is nothing to look up or no oracle is configured.
    pub fn lists(&self) -> Result<Option<Arc<BTreeSet<String>>>, LookupError> {
        let subjects = self.list_subjects();
        if subjects.is_empty() {
            return Ok(None);
        }
        self.lists.get_or_resolve(|| match self.intel.resolve_lists(subjects) {
            Some(lists) => lists.map(|lists| Some(Arc::new(lists))),
            None => Ok(None),
        })
    }

    fn list_subjects(&self) -> Vec<ListSubject> {
        let mut subjects: Vec<_> = self
            .domain
            .iter()
            .flat_map(|domain| domain::with_parents(domain))
            .map(|domain| ListSubject::Domain(domain.to_string()))
            .collect();
        subjects.extend(self.ip.map(ListSubject::Ip));
        subjects
    }
}
