use std::{fs::File, io::Read, path::Path, time::Duration};

use endpoints_common::Action;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::{
    intel::{Intel, DEFAULT_MAX_PENDING_LOOKUPS},
    list::EndpointList,
    scope::ScopeClassifier,
    Result,
};

/// Lookup bound used when the configuration does not set one.
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 1000;

/// Firewall configuration, usually read from JSON.
///
/// ```json
/// {
///   "default_action": "Reject",
///   "lookup_timeout_ms": 250,
///   "max_pending_lookups": 32,
///   "lan_networks": ["198.51.100.0/24"],
///   "rules": ["+ Localhost,LAN", "- L:TRAC", "+ * */443"],
///   "skip_invalid_rules": true
/// }
/// ```
///
/// Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Action for connections no rule decides.
    pub default_action: Action,
    /// Bound on every external lookup.
    pub lookup_timeout_ms: u64,
    /// Lookups allowed to run at once, including those past their deadline.
    pub max_pending_lookups: usize,
    /// Networks classified as LAN on top of the reserved ranges.
    pub lan_networks: Vec<IpNet>,
    pub rules: Vec<String>,
    /// Drop invalid rule lines instead of rejecting the configuration.
    pub skip_invalid_rules: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_action: Action::default(),
            lookup_timeout_ms: DEFAULT_LOOKUP_TIMEOUT_MS,
            max_pending_lookups: DEFAULT_MAX_PENDING_LOOKUPS,
            lan_networks: Vec::new(),
            rules: Vec::new(),
            skip_invalid_rules: false,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    pub fn scope_classifier(&self) -> ScopeClassifier {
        ScopeClassifier::with_lan_networks(self.lan_networks.iter().copied().map(Into::into))
    }

    /// Collaborator bundle without any lookup collaborators.
    /// Those are attached by the caller.
    pub fn intel(&self) -> Intel {
        Intel::new()
            .with_scope_classifier(self.scope_classifier())
            .with_timeout(Duration::from_millis(self.lookup_timeout_ms))
            .with_max_pending_lookups(self.max_pending_lookups)
    }

    pub fn endpoint_list(&self) -> Result<EndpointList> {
        if self.skip_invalid_rules {
            Ok(EndpointList::parse_lossy(&self.rules).0)
        } else {
            EndpointList::parse(&self.rules)
        }
    }
}
