//! Endpoint rules for a personal firewall.
//!
//! Rules are written one per line as a sign, an endpoint and an optional
//! protocol and port restriction. An [EndpointList] evaluates an [Entity]
//! against its rules in order and the first matching rule decides.
//!
//! # Example
//! ```
//! use endpoints::{Action, EndpointList, Firewall, Intel, StaticLists};
//!
//! let lists = StaticLists::new().with_domain("tracker.example.com", "TRAC");
//! let fw = Firewall::new(Intel::new().with_list_oracle(lists));
//! fw.replace_rules(
//!     EndpointList::parse([
//!         "+ Localhost,LAN",
//!         "- L:TRAC",
//!         "+ *.example.com */443",
//!     ])
//!     .unwrap(),
//! );
//! fw.set_default_action(Action::Reject);
//!
//! let entity = fw
//!     .entity()
//!     .with_domain("cdn.example.com")
//!     .with_ip("93.184.216.34".parse().unwrap())
//!     .with_protocol(6)
//!     .with_port(443);
//! assert_eq!(fw.decide(&entity).action, Action::Accept);
//!
//! let entity = fw.entity().with_domain("pixel.tracker.example.com");
//! assert_eq!(fw.decide(&entity).action, Action::Reject);
//! ```
mod cidr;
mod config;
mod connection;
mod domain;
mod entity;
mod error;
#[cfg(feature = "tokio")]
pub mod feed;
mod firewall;
mod intel;
mod list;
mod logger;
mod matcher;
mod qualifier;
mod resolvable;
mod rule;
mod scope;
mod tables;

pub use crate::firewall::{Decision, Firewall};
pub use endpoints_common::{Action, EPResult, Protocol, Scope};

pub use cidr::Network;
pub use config::{Config, DEFAULT_LOOKUP_TIMEOUT_MS};
pub use connection::{ConnectionRecord, Direction, VerdictSink};
pub use domain::DomainPattern;
pub use entity::Entity;
pub use error::{Error, LookupError, RuleError};
pub use intel::{
    AsnResolver, CountryResolver, Intel, ListOracle, ListSubject, DEFAULT_MAX_PENDING_LOOKUPS,
};
pub use list::{EndpointList, Evaluation};
pub use matcher::{MatchOutcome, Matcher, ScopeSet};
pub use qualifier::{PortFilter, ProtocolFilter, Qualifier};
pub use resolvable::{Resolvable, State};
pub use rule::{Rule, Sign};
pub use scope::{classify, ScopeClassifier};
pub use tables::{AsnTable, CountryTable, PrefixTable, StaticLists};
pub type Result<T> = std::result::Result<T, Error>;
