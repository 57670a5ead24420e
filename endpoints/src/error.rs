use std::io;

use endpoints_common::PortStoreError;
use thiserror::Error;

/// Crate errors.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// A line of a rule list could not be compiled.
    /// Lines are numbered from 1.
    #[error("invalid rule on line {line}: {source}")]
    InvalidRule {
        line: usize,
        #[source]
        source: RuleError,
    },
    /// A single rule could not be compiled.
    #[error(transparent)]
    Rule(#[from] RuleError),
    /// Configuration could not be read.
    #[error(transparent)]
    Config(#[from] serde_json::Error),
    /// IO error
    #[error(transparent)]
    IoError(#[from] io::Error),
    /// A decision task panicked or was cancelled.
    #[cfg(feature = "tokio")]
    #[error(transparent)]
    Task(#[from] tokio::task::JoinError),
    /// The verdict sink no longer accepts verdicts.
    #[error("verdict sink is closed")]
    SinkClosed,
}

/// Reasons a rule line is rejected by the compiler.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("rule is empty")]
    Empty,
    #[error("rule must start with `+` or `-`, found `{0}`")]
    InvalidSign(String),
    #[error("rule has no endpoint after its sign")]
    MissingMatcher,
    #[error("rule has more than four fields")]
    TooManyFields,
    #[error("domain pattern is empty")]
    EmptyPattern,
    #[error("domain pattern `{0}` contains an empty label")]
    EmptyLabel(String),
    #[error("domain pattern `{0}` cannot both start with `.` and end with `*`")]
    AnchoredWildcard(String),
    #[error("domain pattern `{pattern}` contains invalid character `{found}`")]
    InvalidCharacter { pattern: String, found: char },
    #[error("unknown scope `{0}`")]
    UnknownScope(String),
    #[error("unknown protocol `{0}`")]
    UnknownProtocol(String),
    #[error("protocol is given twice")]
    DuplicateProtocol,
    #[error("invalid port `{0}`")]
    InvalidPort(String),
    #[error("invalid port range `{0}`")]
    InvalidPortRange(String),
    #[error(transparent)]
    PortStore(#[from] PortStoreError),
    #[error("invalid network `{0}`")]
    InvalidCidr(String),
    #[error("invalid AS number `{0}`")]
    InvalidAsn(String),
    #[error("invalid list id `{0}`")]
    InvalidListId(String),
}

/// Failure of an external lookup.
///
/// Lookup failures never decide a connection: the matcher that needed the
/// lookup is indeterminate and the rule does not match.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("{0} lookup timed out")]
    Timeout(&'static str),
    #[error("{kind} lookup failed: {reason}")]
    Failed { kind: &'static str, reason: String },
    #[error("{0} lookup panicked")]
    Panicked(&'static str),
}

impl LookupError {
    pub fn failed(kind: &'static str, reason: impl ToString) -> Self {
        Self::Failed {
            kind,
            reason: reason.to_string(),
        }
    }
}
