mod port_store;
mod protocol;
mod scope;

pub use port_store::{PortStore, PortStoreError, MAX_RANGES};
pub use protocol::{Protocol, PORT_PROTOCOLS};
pub use scope::Scope;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumCount};

/// Result of matching an endpoint against a rule or a list of rules.
///
/// Only rule order decides which result wins, the values carry no precedence.
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumCount, num_derive::FromPrimitive, Serialize,
)]
pub enum EPResult {
    /// No rule applied to the endpoint.
    NoMatch = 0,
    /// A permit (`+`) rule matched first.
    Permitted = 1,
    /// A deny (`-`) rule matched first.
    Denied = 2,
}

/// Verdict applied to a connection, either by a matching rule or by the default action.
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
    num_derive::FromPrimitive,
    Serialize,
    Deserialize,
)]
pub enum Action {
    /// Let the connection through.
    Accept = 0,
    /// Block the connection.
    Reject = 1,
}

impl Default for Action {
    fn default() -> Self {
        Self::Reject
    }
}

impl From<EPResult> for Option<Action> {
    fn from(result: EPResult) -> Self {
        match result {
            EPResult::Permitted => Some(Action::Accept),
            EPResult::Denied => Some(Action::Reject),
            EPResult::NoMatch => None,
        }
    }
}
