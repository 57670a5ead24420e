use std::{net::IpAddr, sync::Arc};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{entity::Entity, firewall::Decision, intel::Intel, Result};

#[repr(u8)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, num_derive::FromPrimitive, Serialize, Deserialize,
)]
pub enum Direction {
    Inbound = 0,
    Outbound = 1,
}

/// Connection as delivered by the interception layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub id: Uuid,
    pub direction: Direction,
    pub protocol: u8,
    pub local_ip: IpAddr,
    pub local_port: u16,
    pub remote_ip: IpAddr,
    pub remote_port: u16,
    /// Domain the remote IP was resolved from, if known.
    pub domain: Option<String>,
}

impl ConnectionRecord {
    pub fn new(
        direction: Direction,
        protocol: u8,
        local: (IpAddr, u16),
        remote: (IpAddr, u16),
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            direction,
            protocol,
            local_ip: local.0,
            local_port: local.1,
            remote_ip: remote.0,
            remote_port: remote.1,
            domain: None,
        }
    }

    pub fn with_domain(self, domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            ..self
        }
    }

    /// The service port: the remote port for outbound connections and the
    /// local one for inbound connections.
    pub fn port(&self) -> u16 {
        match self.direction {
            Direction::Outbound => self.remote_port,
            Direction::Inbound => self.local_port,
        }
    }

    /// Entity for the remote end of the connection.
    pub fn entity(&self, intel: Arc<Intel>) -> Entity {
        let entity = Entity::with_intel(intel)
            .with_ip(self.remote_ip)
            .with_protocol(self.protocol)
            .with_port(self.port());
        match &self.domain {
            Some(domain) => entity.with_domain(domain),
            None => entity,
        }
    }
}

/// Receives the final decision for every connection.
pub trait VerdictSink: Send + Sync {
    fn deliver(&self, id: Uuid, decision: &Decision) -> Result<()>;
}

#[cfg(feature = "tokio")]
impl VerdictSink for tokio::sync::mpsc::UnboundedSender<(Uuid, Decision)> {
    fn deliver(&self, id: Uuid, decision: &Decision) -> Result<()> {
        self.send((id, decision.clone()))
            .map_err(|_| crate::Error::SinkClosed)
    }
}
