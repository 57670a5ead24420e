use std::net::IpAddr;

use endpoints_common::{Action, EPResult, Scope};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    connection::{ConnectionRecord, Direction},
    entity::Entity,
    firewall::Decision,
};

/// One line of the verdict log.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct VerdictLog<'a> {
    uuid: Uuid,
    timestamp: String,
    direction: Direction,
    domain: Option<&'a str>,
    ip: IpAddr,
    protocol: u8,
    port: u16,
    /// Only present if a rule needed it.
    scope: Option<Scope>,
    result: EPResult,
    action: Action,
    rule: Option<&'a str>,
    error: Option<String>,
}

impl<'a> VerdictLog<'a> {
    fn new(record: &ConnectionRecord, entity: &'a Entity, decision: &'a Decision) -> Self {
        let timestamp =
            chrono::offset::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        Self {
            uuid: record.id,
            timestamp,
            direction: record.direction,
            domain: entity.domain(),
            ip: record.remote_ip,
            protocol: record.protocol,
            port: entity.port(),
            scope: entity.cached_scope(),
            result: decision.result,
            action: decision.action,
            rule: decision.evaluation.reason.as_deref(),
            error: decision.evaluation.error.as_ref().map(ToString::to_string),
        }
    }
}

/// Logs the decision as JSON under the `verdict_log` target.
pub(crate) fn log_verdict(record: &ConnectionRecord, entity: &Entity, decision: &Decision) {
    let line = match serde_json::to_string(&VerdictLog::new(record, entity, decision)) {
        Ok(line) => line,
        Err(err) => {
            tracing::warn!(%err, "could not format verdict");
            return;
        }
    };
    tracing::info!(target: "verdict_log", "{line}");
}
