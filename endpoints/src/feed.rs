#![cfg(feature = "tokio")]

use std::sync::Arc;

use tokio::{sync::mpsc::Receiver, task::JoinSet};

use crate::{
    connection::{ConnectionRecord, VerdictSink},
    firewall::Firewall,
    Result,
};

/// Decides every record received on `records` and hands the decision to `sink`.
///
/// Each record is decided and delivered on the blocking pool on its own, so
/// a slow lookup only holds back the connection that needs it. Verdicts reach
/// the sink in the order they are reached, not in the order of the records.
/// Returns once the sending side is closed and every pending record is
/// delivered, or with an error once the sink stops accepting verdicts.
pub async fn run<S>(
    firewall: Arc<Firewall>,
    mut records: Receiver<ConnectionRecord>,
    sink: Arc<S>,
) -> Result<()>
where
    S: VerdictSink + ?Sized + 'static,
{
    let mut pending = JoinSet::new();
    loop {
        tokio::select! {
            record = records.recv() => {
                let Some(record) = record else { break };
                let (fw, sink) = (firewall.clone(), sink.clone());
                pending.spawn_blocking(move || {
                    let decision = fw.decide_record(&record);
                    sink.deliver(record.id, &decision)
                });
            }
            Some(delivered) = pending.join_next() => delivered??,
        }
    }
    tracing::debug!(pending = pending.len(), "connection feed closed");
    while let Some(delivered) = pending.join_next().await {
        delivered??;
    }
    Ok(())
}
