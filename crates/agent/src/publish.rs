use crate::config::StatsdConfig;
use crate::sink::{Namespace, Sink, SinkError, StatsdSink};
use crate::status::StatusSnapshot;
use tracing::trace;

/// Subsystems a snapshot is published as, in publish order.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, strum::Display)]
pub enum MetricGroup {
    #[strum(serialize = "connections")]
    Connections,
    #[strum(serialize = "ops")]
    Ops,
    #[strum(serialize = "mem")]
    Mem,
    #[strum(serialize = "global_lock")]
    GlobalLock,
    #[strum(serialize = "extra")]
    Extra,
}

pub const GROUP_ORDER: [MetricGroup; 5] = [
    MetricGroup::Connections,
    MetricGroup::Ops,
    MetricGroup::Mem,
    MetricGroup::GlobalLock,
    MetricGroup::Extra,
];

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("failed to publish {metric}: {source}")]
    Gauge {
        metric: &'static str,
        #[source]
        source: SinkError,
    },
}

/// The fixed gauge table for one group. Names are relative to the sink's
/// namespace; values pass through as-is.
fn group_gauges(status: &StatusSnapshot, group: MetricGroup) -> Vec<(&'static str, i64)> {
    match group {
        MetricGroup::Connections => vec![
            ("connections.current", status.connections.current),
            ("connections.available", status.connections.available),
            ("connections.created", status.connections.total_created),
        ],
        MetricGroup::Ops => vec![
            ("ops.inserts", status.opcounters.insert),
            ("ops.queries", status.opcounters.query),
            ("ops.updates", status.opcounters.update),
            ("ops.deletes", status.opcounters.delete),
            ("ops.getmores", status.opcounters.getmore),
            ("ops.commands", status.opcounters.command),
        ],
        MetricGroup::Mem => vec![
            ("mem.resident", status.mem.resident),
            ("mem.virtual", status.mem.virtual_mem),
            ("mem.mapped", status.mem.mapped),
            ("mem.mapped_with_journal", status.mem.mapped_with_journal),
        ],
        MetricGroup::GlobalLock => vec![
            ("global_lock.total_time", status.global_lock.total_time),
            ("global_lock.lock_time", status.global_lock.lock_time),
            (
                "global_lock.active_readers",
                status.global_lock.active_clients.readers,
            ),
            (
                "global_lock.active_writers",
                status.global_lock.active_clients.writers,
            ),
            (
                "global_lock.active_total",
                status.global_lock.active_clients.total,
            ),
            (
                "global_lock.queued_readers",
                status.global_lock.current_queue.readers,
            ),
            (
                "global_lock.queued_writers",
                status.global_lock.current_queue.writers,
            ),
            (
                "global_lock.queued_total",
                status.global_lock.current_queue.total,
            ),
        ],
        MetricGroup::Extra => vec![
            ("extra.page_faults", status.extra_info.page_faults),
            ("extra.heap_usage", status.extra_info.heap_usage_bytes),
        ],
    }
}

async fn push_group<S: Sink>(
    sink: &S,
    status: &StatusSnapshot,
    group: MetricGroup,
) -> Result<(), PublishError> {
    for (metric, value) in group_gauges(status, group) {
        sink.gauge(metric, value)
            .await
            .map_err(|source| PublishError::Gauge { metric, source })?;
    }
    trace!("published {group} gauges");
    Ok(())
}

/// Pushes every mapped field of one snapshot through the sink, group by
/// group in table order. The first transport failure aborts the rest of the
/// cycle's publishing; gauges already sent stand, there is no rollback.
pub async fn push_all<S: Sink>(sink: &S, status: &StatusSnapshot) -> Result<(), PublishError> {
    for group in GROUP_ORDER {
        push_group(sink, status, group).await?;
    }
    Ok(())
}

/// Owns the statsd side of one cycle: builds the namespace for the snapshot
/// host, connects a fresh sink, pushes all fields, releases the sink.
#[derive(Debug)]
pub struct Publisher {
    config: StatsdConfig,
}

impl Publisher {
    pub fn new(config: StatsdConfig) -> Self {
        Self { config }
    }

    pub async fn publish(&self, status: &StatusSnapshot) -> Result<(), PublishError> {
        let namespace = Namespace::new(
            &self.config.env,
            self.config.cluster.as_deref(),
            &status.host,
        );
        let sink = StatsdSink::connect(&self.config.host, self.config.port, namespace).await?;
        push_all(&sink, status).await
    }
}
