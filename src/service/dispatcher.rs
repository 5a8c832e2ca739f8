use super::publisher::{CycleSummary, TaskPublisher};
use crate::db::ConnectionStore;
use crate::error::DispatchError;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Instrument, error, info, info_span};

/// One enumerate-then-publish pass over the active connections of a connector.
pub struct Dispatcher {
    connector_id: i64,
    connections: Arc<dyn ConnectionStore>,
    publisher: TaskPublisher,
    cycles: AtomicU64,
}

impl Dispatcher {
    pub fn new(
        connector_id: i64,
        connections: Arc<dyn ConnectionStore>,
        publisher: TaskPublisher,
    ) -> Self {
        Self {
            connector_id,
            connections,
            publisher,
            cycles: AtomicU64::new(0),
        }
    }

    /// Number of cycles started so far.
    pub fn cycles_started(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// `Err` means the cycle aborted before anything was published.
    pub async fn run_cycle(&self) -> Result<CycleSummary, DispatchError> {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let span = info_span!("dispatch_cycle", cycle, connector_id = self.connector_id);
        self.run_cycle_inner().instrument(span).await
    }

    async fn run_cycle_inner(&self) -> Result<CycleSummary, DispatchError> {
        info!("dispatch cycle started");

        let connections = self
            .connections
            .list_active(self.connector_id)
            .await
            .map_err(|e| match e {
                e @ (DispatchError::ResourceInitFailed(_) | DispatchError::QueryFailed(_)) => e,
                other => DispatchError::QueryFailed(Box::new(other)),
            })
            .inspect_err(|e| error!(error = %e, "dispatch cycle aborted"))?;

        let summary = self
            .publisher
            .publish_all(self.connector_id, connections)
            .await;

        info!(
            enumerated = summary.enumerated,
            published = summary.published.len(),
            failed = summary.failed.len(),
            "dispatch cycle finished"
        );
        Ok(summary)
    }
}
