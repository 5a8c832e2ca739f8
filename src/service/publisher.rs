use crate::db::Connection;
use crate::error::DispatchError;
use crate::queue::{PublishReceipt, SyncTask, TaskQueue};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Per-item outcomes of one dispatch cycle.
#[derive(Debug, Default)]
pub struct CycleSummary {
    pub connector_id: i64,
    pub enumerated: usize,
    pub published: Vec<PublishReceipt>,
    pub failed: Vec<DispatchError>,
}

impl CycleSummary {
    pub fn attempted(&self) -> usize {
        self.published.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct TaskPublisher {
    queue: Arc<dyn TaskQueue>,
    deadline: Duration,
    concurrency: usize,
}

impl TaskPublisher {
    /// `deadline` bounds one item end to end, retries included.
    pub fn new(queue: Arc<dyn TaskQueue>, deadline: Duration, concurrency: usize) -> Self {
        Self {
            queue,
            deadline,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn publish(&self, connection: &Connection) -> Result<PublishReceipt, DispatchError> {
        let connection_id = connection.id;
        let failed = |reason: String| DispatchError::PublishFailed {
            connection_id,
            reason,
        };

        let encoded = SyncTask::for_connection(connection)
            .encode()
            .map_err(|e| failed(e.to_string()))?;

        let message_id = tokio::time::timeout(self.deadline, self.queue.send(&encoded))
            .await
            .map_err(|_| failed(format!("no acknowledgement within {:?}", self.deadline)))?
            .map_err(|e| failed(e.to_string()))?;

        Ok(PublishReceipt {
            connection_id,
            message_id,
        })
    }

    /// Publishes every connection independently; one failure never stops the rest.
    pub async fn publish_all(&self, connector_id: i64, connections: Vec<Connection>) -> CycleSummary {
        let enumerated = connections.len();
        let outcomes: Vec<_> = stream::iter(connections)
            .map(|connection| async move { self.publish(&connection).await })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut summary = CycleSummary {
            connector_id,
            enumerated,
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                Ok(receipt) => {
                    info!(
                        connection_id = receipt.connection_id,
                        message_id = %receipt.message_id,
                        "sync task published"
                    );
                    summary.published.push(receipt);
                }
                Err(e) => {
                    warn!(error = %e, "sync task not published");
                    summary.failed.push(e);
                }
            }
        }
        summary
    }
}
