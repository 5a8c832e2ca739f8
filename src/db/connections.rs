use super::models::{ACTIVE_STATUS, Connection};
use super::pool::{PgPoolFactory, SharedResource};
use crate::error::DispatchError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Casts keep the row decodable regardless of how the upstream table types
/// its id and status columns.
pub const ACTIVE_CONNECTIONS_QUERY: &str = r#"
SELECT id::int8 AS id,
       "userId"::text AS user_id,
       name::text AS name,
       connector_id::int8 AS connector_id,
       status::text AS status
  FROM api_connectors.connections
 WHERE connector_id = $1
   AND status::text = $2
"#;

#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// One-shot, fully materialized list of active connections for `connector_id`.
    async fn list_active(&self, connector_id: i64) -> Result<Vec<Connection>, DispatchError>;
}

/// Runs a query under `limit`. Both an elapsed deadline and a driver error
/// surface as `QueryFailed`.
pub(crate) async fn bounded_query<T, F>(limit: Duration, query: F) -> Result<T, DispatchError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    tokio::time::timeout(limit, query)
        .await
        .map_err(|_| DispatchError::QueryFailed(Box::new(DispatchError::Timeout("connection query"))))?
        .map_err(|e| DispatchError::QueryFailed(Box::new(e.into())))
}

pub struct PgConnectionStore {
    resource: Arc<SharedResource<PgPoolFactory>>,
    query_timeout: Duration,
}

impl PgConnectionStore {
    pub fn new(resource: Arc<SharedResource<PgPoolFactory>>, query_timeout: Duration) -> Self {
        Self {
            resource,
            query_timeout,
        }
    }
}

#[async_trait]
impl ConnectionStore for PgConnectionStore {
    async fn list_active(&self, connector_id: i64) -> Result<Vec<Connection>, DispatchError> {
        let pool = self.resource.get_shared_handle().await?;

        let query = sqlx::query_as::<_, Connection>(ACTIVE_CONNECTIONS_QUERY)
            .bind(connector_id)
            .bind(ACTIVE_STATUS)
            .fetch_all(&pool);

        let rows = bounded_query(self.query_timeout, query).await?;

        debug!(connector_id, rows = rows.len(), "active connections loaded");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stalled_query_fails_with_timeout() {
        let stalled = std::future::pending::<Result<Vec<Connection>, sqlx::Error>>();
        let err = bounded_query(Duration::from_millis(20), stalled)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::QueryFailed(ref inner) if matches!(**inner, DispatchError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn driver_error_is_wrapped_as_query_failure() {
        let failing = async { Err::<Vec<Connection>, _>(sqlx::Error::PoolTimedOut) };
        let err = bounded_query(Duration::from_secs(1), failing)
            .await
            .unwrap_err();
        assert!(matches!(
            err.root_cause(),
            DispatchError::Database(sqlx::Error::PoolTimedOut)
        ));
    }
}
