use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const ACTIVE_STATUS: &str = "Active";

/// Row of `api_connectors.connections`; owned by the external data store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: i64,
    pub user_id: String,
    /// Folder identifier on the connector side.
    pub name: String,
    pub connector_id: i64,
    pub status: String,
}

impl Connection {
    pub fn is_active(&self) -> bool {
        self.status == ACTIVE_STATUS
    }

    pub fn is_eligible(&self, connector_id: i64) -> bool {
        self.connector_id == connector_id && self.is_active()
    }
}
