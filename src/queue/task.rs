use crate::db::Connection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncTaskKind {
    #[serde(rename = "SYNC")]
    Sync,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTaskBody {
    pub user_id: String,
    pub folder_id: String,
    pub connection_id: i64,
}

/// Instruction for a downstream worker to synchronize one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTask {
    #[serde(rename = "type")]
    pub kind: SyncTaskKind,
    pub body: SyncTaskBody,
}

impl SyncTask {
    pub fn for_connection(connection: &Connection) -> Self {
        Self {
            kind: SyncTaskKind::Sync,
            body: SyncTaskBody {
                user_id: connection.user_id.clone(),
                folder_id: connection.name.clone(),
                connection_id: connection.id,
            },
        }
    }

    /// Compact JSON, the form placed in the queue message body.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub connection_id: i64,
    pub message_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_folder_from_connection_name() {
        let conn = Connection {
            id: 1,
            user_id: "u1".to_string(),
            name: "f1".to_string(),
            connector_id: 6,
            status: "Active".to_string(),
        };
        let encoded = SyncTask::for_connection(&conn).encode().expect("encode");
        assert_eq!(
            encoded,
            r#"{"type":"SYNC","body":{"userId":"u1","folderId":"f1","connectionId":1}}"#
        );
    }
}
