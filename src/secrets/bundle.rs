use crate::error::DispatchError;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

pub type CredentialGroup = Map<String, Value>;

/// Named credential groups resolved from one secret. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialBundle {
    groups: HashMap<String, CredentialGroup>,
}

impl CredentialBundle {
    /// Parse `{"GROUP": "{\"field\": ...}", ...}`.
    ///
    /// Inner values are JSON-encoded objects; inline objects are tolerated.
    pub fn parse(secret_string: &str) -> Result<Self, DispatchError> {
        let outer: Value = serde_json::from_str(secret_string)
            .map_err(|e| DispatchError::SecretMalformed(format!("outer payload: {e}")))?;
        let Value::Object(outer) = outer else {
            return Err(DispatchError::SecretMalformed(
                "outer payload is not an object".to_string(),
            ));
        };

        let groups = outer
            .into_iter()
            .map(|(name, inner)| {
                let group = match inner {
                    Value::String(encoded) => match serde_json::from_str::<Value>(&encoded) {
                        Ok(Value::Object(fields)) => fields,
                        Ok(_) => {
                            return Err(DispatchError::SecretMalformed(format!(
                                "group {name} does not decode to an object"
                            )));
                        }
                        Err(e) => {
                            return Err(DispatchError::SecretMalformed(format!(
                                "group {name}: {e}"
                            )));
                        }
                    },
                    Value::Object(fields) => fields,
                    _ => {
                        return Err(DispatchError::SecretMalformed(format!(
                            "group {name} is neither an encoded nor an inline object"
                        )));
                    }
                };
                Ok((name, group))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self { groups })
    }

    pub fn group(&self, name: &str) -> Option<&CredentialGroup> {
        self.groups.get(name)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Extract the typed database credentials stored under `group`.
    pub fn database(&self, group: &str) -> Result<DatabaseCredentials, DispatchError> {
        let fields = self.group(group).ok_or_else(|| {
            DispatchError::SecretMalformed(format!("missing credential group {group}"))
        })?;
        serde_json::from_value(Value::Object(fields.clone()))
            .map_err(|e| DispatchError::SecretMalformed(format!("group {group}: {e}")))
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseCredentials {
    pub user: String,
    pub host: String,
    pub database: String,
    pub password: String,
    #[serde(deserialize_with = "port_from_number_or_string")]
    pub port: u16,
}

impl std::fmt::Debug for DatabaseCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseCredentials")
            .field("user", &self.user)
            .field("host", &self.host)
            .field("database", &self.database)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .finish()
    }
}

fn port_from_number_or_string<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(n) => Ok(n),
        Port::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}
