use super::bundle::CredentialBundle;
use crate::aws::sdk_error;
use crate::error::DispatchError;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::config::retry::RetryConfig;
use aws_sdk_secretsmanager::config::timeout::TimeoutConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Opaque key-value secret provider.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Raw secret string for `secret_id`, or `None` when the store holds no value.
    async fn fetch(&self, secret_id: &str) -> Result<Option<String>, DispatchError>;
}

/// AWS Secrets Manager `GetSecretValue`. Not retried: a failed fetch fails the
/// initialization and the next cycle tries again.
pub struct SecretsManagerStore {
    client: Client,
}

impl SecretsManagerStore {
    pub fn new(sdk: &SdkConfig, timeout: Duration) -> Self {
        let timeouts = TimeoutConfig::builder()
            .connect_timeout(Duration::from_secs(5))
            .operation_timeout(timeout)
            .build();
        let conf = aws_sdk_secretsmanager::config::Builder::from(sdk)
            .timeout_config(timeouts)
            .retry_config(RetryConfig::disabled())
            .build();
        Self {
            client: Client::from_conf(conf),
        }
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn fetch(&self, secret_id: &str) -> Result<Option<String>, DispatchError> {
        match self.client.get_secret_value().secret_id(secret_id).send().await {
            Ok(out) => {
                debug!(secret_id, "secret fetched");
                Ok(out.secret_string().map(str::to_string))
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(sdk_error("GetSecretValue", err)),
        }
    }
}

/// Stateless per call: every `resolve` goes to the store.
#[derive(Clone)]
pub struct SecretResolver {
    store: Arc<dyn SecretStore>,
}

impl SecretResolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, secret_id: &str) -> Result<CredentialBundle, DispatchError> {
        let raw = self
            .store
            .fetch(secret_id)
            .await?;

        let secret_string = raw
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| DispatchError::SecretUnavailable {
                secret_id: secret_id.to_string(),
            })?;

        CredentialBundle::parse(&secret_string)
    }
}
