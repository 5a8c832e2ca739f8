use crate::error::DispatchError;
use crate::secrets::{CredentialBundle, DatabaseCredentials, SecretResolver};
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

/// Builds the pooled data-store handle from resolved credentials.
#[async_trait]
pub trait HandleFactory: Send + Sync {
    type Handle: Clone + Send + Sync + 'static;

    async fn connect(&self, creds: &DatabaseCredentials) -> Result<Self::Handle, DispatchError>;
}

#[derive(Debug, Clone)]
pub struct PgPoolFactory {
    pub max_connections: u32,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
}

#[async_trait]
impl HandleFactory for PgPoolFactory {
    type Handle = PgPool;

    async fn connect(&self, creds: &DatabaseCredentials) -> Result<PgPool, DispatchError> {
        let opts = PgConnectOptions::new()
            .host(&creds.host)
            .port(creds.port)
            .username(&creds.user)
            .password(&creds.password)
            .database(&creds.database);

        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .idle_timeout(Some(self.idle_timeout))
            .acquire_timeout(self.connect_timeout)
            .connect_with(opts)
            .await?;
        Ok(pool)
    }
}

struct Initialized<H> {
    bundle: CredentialBundle,
    handle: H,
}

/// Process-lifetime holder for the credential bundle and the pooled handle.
///
/// The first successful `get_shared_handle` resolves the secret and builds the
/// pool; concurrent first callers wait on the same initialization. A failed
/// initialization leaves the holder empty so the next call starts over.
/// Nothing is refreshed or closed afterwards.
pub struct SharedResource<F: HandleFactory> {
    resolver: SecretResolver,
    secret_id: String,
    credentials_group: String,
    factory: F,
    cell: OnceCell<Initialized<F::Handle>>,
}

impl<F: HandleFactory> SharedResource<F> {
    pub fn new(
        resolver: SecretResolver,
        secret_id: impl Into<String>,
        credentials_group: impl Into<String>,
        factory: F,
    ) -> Self {
        Self {
            resolver,
            secret_id: secret_id.into(),
            credentials_group: credentials_group.into(),
            factory,
            cell: OnceCell::new(),
        }
    }

    pub async fn get_shared_handle(&self) -> Result<F::Handle, DispatchError> {
        let ready = self
            .cell
            .get_or_try_init(|| async {
                self.initialize()
                    .await
                    .map_err(|e| DispatchError::ResourceInitFailed(Box::new(e)))
            })
            .await?;
        Ok(ready.handle.clone())
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    pub fn credentials(&self) -> Option<&CredentialBundle> {
        self.cell.get().map(|ready| &ready.bundle)
    }

    async fn initialize(&self) -> Result<Initialized<F::Handle>, DispatchError> {
        let bundle = self.resolver.resolve(&self.secret_id).await?;
        let creds = bundle.database(&self.credentials_group)?;
        let handle = self.factory.connect(&creds).await?;
        info!(
            host = %creds.host,
            port = creds.port,
            database = %creds.database,
            "data-store pool initialized"
        );
        Ok(Initialized { bundle, handle })
    }
}
