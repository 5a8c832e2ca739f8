//! Secret Resolver: fetches the credential bundle from the secret store.
//!
//! Layout:
//! - `store.rs`: `SecretStore` seam and the Secrets Manager adapter
//! - `bundle.rs`: two-level bundle parsing and typed credential groups

pub mod bundle;
pub mod store;

pub use bundle::{CredentialBundle, DatabaseCredentials};
pub use store::{SecretResolver, SecretStore, SecretsManagerStore};
