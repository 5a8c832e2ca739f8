//! Data-store side of the dispatcher.
//!
//! Layout:
//! - `models.rs`: the read-only `Connection` row
//! - `pool.rs`: lazily initialized, process-wide pool handle
//! - `connections.rs`: enumeration of active connections

pub mod connections;
pub mod models;
pub mod pool;

pub use connections::{ConnectionStore, PgConnectionStore};
pub use models::{ACTIVE_STATUS, Connection};
pub use pool::{HandleFactory, PgPoolFactory, SharedResource};
