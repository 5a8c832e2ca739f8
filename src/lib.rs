pub mod aws;
pub mod config;
pub mod db;
pub mod error;
pub mod queue;
pub mod secrets;
pub mod service;

pub use config::Config;
pub use error::DispatchError;
pub use service::{CycleSummary, Dispatcher, Scheduler};
