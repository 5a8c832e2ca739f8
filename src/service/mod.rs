pub mod dispatcher;
pub mod publisher;
pub mod scheduler;

pub use dispatcher::Dispatcher;
pub use publisher::{CycleSummary, TaskPublisher};
pub use scheduler::{Scheduler, SchedulerState};
