//! Outbound side of the dispatcher: the `SyncTask` message and the queue it is sent to.

pub mod sqs;
pub mod task;

pub use sqs::{SqsTaskQueue, TaskQueue};
pub use task::{PublishReceipt, SyncTask, SyncTaskBody};
