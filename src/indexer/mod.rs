//! Symbol indexing work queue and the worker pool behind it

pub mod executor;
pub mod progress;
pub mod scheduler;
pub mod task;
pub mod task_queue;

#[cfg(test)]
pub mod testing;

pub use executor::{CompletedTask, PchBodyExecutor};
pub use progress::{Progress, ProgressCounter, ProgressSink};
#[cfg(test)]
pub use scheduler::MockWorkerScheduler;
pub use scheduler::{ExecutionError, SlotUsage, TaskExecutor, TaskScheduler, WorkerScheduler};
pub use task::{PchJob, SymbolIndexerTask, TaskKey, WorkerTask};
pub use task_queue::SymbolIndexerTaskQueue;
