//! Precompiled header task generation and queueing

pub mod task;
pub mod task_generator;
pub mod task_queue;
pub mod tasks_merger;
pub mod used_macro_filter;

pub use task::{PchKind, PchTask, PchTaskSet};
pub use task_generator::PchTaskGenerator;
#[cfg(test)]
pub use task_queue::MockPchTaskQueueTrait;
pub use task_queue::{PchTaskQueue, PchTaskQueueTrait};
pub use tasks_merger::PchTasksMerger;
pub use used_macro_filter::UsedMacroFilter;
