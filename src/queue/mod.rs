pub mod accessor;
pub mod resolver;

pub use accessor::{DirectQueueAccessor, MutexedQueueAccessor, QueueAccessor};
pub use resolver::{resolve, FamilyPlan, QueueAssignment, QueuePlan};
