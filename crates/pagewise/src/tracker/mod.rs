pub mod job;
pub mod percent;
pub mod store;

pub use job::{Job, JobStatus, PageErrorEntry};
pub use store::{CleanupReport, JobStore};
