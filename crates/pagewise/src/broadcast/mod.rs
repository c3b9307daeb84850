//! Broadcasting of live job progress to external observers.

pub mod job_progress;

pub use job_progress::{JobProgressBroadcaster, JobProgressEvent};
