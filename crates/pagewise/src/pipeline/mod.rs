pub mod error;
pub mod page;
pub mod progress;
pub mod result;

pub use error::PageDefect;
pub use page::{PagePipeline, StageTimeouts};
pub use progress::{NoopProgress, PageSubstep, ProgressReporter, TrackerProgress};
pub use result::{ActionItem, AnalysisBundle, PageAnalysis, PageResult, Summary};
