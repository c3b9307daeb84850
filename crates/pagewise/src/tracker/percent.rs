//! Percentage breakpoints for job progress.
//!
//! | phase                | percentage                                   |
//! |----------------------|----------------------------------------------|
//! | preparing            | 0                                            |
//! | processing (entered) | 10                                           |
//! | page events          | 10 + 70 * (done + in-flight fractions) / total |
//! | vector_store         | 80                                           |
//! | finalizing           | 90                                           |
//! | completed            | 100                                          |
//!
//! Page events never push past the band ceiling of 80; every value below
//! 100 is reserved for non-terminal states.

use super::JobStatus;

pub const BASELINE: f64 = 10.0;
pub const PAGE_BAND: f64 = 70.0;
pub const VECTOR_STORE: f64 = BASELINE + PAGE_BAND;
pub const FINALIZING: f64 = 90.0;
pub const COMPLETE: f64 = 100.0;

/// A page still in flight never counts as fully done.
pub const MAX_IN_FLIGHT_FRACTION: f64 = 0.95;

/// Floor a status sets on entry.
pub fn status_floor(status: JobStatus) -> f64 {
    match status {
        JobStatus::Preparing => 0.0,
        JobStatus::Processing => BASELINE,
        JobStatus::VectorStore => VECTOR_STORE,
        JobStatus::Finalizing => FINALIZING,
        JobStatus::Completed => COMPLETE,
        JobStatus::Failed => 0.0,
    }
}

/// Progress within the page band for `done_pages` (may be fractional).
pub fn page_band(done_pages: f64, total_pages: usize) -> f64 {
    if total_pages == 0 {
        return BASELINE;
    }
    let ratio = (done_pages / total_pages as f64).clamp(0.0, 1.0);
    (BASELINE + ratio * PAGE_BAND).min(VECTOR_STORE)
}
