//! Shared test utilities for pagewise integration tests.
//!
//! This module provides:
//! - Scriptable fake stages and an in-memory artifact index
//! - `TestHarness` wiring a `JobService` around them
//! - `ConfigBuilder` for creating configurations programmatically

pub mod builders;
pub mod harness;
pub mod stages;

pub use builders::*;
pub use harness::*;
pub use stages::*;
