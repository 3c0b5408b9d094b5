//! Row-to-record transformation.
//!
//! - Resolver: field mappings to raw string values
//! - Format: typed formatting, padding, and overflow handling
//! - Engine: validated, pre-compiled record assembly

pub mod engine;
pub mod format;
pub(crate) mod resolver;

pub use engine::{Engine, EngineOptions, Transformed};
pub use format::{OverflowPolicy, DEFAULT_DATE_FORMAT};
