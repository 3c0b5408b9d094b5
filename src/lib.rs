//! # Fieldmap - configuration-driven fixed-width record mapping
//!
//! Fieldmap turns typed source rows from core banking extracts into
//! fixed-width batch records, driven by a versioned JSON mapping
//! configuration instead of per-feed code.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ JSON Config │────▶│  Validator  │────▶│   Engine    │────▶│ Fixed-width │
//! │ (versioned) │     │ (pre-flight)│     │ (per row)   │     │   record    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fieldmap::{Engine, EngineOptions, MappingConfig, Row};
//!
//! let config = MappingConfig::from_json(&json)?;
//! let engine = Engine::new(config, EngineOptions::default())?;
//! let out = engine.transform(&Row::new([("acct_num", "9876543210")]));
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types and per-field issues
//! - [`config`] - Mapping configuration model and validator
//! - [`row`] - Typed input rows and values
//! - [`expr`] - Conditional expression mini-language (parser + evaluator)
//! - [`transform`] - Value resolution, formatting, and record assembly

// Core modules
pub mod error;
pub mod row;

// Configuration
pub mod config;

// Expression language
pub mod expr;

// Transformation
pub mod transform;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    EngineError,
    FieldError,
    FieldIssue,
    IssueKind,
    Severity,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{
    example_config,
    validate::validate,
    CompositeOp,
    Condition,
    DataType,
    FieldMapping,
    MappingConfig,
    PadDirection,
    Transformation,
};

// =============================================================================
// Re-exports - Rows
// =============================================================================

pub use row::{Row, Value};

// =============================================================================
// Re-exports - Engine
// =============================================================================

pub use transform::{Engine, EngineOptions, OverflowPolicy, Transformed};
