//! Record assembly engine.
//!
//! [`Engine::new`] validates a configuration and compiles every conditional
//! expression and date pattern exactly once; [`Engine::transform`] then runs
//! per row without re-parsing anything. A successfully built engine always
//! emits records of the same fixed width, or no record at all when a
//! required field fails.

use tracing::{debug, warn};

use crate::config::{DataType, MappingConfig};
use crate::error::{ConfigError, ConfigResult, FieldError, FieldIssue, IssueKind};
use crate::expr::EvalContext;
use crate::row::Row;

use super::format::{self, OverflowPolicy, DEFAULT_DATE_FORMAT};
use super::resolver::{self, CompiledRule};

/// Per-engine knobs. Separate from the configuration because they are an
/// operator decision, not part of the versioned mapping document.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// What to do when a formatted value exceeds its slot width.
    pub overflow: OverflowPolicy,
}

/// One field mapping with its pre-compiled resolution rule.
#[derive(Debug)]
struct CompiledField {
    mapping: crate::config::FieldMapping,
    rule: CompiledRule,
    /// Translated chrono pattern for parsing date operands in expressions.
    date_format: String,
}

/// Compiled transformation engine for one mapping configuration.
///
/// Construction is the expensive step; `transform` is pure and the engine is
/// `Send + Sync`, so one instance can serve a whole batch across threads.
#[derive(Debug)]
pub struct Engine {
    source_system: String,
    job_name: String,
    transaction_type: String,
    version: String,
    /// Sorted by `target_position`.
    fields: Vec<CompiledField>,
    record_len: usize,
    options: EngineOptions,
}

/// Outcome of transforming one row.
#[derive(Debug)]
pub struct Transformed {
    /// The assembled fixed-width record, or `None` when a required field
    /// failed. Always exactly `Engine::record_len` characters when present.
    pub record: Option<String>,
    /// Everything that went wrong (or was degraded) along the way, in field
    /// output order.
    pub issues: Vec<FieldIssue>,
}

impl Transformed {
    /// True when a record was produced without any issue at all.
    pub fn is_clean(&self) -> bool {
        self.record.is_some() && self.issues.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == crate::error::Severity::Warning)
    }
}

impl Engine {
    /// Validate `config` and compile it into an engine.
    ///
    /// Returns every configuration violation at once; a returned engine is
    /// guaranteed to produce fixed-width records for any input row.
    pub fn new(config: MappingConfig, options: EngineOptions) -> ConfigResult<Self> {
        crate::config::validate::validate(&config)?;

        let mut violations = Vec::new();
        let mut fields = Vec::with_capacity(config.fields.len());
        for mapping in config.fields {
            // validate() already compiled these expressions once while
            // checking them; this pass builds the rules the engine keeps.
            let rule = match resolver::compile(&mapping.transformation) {
                Ok(rule) => rule,
                Err(errors) => {
                    violations.extend(errors.into_iter().map(|e| format!("field '{}': {e}", mapping.field_name)));
                    continue;
                }
            };
            let source_pattern = if mapping.data_type == DataType::Date {
                mapping.source_format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT)
            } else {
                DEFAULT_DATE_FORMAT
            };
            let date_format = match format::translate_date_format(source_pattern) {
                Ok(translated) => translated,
                Err(e) => {
                    violations.push(format!("field '{}': sourceFormat: {e}", mapping.field_name));
                    continue;
                }
            };
            fields.push(CompiledField { mapping, rule, date_format });
        }
        if !violations.is_empty() {
            return Err(ConfigError::new(violations));
        }

        fields.sort_by_key(|f| f.mapping.target_position);
        let record_len = fields.iter().map(|f| f.mapping.length).sum();

        debug!(
            source_system = %config.source_system,
            job_name = %config.job_name,
            transaction_type = %config.transaction_type,
            version = %config.version,
            fields = fields.len(),
            record_len,
            "compiled mapping configuration"
        );

        Ok(Self {
            source_system: config.source_system,
            job_name: config.job_name,
            transaction_type: config.transaction_type,
            version: config.version,
            fields,
            record_len,
            options,
        })
    }

    /// Transform one row into a fixed-width record.
    ///
    /// Never fails: a required-field problem drops the record (but keeps
    /// collecting issues for the remaining fields); a non-required problem
    /// substitutes the field's default and degrades to a warning.
    pub fn transform(&self, row: &Row) -> Transformed {
        let mut issues = Vec::new();
        let mut parts = Vec::with_capacity(self.fields.len());
        let mut fatal = false;

        for field in &self.fields {
            let mapping = &field.mapping;
            let ctx = EvalContext {
                data_type: mapping.data_type,
                date_format: &field.date_format,
            };

            let mut diags = Vec::new();
            let raw = resolver::resolve(&field.rule, mapping, row, &ctx, &mut diags);
            for diag in diags {
                warn!(field = %mapping.field_name, "{diag}");
                issues.push(FieldIssue::warning(&mapping.field_name, IssueKind::Expression, diag));
            }

            // A required field with nothing to emit (no source data, no
            // default) is fatal for the record; optional fields become filler.
            if mapping.required && raw.trim().is_empty() {
                issues.push(FieldIssue::error(
                    &mapping.field_name,
                    IssueKind::Resolution,
                    "required field resolved to an empty value",
                ));
                fatal = true;
                parts.push(String::new());
                continue;
            }

            match format::format_field(&raw, mapping, self.options.overflow) {
                Ok(formatted) => parts.push(formatted),
                Err(e) if mapping.required => {
                    issues.push(FieldIssue::error(&mapping.field_name, issue_kind(&e), e.to_string()));
                    fatal = true;
                    parts.push(String::new());
                }
                Err(e) => {
                    let default = mapping.default_value.as_deref().unwrap_or("");
                    warn!(field = %mapping.field_name, "{e}; substituting default");
                    issues.push(FieldIssue::warning(
                        &mapping.field_name,
                        issue_kind(&e),
                        format!("{e}; substituted default value"),
                    ));
                    parts.push(format::fallback_fit(default, mapping));
                }
            }
        }

        let record = if fatal { None } else { Some(parts.concat()) };
        Transformed { record, issues }
    }

    /// Fixed width of every record this engine emits.
    pub fn record_len(&self) -> usize {
        self.record_len
    }

    pub fn source_system(&self) -> &str {
        &self.source_system
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn transaction_type(&self) -> &str {
        &self.transaction_type
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

fn issue_kind(error: &FieldError) -> IssueKind {
    match error {
        FieldError::Overflow { .. } => IssueKind::Overflow,
        _ => IssueKind::Format,
    }
}
