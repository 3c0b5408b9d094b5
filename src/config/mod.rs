//! Mapping configuration model.
//!
//! A [`MappingConfig`] is the versioned, JSON-described contract between the
//! batch pipeline and the engine: an ordered list of [`FieldMapping`]s, each
//! naming how its value is produced ([`Transformation`]) and where it lands in
//! the fixed-width output (`targetPosition` + `length`).
//!
//! The JSON schema uses camelCase keys and a `transformationType` tag:
//!
//! ```json
//! {
//!   "sourceSystem": "CORE_BANKING",
//!   "jobName": "ACCT_EXTRACT",
//!   "transactionType": "NEW_ACCOUNT",
//!   "version": "1.0",
//!   "fields": [
//!     { "fieldName": "recordType", "targetPosition": 1, "length": 6,
//!       "transformationType": "constant", "value": "000001" },
//!     { "fieldName": "acctNum", "targetPosition": 2, "length": 18,
//!       "transformationType": "source", "sourceField": "acct_num",
//!       "pad": "right" }
//!   ]
//! }
//! ```

pub mod validate;

use serde::{Deserialize, Serialize};

use crate::expr;

// =============================================================================
// Configuration
// =============================================================================

/// A complete mapping configuration for one output record layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingConfig {
    /// Originating system identifier (e.g. "CORE_BANKING").
    #[serde(default)]
    pub source_system: String,

    /// Batch job this layout belongs to.
    #[serde(default)]
    pub job_name: String,

    /// Transaction type the layout encodes.
    #[serde(default)]
    pub transaction_type: String,

    /// Version of the configuration format.
    #[serde(default = "default_version")]
    pub version: String,

    /// Field mappings. Output order is by `targetPosition`, not by the
    /// declaration order here.
    pub fields: Vec<FieldMapping>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl MappingConfig {
    /// Create an empty configuration with identity metadata.
    pub fn new(
        source_system: impl Into<String>,
        job_name: impl Into<String>,
        transaction_type: impl Into<String>,
    ) -> Self {
        Self {
            source_system: source_system.into(),
            job_name: job_name.into(),
            transaction_type: transaction_type.into(),
            version: default_version(),
            fields: Vec::new(),
        }
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse a configuration from a JSON value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Add a field mapping (builder style).
    pub fn with_field(mut self, field: FieldMapping) -> Self {
        self.fields.push(field);
        self
    }

    /// Every source column referenced by the configuration: direct source
    /// fields, composite components, and field references inside conditional
    /// expressions. Expressions that fail to parse contribute nothing here;
    /// the validator reports them separately.
    pub fn source_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for field in &self.fields {
            match &field.transformation {
                Transformation::Source { source_field } => {
                    columns.push(source_field.clone());
                }
                Transformation::Composite { sources, .. } => {
                    columns.extend(sources.iter().cloned());
                }
                Transformation::Conditional { conditions } => {
                    for cond in conditions {
                        for if_expr in cond.if_exprs() {
                            if let Ok(parsed) = expr::parse(if_expr) {
                                parsed.collect_field_refs(&mut columns);
                            }
                        }
                    }
                }
                Transformation::Constant { .. } | Transformation::Blank => {}
            }
        }
        columns.sort();
        columns.dedup();
        columns
    }

    /// Total width of the output record in characters.
    pub fn record_len(&self) -> usize {
        self.fields.iter().map(|f| f.length).sum()
    }
}

// =============================================================================
// Field Mapping
// =============================================================================

/// Declared type of an output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    String,
    Number,
    Date,
    Boolean,
}

/// Which side of the value receives padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadDirection {
    Left,
    Right,
}

/// One configured output field and its value-resolution rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    /// Unique identifier of the mapping within the configuration.
    pub field_name: String,

    /// Output label, when it differs from `field_name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_field: Option<String>,

    /// 1-based position; determines output order.
    pub target_position: u32,

    /// Output slot width in characters.
    pub length: usize,

    #[serde(default)]
    pub data_type: DataType,

    /// Numeric picture clause, e.g. `9(13)V99` (implied decimal).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Date pattern of the incoming value (default ISO `yyyy-MM-dd`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_format: Option<String>,

    /// Date pattern of the emitted value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_format: Option<String>,

    /// How the field's value is produced.
    #[serde(flatten)]
    pub transformation: Transformation,

    /// Padding side. Defaults to left for numbers, right otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pad: Option<PadDirection>,

    /// Padding character. Defaults to `'0'` for numbers, space otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pad_char: Option<char>,

    /// Fallback when resolution yields null/empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,

    /// A failure on a required field is fatal for the whole record.
    #[serde(default)]
    pub required: bool,

    // Classification metadata: carried through for the audit collaborator,
    // never interpreted by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pii_classification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_level: Option<String>,
}

impl FieldMapping {
    fn base(name: impl Into<String>, transformation: Transformation, position: u32, length: usize) -> Self {
        Self {
            field_name: name.into(),
            target_field: None,
            target_position: position,
            length,
            data_type: DataType::String,
            format: None,
            source_format: None,
            target_format: None,
            transformation,
            pad: None,
            pad_char: None,
            default_value: None,
            required: false,
            pii_classification: None,
            encryption_level: None,
            compliance_level: None,
        }
    }

    /// Direct copy of one source column.
    pub fn source(name: impl Into<String>, source_field: impl Into<String>, position: u32, length: usize) -> Self {
        Self::base(
            name,
            Transformation::Source { source_field: source_field.into() },
            position,
            length,
        )
    }

    /// Fixed value, identical for every row.
    pub fn constant(name: impl Into<String>, value: impl Into<String>, position: u32, length: usize) -> Self {
        Self::base(name, Transformation::Constant { value: value.into() }, position, length)
    }

    /// Combination of several source columns.
    pub fn composite(
        name: impl Into<String>,
        sources: Vec<String>,
        transform: CompositeOp,
        position: u32,
        length: usize,
    ) -> Self {
        Self::base(
            name,
            Transformation::Composite { sources, transform, delimiter: None },
            position,
            length,
        )
    }

    /// Value selected by an ordered if/else-if/else chain.
    pub fn conditional(name: impl Into<String>, conditions: Vec<Condition>, position: u32, length: usize) -> Self {
        Self::base(name, Transformation::Conditional { conditions }, position, length)
    }

    /// Filler slot; always resolves to the default value.
    pub fn blank(name: impl Into<String>, position: u32, length: usize) -> Self {
        Self::base(name, Transformation::Blank, position, length)
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_target_field(mut self, target: impl Into<String>) -> Self {
        self.target_field = Some(target.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_source_format(mut self, format: impl Into<String>) -> Self {
        self.source_format = Some(format.into());
        self
    }

    pub fn with_target_format(mut self, format: impl Into<String>) -> Self {
        self.target_format = Some(format.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_pad(mut self, pad: PadDirection) -> Self {
        self.pad = Some(pad);
        self
    }

    pub fn with_pad_char(mut self, c: char) -> Self {
        self.pad_char = Some(c);
        self
    }

    pub fn with_delimiter(mut self, delim: impl Into<String>) -> Self {
        if let Transformation::Composite { delimiter, .. } = &mut self.transformation {
            *delimiter = Some(delim.into());
        }
        self
    }

    /// Mark as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Output label, falling back to the field name.
    pub fn target_field(&self) -> &str {
        self.target_field.as_deref().unwrap_or(&self.field_name)
    }

    /// Padding side after applying the data-type default.
    pub fn effective_pad(&self) -> PadDirection {
        self.pad.unwrap_or(match self.data_type {
            DataType::Number => PadDirection::Left,
            _ => PadDirection::Right,
        })
    }

    /// Padding character after applying the data-type default.
    pub fn effective_pad_char(&self) -> char {
        self.pad_char.unwrap_or(match self.data_type {
            DataType::Number => '0',
            _ => ' ',
        })
    }
}

// =============================================================================
// Transformation
// =============================================================================

/// How a composite field combines its sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeOp {
    /// Join resolved values in declared order.
    Concat,
    /// Decimal sum of the resolved values.
    Sum,
}

/// The value-resolution rule of a field mapping: a closed tagged union keyed
/// by `transformationType` in the JSON schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "transformationType", rename_all = "lowercase")]
pub enum Transformation {
    /// Copy one source column.
    #[serde(rename_all = "camelCase")]
    Source { source_field: String },

    /// Fixed value; may be the empty string but never absent.
    Constant { value: String },

    /// Combine several source columns.
    #[serde(rename_all = "camelCase")]
    Composite {
        sources: Vec<String>,
        transform: CompositeOp,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delimiter: Option<String>,
    },

    /// Ordered if/else-if/else chains evaluated against the row.
    Conditional { conditions: Vec<Condition> },

    /// No source data; the field is filler.
    Blank,
}

impl Transformation {
    /// Tag name as it appears in the JSON schema.
    pub fn type_name(&self) -> &'static str {
        match self {
            Transformation::Source { .. } => "source",
            Transformation::Constant { .. } => "constant",
            Transformation::Composite { .. } => "composite",
            Transformation::Conditional { .. } => "conditional",
            Transformation::Blank => "blank",
        }
    }
}

// =============================================================================
// Conditions
// =============================================================================

/// One if/else-if/else chain. `elseIfExprs` order is semantically significant:
/// the first branch whose expression evaluates true wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub if_expr: String,

    /// Literal, or a bare identifier resolved as a row column.
    pub then: String,

    #[serde(default, rename = "elseIfExprs", skip_serializing_if = "Vec::is_empty")]
    pub else_ifs: Vec<ElseIf>,

    #[serde(default, rename = "elseExpr", skip_serializing_if = "Option::is_none")]
    pub else_value: Option<String>,
}

/// A nested `{ifExpr, then}` pair inside a [`Condition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElseIf {
    pub if_expr: String,
    pub then: String,
}

impl Condition {
    pub fn new(if_expr: impl Into<String>, then: impl Into<String>) -> Self {
        Self {
            if_expr: if_expr.into(),
            then: then.into(),
            else_ifs: Vec::new(),
            else_value: None,
        }
    }

    pub fn with_else_if(mut self, if_expr: impl Into<String>, then: impl Into<String>) -> Self {
        self.else_ifs.push(ElseIf { if_expr: if_expr.into(), then: then.into() });
        self
    }

    pub fn with_else(mut self, value: impl Into<String>) -> Self {
        self.else_value = Some(value.into());
        self
    }

    /// All expression strings of the chain, in evaluation order.
    pub fn if_exprs(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.if_expr.as_str()).chain(self.else_ifs.iter().map(|e| e.if_expr.as_str()))
    }
}

// =============================================================================
// Example configuration (for docs and tests)
// =============================================================================

/// A small but representative configuration: constant header, direct copy,
/// composite name, conditional status flag, numeric amount, filler.
pub fn example_config() -> MappingConfig {
    MappingConfig::new("CORE_BANKING", "ACCT_EXTRACT", "NEW_ACCOUNT")
        .with_field(FieldMapping::constant("recordType", "000001", 1, 6).required())
        .with_field(
            FieldMapping::source("acctNum", "acct_num", 2, 18)
                .with_pad(PadDirection::Right)
                .required(),
        )
        .with_field(
            FieldMapping::composite(
                "customerName",
                vec!["first_name".into(), "last_name".into()],
                CompositeOp::Concat,
                3,
                30,
            )
            .with_delimiter(" "),
        )
        .with_field(
            FieldMapping::conditional(
                "statusFlag",
                vec![Condition::new("status == 'ACTIVE'", "A").with_else("I")],
                4,
                1,
            )
            .with_default("I"),
        )
        .with_field(
            FieldMapping::source("balance", "current_balance", 5, 15)
                .with_data_type(DataType::Number)
                .with_format("9(13)V99")
                .with_default("0"),
        )
        .with_field(FieldMapping::blank("filler", 6, 10).with_default(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = example_config();
        let json = config.to_json().unwrap();
        let parsed = MappingConfig::from_json(&json).unwrap();
        assert_eq!(parsed.version, config.version);
        assert_eq!(parsed.fields.len(), config.fields.len());
        assert_eq!(parsed.record_len(), config.record_len());
    }

    #[test]
    fn test_transformation_type_tag() {
        let json = r#"{
            "fieldName": "acctNum",
            "targetPosition": 1,
            "length": 18,
            "transformationType": "source",
            "sourceField": "acct_num"
        }"#;
        let mapping: FieldMapping = serde_json::from_str(json).unwrap();
        assert!(matches!(
            mapping.transformation,
            Transformation::Source { ref source_field } if source_field == "acct_num"
        ));
        assert_eq!(mapping.data_type, DataType::String);
        assert!(!mapping.required);
    }

    #[test]
    fn test_conditional_schema_keys() {
        let json = r#"{
            "fieldName": "statusFlag",
            "targetPosition": 1,
            "length": 1,
            "transformationType": "conditional",
            "conditions": [{
                "ifExpr": "status == 'ACTIVE'",
                "then": "A",
                "elseIfExprs": [{ "ifExpr": "status == 'DORMANT'", "then": "D" }],
                "elseExpr": "I"
            }]
        }"#;
        let mapping: FieldMapping = serde_json::from_str(json).unwrap();
        let Transformation::Conditional { conditions } = &mapping.transformation else {
            panic!("expected conditional");
        };
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].else_ifs.len(), 1);
        assert_eq!(conditions[0].else_value.as_deref(), Some("I"));
    }

    #[test]
    fn test_effective_padding_defaults() {
        let s = FieldMapping::source("name", "name", 1, 10);
        assert_eq!(s.effective_pad(), PadDirection::Right);
        assert_eq!(s.effective_pad_char(), ' ');

        let n = FieldMapping::source("amt", "amt", 2, 10).with_data_type(DataType::Number);
        assert_eq!(n.effective_pad(), PadDirection::Left);
        assert_eq!(n.effective_pad_char(), '0');
    }

    #[test]
    fn test_source_columns() {
        let config = example_config();
        let columns = config.source_columns();
        assert!(columns.contains(&"acct_num".to_string()));
        assert!(columns.contains(&"first_name".to_string()));
        assert!(columns.contains(&"last_name".to_string()));
        assert!(columns.contains(&"current_balance".to_string()));
        // From the conditional expression.
        assert!(columns.contains(&"status".to_string()));
    }

    #[test]
    fn test_target_field_fallback() {
        let plain = FieldMapping::source("acctNum", "acct_num", 1, 18);
        assert_eq!(plain.target_field(), "acctNum");
        let labelled = plain.with_target_field("ACCOUNT_NUMBER");
        assert_eq!(labelled.target_field(), "ACCOUNT_NUMBER");
    }
}
