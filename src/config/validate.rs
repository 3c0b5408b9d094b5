//! Pre-flight configuration validation.
//!
//! Runs once per configuration load, never per row. All violations are
//! collected and returned together so the configuration author sees the
//! whole picture; a configuration that fails here must never reach row
//! transformation (the engine constructor enforces that).

use std::collections::HashMap;

use crate::error::{ConfigError, ConfigResult};
use crate::transform::format::{check_picture, translate_date_format};
use crate::transform::resolver;

use super::{DataType, MappingConfig, Transformation};

/// Validate the structural invariants of a mapping configuration.
pub fn validate(config: &MappingConfig) -> ConfigResult<()> {
    let mut violations = Vec::new();

    if config.fields.is_empty() {
        violations.push("configuration has no field mappings".to_string());
    }

    // 1. fieldName unique.
    let mut seen_names: HashMap<&str, usize> = HashMap::new();
    for field in &config.fields {
        if field.field_name.trim().is_empty() {
            violations.push("a field mapping has an empty fieldName".to_string());
        }
        *seen_names.entry(field.field_name.as_str()).or_default() += 1;
    }
    for (name, count) in &seen_names {
        if *count > 1 {
            violations.push(format!("duplicate fieldName '{name}' ({count} occurrences)"));
        }
    }

    // 2. targetPosition unique and >= 1.
    let mut seen_positions: HashMap<u32, Vec<&str>> = HashMap::new();
    for field in &config.fields {
        if field.target_position < 1 {
            violations.push(format!(
                "field '{}': targetPosition must be >= 1, got {}",
                field.field_name, field.target_position
            ));
        }
        seen_positions
            .entry(field.target_position)
            .or_default()
            .push(&field.field_name);
    }
    for (position, names) in &seen_positions {
        if names.len() > 1 {
            violations.push(format!(
                "duplicate targetPosition {position} used by fields: {}",
                names.join(", ")
            ));
        }
    }

    // 3. length > 0.
    for field in &config.fields {
        if field.length == 0 {
            violations.push(format!("field '{}': length must be > 0", field.field_name));
        }
    }

    // 4. Payload completeness per transformation variant.
    for field in &config.fields {
        let name = &field.field_name;
        match &field.transformation {
            Transformation::Source { source_field } => {
                if source_field.trim().is_empty() {
                    violations.push(format!("field '{name}': source mapping has an empty sourceField"));
                }
            }
            Transformation::Constant { .. } => {
                // A constant value may be the empty string; presence is
                // enforced by the schema.
            }
            Transformation::Composite { sources, .. } => {
                if sources.is_empty() {
                    violations.push(format!("field '{name}': composite mapping has no sources"));
                }
                for (i, source) in sources.iter().enumerate() {
                    if source.trim().is_empty() {
                        violations.push(format!("field '{name}': composite source #{} is empty", i + 1));
                    }
                }
            }
            Transformation::Conditional { conditions } => {
                if conditions.is_empty() {
                    violations.push(format!("field '{name}': conditional mapping has no conditions"));
                }
                let mut has_blank = false;
                for cond in conditions {
                    for if_expr in cond.if_exprs() {
                        if if_expr.trim().is_empty() {
                            has_blank = true;
                            violations.push(format!("field '{name}': condition has an empty ifExpr"));
                        }
                    }
                }
                // resolver::compile is the one place expressions are parsed;
                // the engine later reuses it to build the rules it keeps.
                if !has_blank {
                    if let Err(errors) = resolver::compile(&field.transformation) {
                        violations.extend(
                            errors.into_iter().map(|e| format!("field '{name}': {}", first_line(&e))),
                        );
                    }
                }
            }
            Transformation::Blank => {}
        }
    }

    // 5. Format patterns (dataType and pad are closed enums; only the free-form
    // pattern strings can be wrong).
    for field in &config.fields {
        let name = &field.field_name;
        if field.data_type == DataType::Date {
            for (label, pattern) in [
                ("sourceFormat", field.source_format.as_deref()),
                ("targetFormat", field.target_format.as_deref()),
            ] {
                if let Some(pattern) = pattern {
                    if let Err(e) = translate_date_format(pattern) {
                        violations.push(format!("field '{name}': {label}: {e}"));
                    }
                }
            }
        }
        if field.data_type == DataType::Number {
            if let Some(picture) = field.format.as_deref() {
                if let Err(e) = check_picture(picture) {
                    violations.push(format!("field '{name}': format: {e}"));
                }
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::new(violations))
    }
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{example_config, Condition, FieldMapping};

    #[test]
    fn test_example_config_is_valid() {
        assert!(validate(&example_config()).is_ok());
    }

    #[test]
    fn test_empty_configuration() {
        let config = MappingConfig::new("SYS", "JOB", "TXN");
        let err = validate(&config).unwrap_err();
        assert!(err.violations[0].contains("no field mappings"));
    }

    #[test]
    fn test_duplicate_field_names() {
        let config = MappingConfig::new("SYS", "JOB", "TXN")
            .with_field(FieldMapping::source("acct", "a", 1, 5))
            .with_field(FieldMapping::source("acct", "b", 2, 5));
        let err = validate(&config).unwrap_err();
        assert!(err.violations.iter().any(|v| v.contains("duplicate fieldName 'acct'")));
    }

    #[test]
    fn test_duplicate_and_invalid_positions() {
        let config = MappingConfig::new("SYS", "JOB", "TXN")
            .with_field(FieldMapping::source("a", "a", 0, 5))
            .with_field(FieldMapping::source("b", "b", 2, 5))
            .with_field(FieldMapping::source("c", "c", 2, 5));
        let err = validate(&config).unwrap_err();
        assert!(err.violations.iter().any(|v| v.contains("targetPosition must be >= 1")));
        assert!(err.violations.iter().any(|v| v.contains("duplicate targetPosition 2")));
    }

    #[test]
    fn test_zero_length() {
        let config = MappingConfig::new("SYS", "JOB", "TXN")
            .with_field(FieldMapping::source("a", "a", 1, 0));
        let err = validate(&config).unwrap_err();
        assert!(err.violations.iter().any(|v| v.contains("length must be > 0")));
    }

    #[test]
    fn test_payload_completeness() {
        let config = MappingConfig::new("SYS", "JOB", "TXN")
            .with_field(FieldMapping::source("a", "  ", 1, 5))
            .with_field(FieldMapping::composite("b", vec![], crate::config::CompositeOp::Concat, 2, 5))
            .with_field(FieldMapping::conditional("c", vec![], 3, 5));
        let err = validate(&config).unwrap_err();
        assert!(err.violations.iter().any(|v| v.contains("empty sourceField")));
        assert!(err.violations.iter().any(|v| v.contains("no sources")));
        assert!(err.violations.iter().any(|v| v.contains("no conditions")));
    }

    #[test]
    fn test_broken_expressions_all_reported() {
        let config = MappingConfig::new("SYS", "JOB", "TXN").with_field(FieldMapping::conditional(
            "flag",
            vec![Condition::new("status === 'A'", "x").with_else_if("&& broken", "y")],
            1,
            1,
        ));
        let err = validate(&config).unwrap_err();
        let parse_failures = err.violations.iter().filter(|v| v.contains("does not parse")).count();
        assert_eq!(parse_failures, 2);
        assert!(err.violations.iter().all(|v| v.contains("field 'flag'")));
    }

    #[test]
    fn test_bad_format_patterns_reported() {
        let config = MappingConfig::new("SYS", "JOB", "TXN")
            .with_field(
                FieldMapping::source("d", "d", 1, 8)
                    .with_data_type(DataType::Date)
                    .with_target_format("yyyyQQ"),
            )
            .with_field(
                FieldMapping::source("n", "n", 2, 8)
                    .with_data_type(DataType::Number)
                    .with_format("X(13)"),
            );
        let err = validate(&config).unwrap_err();
        assert_eq!(err.violations.len(), 2);
        assert!(err.violations[0].contains("targetFormat"));
        assert!(err.violations[1].contains("format"));
    }

    #[test]
    fn test_oversized_picture_reported() {
        let config = MappingConfig::new("SYS", "JOB", "TXN").with_field(
            FieldMapping::source("bal", "bal", 1, 32)
                .with_data_type(DataType::Number)
                .with_format("9(30)V99"),
        );
        let err = validate(&config).unwrap_err();
        assert!(err.violations.iter().any(|v| v.contains("invalid numeric picture")));
    }

    #[test]
    fn test_all_violations_collected_at_once() {
        let config = MappingConfig::new("SYS", "JOB", "TXN")
            .with_field(FieldMapping::source("a", "", 0, 0))
            .with_field(FieldMapping::source("a", "x", 1, 5));
        let err = validate(&config).unwrap_err();
        // Duplicate name, bad position, zero length, empty sourceField.
        assert!(err.violations.len() >= 4);
    }
}
