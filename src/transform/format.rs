//! Data-type formatting and fixed-width padding.
//!
//! The formatter is the last step before a value lands in the record: apply
//! the declared date/number pattern, then truncate-or-pad to exactly
//! `length` characters.
//!
//! Date patterns use the `yyyyMMdd`-style tokens the banking configurations
//! are written in and are translated to chrono patterns once. Numeric
//! patterns are picture clauses with an implied decimal point, e.g.
//! `9(13)V99`: thirteen integer digits, two decimal digits, no point emitted.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::config::{DataType, FieldMapping, PadDirection};
use crate::error::{FieldError, FieldResult};

/// Default date pattern when a date mapping has no `sourceFormat`.
pub const DEFAULT_DATE_FORMAT: &str = "yyyy-MM-dd";

/// What to do when a formatted value exceeds the declared field length.
///
/// Silent truncation is a compliance hazard in banking extracts, so the
/// default rejects the value; `Truncate` is available for layouts that
/// explicitly want clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    #[default]
    Reject,
    Truncate,
}

// =============================================================================
// Entry point
// =============================================================================

/// Format a resolved raw value into its exact output slot.
pub fn format_field(raw: &str, mapping: &FieldMapping, policy: OverflowPolicy) -> FieldResult<String> {
    let typed = if raw.trim().is_empty() {
        // Empty resolutions become pure filler: padded with the field's pad
        // character ('0' for numbers, space otherwise).
        String::new()
    } else {
        match mapping.data_type {
            DataType::String => raw.to_string(),
            DataType::Number => format_number(raw, mapping)?,
            DataType::Date => format_date(raw, mapping)?,
            DataType::Boolean => format_boolean(raw)?,
        }
    };
    fit(typed, mapping, policy)
}

/// Guaranteed-width rendering used when a failed non-required field degrades
/// to its default value: no type formatting, clipping allowed.
pub(crate) fn fallback_fit(value: &str, mapping: &FieldMapping) -> String {
    fit(value.to_string(), mapping, OverflowPolicy::Truncate)
        .unwrap_or_else(|_| mapping.effective_pad_char().to_string().repeat(mapping.length))
}

// =============================================================================
// Dates
// =============================================================================

/// Translate a `yyyyMMdd`-style pattern into a chrono strftime pattern.
///
/// Supported tokens: `yyyy`, `yy`, `MM`, `dd`; any non-alphabetic character
/// passes through as a literal. Unknown letter runs are an error, reported by
/// the configuration validator before any row is processed.
pub fn translate_date_format(pattern: &str) -> FieldResult<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_alphabetic() {
            let mut j = i;
            while j < chars.len() && chars[j] == c {
                j += 1;
            }
            let token = match (c, j - i) {
                ('y', 4) => "%Y",
                ('y', 2) => "%y",
                ('M', 2) => "%m",
                ('d', 2) => "%d",
                _ => return Err(FieldError::InvalidDateFormat(pattern.to_string())),
            };
            out.push_str(token);
            i = j;
        } else {
            if c == '%' {
                out.push('%');
            }
            out.push(c);
            i += 1;
        }
    }
    Ok(out)
}

fn format_date(raw: &str, mapping: &FieldMapping) -> FieldResult<String> {
    let Some(target) = mapping.target_format.as_deref() else {
        // No reformatting requested; emit as resolved.
        return Ok(raw.to_string());
    };
    let source = mapping.source_format.as_deref().unwrap_or(DEFAULT_DATE_FORMAT);
    let source_fmt = translate_date_format(source)?;
    let target_fmt = translate_date_format(target)?;
    let date = NaiveDate::parse_from_str(raw.trim(), &source_fmt).map_err(|_| FieldError::InvalidDate {
        value: raw.to_string(),
        format: source.to_string(),
    })?;
    Ok(date.format(&target_fmt).to_string())
}

// =============================================================================
// Numbers
// =============================================================================

/// Picture clause: `S9(13)V99`, `9(7)`, `999V9(2)`, ...
static PICTURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(S)?(?:9\((\d+)\)|(9+))(?:V(?:9\((\d+)\)|(9+)))?$").unwrap());

/// Decimal arithmetic carries at most 28 significant digits; a wider picture
/// could never be filled faithfully, so it is rejected up front.
const MAX_PICTURE_DIGITS: u32 = 28;

#[derive(Debug, Clone, Copy)]
struct Picture {
    signed: bool,
    int_digits: u32,
    dec_digits: u32,
}

fn parse_picture(picture: &str) -> FieldResult<Picture> {
    let caps = PICTURE_RE
        .captures(picture.trim())
        .ok_or_else(|| FieldError::InvalidPicture(picture.to_string()))?;
    let int_digits = match (caps.get(2), caps.get(3)) {
        (Some(count), _) => count
            .as_str()
            .parse()
            .map_err(|_| FieldError::InvalidPicture(picture.to_string()))?,
        (None, Some(nines)) => nines.as_str().len() as u32,
        (None, None) => return Err(FieldError::InvalidPicture(picture.to_string())),
    };
    let dec_digits = match (caps.get(4), caps.get(5)) {
        (Some(count), _) => count
            .as_str()
            .parse()
            .map_err(|_| FieldError::InvalidPicture(picture.to_string()))?,
        (None, Some(nines)) => nines.as_str().len() as u32,
        (None, None) => 0,
    };
    if int_digits.saturating_add(dec_digits) > MAX_PICTURE_DIGITS {
        return Err(FieldError::InvalidPicture(picture.to_string()));
    }
    Ok(Picture {
        signed: caps.get(1).is_some(),
        int_digits,
        dec_digits,
    })
}

/// Validate that a picture clause parses; used by the configuration validator.
pub fn check_picture(picture: &str) -> FieldResult<()> {
    parse_picture(picture).map(|_| ())
}

fn format_number(raw: &str, mapping: &FieldMapping) -> FieldResult<String> {
    let value = Decimal::from_str(raw.trim()).map_err(|_| FieldError::InvalidNumber {
        value: raw.to_string(),
    })?;

    let Some(picture) = mapping.format.as_deref() else {
        return Ok(value.normalize().to_string());
    };
    let pic = parse_picture(picture)?;

    // Half-up rounding, then shift the decimal point away: 123.45 with V99
    // becomes the digit string "12345". `normalize` bounds the scale by the
    // value's true precision, so the shift is a plain zero append with no
    // decimal arithmetic that could overflow.
    let rounded = value
        .round_dp_with_strategy(pic.dec_digits, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    if negative && !pic.signed {
        return Err(FieldError::UnsignedNegative {
            value: raw.to_string(),
            picture: picture.to_string(),
        });
    }

    let mantissa = rounded.abs().mantissa().to_string();
    let implicit_zeros = pic.dec_digits.saturating_sub(rounded.scale()) as usize;
    let digits = format!("{mantissa}{}", "0".repeat(implicit_zeros));
    let total_digits = (pic.int_digits + pic.dec_digits) as usize;
    if digits.len() > total_digits {
        return Err(FieldError::PictureOverflow {
            value: raw.to_string(),
            picture: picture.to_string(),
        });
    }

    // Zero-fill to the picture's digit count; the sign, when present, sits in
    // front of the digits (a signed picture occupies one extra character).
    let filled = format!("{digits:0>total_digits$}");
    Ok(if negative { format!("-{filled}") } else { filled })
}

// =============================================================================
// Booleans
// =============================================================================

const TRUE_VALUES: &[&str] = &["true", "t", "1", "y", "yes"];
const FALSE_VALUES: &[&str] = &["false", "f", "0", "n", "no"];

fn format_boolean(raw: &str) -> FieldResult<String> {
    let lower = raw.trim().to_lowercase();
    if TRUE_VALUES.contains(&lower.as_str()) {
        Ok("Y".to_string())
    } else if FALSE_VALUES.contains(&lower.as_str()) {
        Ok("N".to_string())
    } else {
        Err(FieldError::InvalidBoolean {
            value: raw.to_string(),
        })
    }
}

// =============================================================================
// Width enforcement
// =============================================================================

fn fit(value: String, mapping: &FieldMapping, policy: OverflowPolicy) -> FieldResult<String> {
    let actual = value.chars().count();
    let width = mapping.length;

    if actual > width {
        return match policy {
            OverflowPolicy::Reject => Err(FieldError::Overflow { actual, length: width }),
            OverflowPolicy::Truncate => Ok(clip(&value, width, mapping.effective_pad())),
        };
    }

    if actual == width {
        return Ok(value);
    }

    let padding: String = std::iter::repeat(mapping.effective_pad_char())
        .take(width - actual)
        .collect();
    Ok(match mapping.effective_pad() {
        PadDirection::Left => format!("{padding}{value}"),
        PadDirection::Right => format!("{value}{padding}"),
    })
}

/// Clip an overlong value, keeping the side the padding would align to: a
/// left-padded (right-aligned) field keeps its rightmost characters.
fn clip(value: &str, width: usize, pad: PadDirection) -> String {
    let chars: Vec<char> = value.chars().collect();
    match pad {
        PadDirection::Left => chars[chars.len() - width..].iter().collect(),
        PadDirection::Right => chars[..width].iter().collect(),
    }
}
