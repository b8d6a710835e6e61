//! Semantic checks attached to fields
//!
//! A check is a predicate over a single non-null value whose type already
//! matches the field's logical type. Checks are schema-bound: there is no way
//! to add or edit one at runtime.

use serde::Serialize;
use serde_json::Value;

/// A predicate over one field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Check {
    /// Text value is one of the options, compared case-insensitively
    OneOf { options: Vec<String> },
    /// Numeric value lies within `[min, max]`.
    ///
    /// `sentinel`, when set, marks "unknown / not applicable" and is accepted
    /// regardless of the range.
    InRange {
        min: f64,
        max: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        sentinel: Option<f64>,
    },
    /// Numeric value is at least `min`
    AtLeast { min: f64 },
    /// Text value contains a non-whitespace character
    NonBlank,
}

impl Check {
    /// Creates a case-insensitive membership check
    pub fn one_of(options: &[&str]) -> Self {
        Check::OneOf {
            options: options.iter().map(|o| o.to_uppercase()).collect(),
        }
    }

    /// Creates a closed range check without a sentinel
    pub fn in_range(min: f64, max: f64) -> Self {
        Check::InRange {
            min,
            max,
            sentinel: None,
        }
    }

    /// Creates a closed range check that also accepts `sentinel`
    pub fn in_range_or(min: f64, max: f64, sentinel: f64) -> Self {
        Check::InRange {
            min,
            max,
            sentinel: Some(sentinel),
        }
    }

    /// Creates a lower-bound check
    pub fn at_least(min: f64) -> Self {
        Check::AtLeast { min }
    }

    /// Returns the check name used in error reports
    pub fn name(&self) -> &'static str {
        match self {
            Check::OneOf { .. } => "one_of",
            Check::InRange { .. } => "in_range",
            Check::AtLeast { .. } => "at_least",
            Check::NonBlank => "non_blank",
        }
    }

    /// Human-readable statement of what the check requires
    pub fn describe(&self) -> String {
        match self {
            Check::OneOf { options } => format!("one of {{{}}}", options.join(", ")),
            Check::InRange {
                min,
                max,
                sentinel: Some(s),
            } => format!("in [{}, {}] or {}", min, max, s),
            Check::InRange { min, max, .. } => format!("in [{}, {}]", min, max),
            Check::AtLeast { min } => format!(">= {}", min),
            Check::NonBlank => "non-blank text".to_string(),
        }
    }

    /// Returns a reason if the check definition can never pass
    pub(crate) fn structural_problem(&self) -> Option<String> {
        match self {
            Check::OneOf { options } if options.is_empty() => {
                Some("one_of has no options".to_string())
            }
            Check::InRange { min, max, .. } if !(min <= max) => {
                Some(format!("in_range bounds [{}, {}] are empty", min, max))
            }
            Check::AtLeast { min } if min.is_nan() => Some("at_least bound is NaN".to_string()),
            _ => None,
        }
    }

    /// Evaluates the check against a non-null value.
    ///
    /// Returns `Ok(())` when the value passes, or the failure message.
    pub fn evaluate(&self, value: &Value) -> Result<(), String> {
        match self {
            Check::OneOf { options } => {
                let text = value
                    .as_str()
                    .ok_or_else(|| format!("expected text, got {}", value))?;
                if options.iter().any(|o| o == &text.to_uppercase()) {
                    Ok(())
                } else {
                    Err(format!("'{}' is not {}", text, self.describe()))
                }
            }
            Check::InRange { min, max, sentinel } => {
                let n = value
                    .as_f64()
                    .ok_or_else(|| format!("expected a number, got {}", value))?;
                if sentinel.map_or(false, |s| n == s) || (*min <= n && n <= *max) {
                    Ok(())
                } else {
                    Err(format!("{} is not {}", value, self.describe()))
                }
            }
            Check::AtLeast { min } => {
                let n = value
                    .as_f64()
                    .ok_or_else(|| format!("expected a number, got {}", value))?;
                if n >= *min {
                    Ok(())
                } else {
                    Err(format!("{} is not {}", value, self.describe()))
                }
            }
            Check::NonBlank => match value.as_str() {
                Some(s) if !s.trim().is_empty() => Ok(()),
                Some(_) => Err("text is blank".to_string()),
                None => Err(format!("expected text, got {}", value)),
            },
        }
    }
}
