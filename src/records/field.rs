//! Field schema and value coercion.
//!
//! Every configured field carries an explicit [`FieldKind`]. The kind decides
//! which input the shell renders, how submitted JSON is bound into SQLite, and
//! how stored values are read back into an edit form.

use chrono::NaiveDate;
use rusqlite::types::Value;
use serde::Serialize;
use serde_json::json;

use super::error::{RecordError, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text,
    Integer { min: i64 },
    Real { min: f64 },
    /// ISO-8601 calendar date, stored as `YYYY-MM-DD` text.
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn text(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Text,
        }
    }

    pub const fn integer(name: &'static str, label: &'static str, min: i64) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Integer { min },
        }
    }

    pub const fn real(name: &'static str, label: &'static str, min: f64) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Real { min },
        }
    }

    pub const fn date(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind: FieldKind::Date,
        }
    }

    /// Value bound when the form leaves this field untouched.
    pub fn default_value(&self, today: NaiveDate) -> Value {
        match self.kind {
            FieldKind::Text => Value::Text(String::new()),
            FieldKind::Integer { min } => Value::Integer(min),
            FieldKind::Real { min } => Value::Real(min),
            FieldKind::Date => Value::Text(today.format(DATE_FORMAT).to_string()),
        }
    }

    /// Converts a submitted form value into the value bound into SQLite.
    pub fn coerce(&self, raw: Option<&serde_json::Value>, today: NaiveDate) -> Result<Value> {
        let raw = match raw {
            None | Some(serde_json::Value::Null) => return Ok(self.default_value(today)),
            Some(v) => v,
        };
        match self.kind {
            FieldKind::Text => match raw {
                serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
                serde_json::Value::Number(n) => Ok(Value::Text(n.to_string())),
                _ => Err(self.invalid("expected text")),
            },
            FieldKind::Integer { min } => {
                let v = match raw {
                    serde_json::Value::Number(n) => match n.as_i64() {
                        Some(i) => i,
                        None => whole_number(n.as_f64())
                            .ok_or_else(|| self.invalid("expected a whole number in range"))?,
                    },
                    serde_json::Value::String(s) => s
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| self.invalid("expected a whole number"))?,
                    _ => return Err(self.invalid("expected a whole number")),
                };
                if v < min {
                    return Err(self.invalid(format!("must be at least {}", min)));
                }
                Ok(Value::Integer(v))
            }
            FieldKind::Real { min } => {
                let v = match raw {
                    serde_json::Value::Number(n) => n.as_f64(),
                    serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                }
                .filter(|v| v.is_finite())
                .ok_or_else(|| self.invalid("expected a number"))?;
                if v < min {
                    return Err(self.invalid(format!("must be at least {}", min)));
                }
                Ok(Value::Real(v))
            }
            FieldKind::Date => {
                let Some(s) = raw.as_str() else {
                    return Err(self.invalid("expected a YYYY-MM-DD date"));
                };
                if s.trim().is_empty() {
                    return Ok(self.default_value(today));
                }
                let d = NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                    .map_err(|_| self.invalid("expected a YYYY-MM-DD date"))?;
                Ok(Value::Text(d.format(DATE_FORMAT).to_string()))
            }
        }
    }

    /// Re-parses a stored value for display in the edit form.
    pub fn prefill(&self, stored: &Value, today: NaiveDate) -> serde_json::Value {
        match self.kind {
            FieldKind::Text => match stored {
                Value::Null => json!(""),
                other => sql_to_json(other),
            },
            FieldKind::Integer { min } => {
                let v = match stored {
                    Value::Integer(i) => Some(*i),
                    Value::Real(f) => whole_number(Some(*f)),
                    Value::Text(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                json!(v.unwrap_or(min))
            }
            FieldKind::Real { min } => {
                let v = match stored {
                    Value::Integer(i) => Some(*i as f64),
                    Value::Real(f) => Some(*f),
                    Value::Text(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                };
                json!(v.unwrap_or(min))
            }
            FieldKind::Date => {
                let parsed = match stored {
                    Value::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok(),
                    _ => None,
                };
                if parsed.is_none() && !matches!(stored, Value::Null) {
                    tracing::warn!(field = self.name, "stored date is not ISO-8601; using today");
                }
                json!(parsed.unwrap_or(today).format(DATE_FORMAT).to_string())
            }
        }
    }

    pub fn form_field(&self, value: serde_json::Value) -> FormField {
        let (input, min, step) = match self.kind {
            FieldKind::Text => (InputKind::Text, None, None),
            FieldKind::Integer { min } => (InputKind::Number, Some(json!(min)), Some(json!(1))),
            FieldKind::Real { min } => (InputKind::Number, Some(json!(min)), Some(json!(0.01))),
            FieldKind::Date => (InputKind::Date, None, None),
        };
        FormField {
            name: self.name,
            label: self.label,
            input,
            min,
            step,
            value,
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> RecordError {
        RecordError::InvalidValue {
            field: self.name,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Number,
    Date,
}

/// One input as the shell should render it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub input: InputKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<serde_json::Value>,
    pub value: serde_json::Value,
}

pub fn sql_to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => json!(i),
        Value::Real(f) => json!(f),
        Value::Text(s) => json!(s),
        Value::Blob(b) => json!(String::from_utf8_lossy(b)),
    }
}

/// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
fn whole_number(v: Option<f64>) -> Option<i64> {
    v.filter(|f| f.is_finite() && f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f))
        .map(|f| f as i64)
}
