//! Argument validation with lenient coercion.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::node::{SchemaKind, SchemaNode};

/// Why a single value was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationReason {
    #[error("{value} is out of range ({})", describe_bounds(.minimum, .maximum))]
    OutOfRange {
        value: f64,
        minimum: Option<f64>,
        maximum: Option<f64>,
    },

    #[error("expected {expected}, got {actual}")]
    WrongType { expected: String, actual: String },

    #[error("length {actual} is out of range ({})", describe_bounds(.minimum, .maximum))]
    WrongLength {
        actual: usize,
        minimum: Option<usize>,
        maximum: Option<usize>,
    },

    #[error("field required")]
    MissingRequired,
}

fn describe_bounds<T: std::fmt::Display>(min: &Option<T>, max: &Option<T>) -> String {
    match (min, max) {
        (Some(lo), Some(hi)) => format!("expected {lo} to {hi}"),
        (Some(lo), None) => format!("expected at least {lo}"),
        (None, Some(hi)) => format!("expected at most {hi}"),
        (None, None) => "unbounded".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Location of the offending value, e.g. `hour` or `yaogua[3]`. Empty for the root.
    pub path: String,
    pub reason: ValidationReason,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.path.is_empty() {
            "arguments"
        } else {
            &self.path
        };
        write!(f, "{path}: {}", self.reason)
    }
}

/// Every violation found in one set of arguments.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("Invalid arguments: {}", join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate `value` against `schema`, returning the coerced value.
///
/// Integral floats and numeric strings are accepted where an integer is
/// expected, undeclared object fields are dropped, and absent optional fields
/// take their default. All violations are reported together.
pub fn validate(schema: &SchemaNode, value: &Value) -> Result<Value, ValidationError> {
    let mut issues = Vec::new();
    let coerced = walk(schema, value, "", &mut issues);
    match coerced {
        Some(v) if issues.is_empty() => Ok(v),
        _ => Err(ValidationError { issues }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn wrong_type(schema: &SchemaNode, value: &Value, path: &str, issues: &mut Vec<ValidationIssue>) {
    issues.push(ValidationIssue {
        path: path.to_string(),
        reason: ValidationReason::WrongType {
            expected: schema.type_name().to_string(),
            actual: json_type_name(value).to_string(),
        },
    });
}

fn walk(
    schema: &SchemaNode,
    value: &Value,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Value> {
    if value.is_null() {
        if schema.nullable {
            return Some(Value::Null);
        }
        wrong_type(schema, value, path, issues);
        return None;
    }

    match &schema.kind {
        SchemaKind::Integer { minimum, maximum } => {
            let Some(n) = coerce_integer(value) else {
                wrong_type(schema, value, path, issues);
                return None;
            };
            let below = minimum.is_some_and(|lo| n < lo);
            let above = maximum.is_some_and(|hi| n > hi);
            if below || above {
                issues.push(ValidationIssue {
                    path: path.to_string(),
                    reason: ValidationReason::OutOfRange {
                        value: n as f64,
                        minimum: minimum.map(|v| v as f64),
                        maximum: maximum.map(|v| v as f64),
                    },
                });
                return None;
            }
            Some(Value::from(n))
        }
        SchemaKind::Number { minimum, maximum } => {
            let Some(x) = coerce_number(value) else {
                wrong_type(schema, value, path, issues);
                return None;
            };
            let below = minimum.is_some_and(|lo| x < lo);
            let above = maximum.is_some_and(|hi| x > hi);
            if below || above {
                issues.push(ValidationIssue {
                    path: path.to_string(),
                    reason: ValidationReason::OutOfRange {
                        value: x,
                        minimum: *minimum,
                        maximum: *maximum,
                    },
                });
                return None;
            }
            Number::from_f64(x).map(Value::Number)
        }
        SchemaKind::String {
            min_length,
            max_length,
        } => {
            let Some(s) = value.as_str() else {
                wrong_type(schema, value, path, issues);
                return None;
            };
            let len = s.chars().count();
            if !length_ok(len, *min_length, *max_length) {
                issues.push(ValidationIssue {
                    path: path.to_string(),
                    reason: ValidationReason::WrongLength {
                        actual: len,
                        minimum: *min_length,
                        maximum: *max_length,
                    },
                });
                return None;
            }
            Some(value.clone())
        }
        SchemaKind::Boolean => match value {
            Value::Bool(_) => Some(value.clone()),
            _ => {
                wrong_type(schema, value, path, issues);
                None
            }
        },
        SchemaKind::Array {
            items,
            min_items,
            max_items,
        } => {
            let Some(elements) = value.as_array() else {
                wrong_type(schema, value, path, issues);
                return None;
            };
            let mut ok = true;
            if !length_ok(elements.len(), *min_items, *max_items) {
                issues.push(ValidationIssue {
                    path: path.to_string(),
                    reason: ValidationReason::WrongLength {
                        actual: elements.len(),
                        minimum: *min_items,
                        maximum: *max_items,
                    },
                });
                ok = false;
            }
            let mut out = Vec::with_capacity(elements.len());
            for (i, element) in elements.iter().enumerate() {
                match walk(items, element, &format!("{path}[{i}]"), issues) {
                    Some(v) => out.push(v),
                    None => ok = false,
                }
            }
            ok.then_some(Value::Array(out))
        }
        SchemaKind::Object { fields } => {
            let Some(members) = value.as_object() else {
                wrong_type(schema, value, path, issues);
                return None;
            };
            let mut ok = true;
            let mut out = Map::new();
            for field in fields {
                let field_path = child_path(path, &field.name);
                match members.get(&field.name) {
                    Some(member) => match walk(&field.schema, member, &field_path, issues) {
                        Some(v) => {
                            out.insert(field.name.clone(), v);
                        }
                        None => ok = false,
                    },
                    None if field.required => {
                        issues.push(ValidationIssue {
                            path: field_path,
                            reason: ValidationReason::MissingRequired,
                        });
                        ok = false;
                    }
                    None => {
                        if let Some(default) = &field.default {
                            out.insert(field.name.clone(), default.clone());
                        }
                    }
                }
            }
            ok.then_some(Value::Object(out))
        }
    }
}

fn length_ok(len: usize, min: Option<usize>, max: Option<usize>) -> bool {
    min.map_or(true, |lo| len >= lo) && max.map_or(true, |hi| len <= hi)
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}
