//! Validation of cast documents against schema rules.

use crate::error::ValidationErrors;
use crate::schema::types::{FieldKind, FieldRule, Schema};
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a whole document. Every required field must be present.
    pub fn validate(doc: &Map<String, Value>, schema: &Schema) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new(schema.model);
        for rule in schema.fields {
            match doc.get(rule.name) {
                Some(v) => check(rule, v, &mut errors),
                None => {
                    if let Some(message) = rule.required {
                        errors.push(rule.name, message);
                    }
                }
            }
        }
        errors.into_result()
    }

    /// Validate only the fields present in `doc` (for PATCH). Missing required fields are fine;
    /// present ones must not be emptied.
    pub fn validate_partial(doc: &Map<String, Value>, schema: &Schema) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new(schema.model);
        for rule in schema.fields {
            if let Some(v) = doc.get(rule.name) {
                check(rule, v, &mut errors);
            }
        }
        errors.into_result()
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn check(rule: &FieldRule, v: &Value, errors: &mut ValidationErrors) {
    if is_blank(v) {
        if let Some(message) = rule.required {
            errors.push(rule.name, message);
        }
        return;
    }
    if let Err(message) = validate_field(rule, v) {
        errors.push(rule.name, message);
    }
}

fn validate_field(rule: &FieldRule, v: &Value) -> Result<(), String> {
    let col = rule.name;
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(min) = rule.min_length {
            if len < min {
                return Err(format!("{} must be at least {} characters", col, min));
            }
        }
        if let Some(max) = rule.max_length {
            if len > max {
                return Err(format!("{} must be at most {} characters", col, max));
            }
        }
        if let FieldKind::Enum(allowed) = rule.kind {
            if !allowed.contains(&s) {
                return Err(format!("{} is either: {}", col, allowed.join(", ")));
            }
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(format!("{} must be at least {}", col, min));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(format!("{} must be at most {}", col, max));
            }
        }
    }
    Ok(())
}
