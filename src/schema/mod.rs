//! Book schema: field rules plus the write-side stages (cast, validate, defaults, slug).
//! Callers run the stages themselves, in order, before handing a document to the store.

pub mod book;
pub mod cast;
pub mod slug;
pub mod types;
pub mod validation;

pub use book::{filter_kind, BOOK_SCHEMA, DEPARTMENTS};
pub use cast::{cast_document, cast_filter_value, format_timestamp, parse_timestamp};
pub use slug::slugify;
pub use types::{FieldDefault, FieldKind, FieldRule, Schema};
pub use validation::RequestValidator;

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// A validated document ready for insertion (no id, createdAt or version yet).
#[derive(Clone, Debug, PartialEq)]
pub struct NewBook(pub Map<String, Value>);

/// Validated keys to merge into an existing document.
#[derive(Clone, Debug, PartialEq)]
pub struct BookPatch(pub Map<String, Value>);

pub fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Fill omitted fields that have defaults. `now` backs `Now` defaults.
pub fn apply_defaults(mut doc: Map<String, Value>, schema: &Schema, now: DateTime<Utc>) -> Map<String, Value> {
    for rule in schema.fields {
        let Some(default) = rule.default else { continue };
        if doc.get(rule.name).map_or(false, |v| !v.is_null()) {
            continue;
        }
        let value = match default {
            FieldDefault::Integer(n) => Value::Number(n.into()),
            FieldDefault::EmptyArray => Value::Array(Vec::new()),
            FieldDefault::Now => Value::String(format_timestamp(now)),
        };
        doc.insert(rule.name.to_string(), value);
    }
    doc
}

/// Set `slug` from `name` when the document carries a name.
pub fn derive_slug(mut doc: Map<String, Value>) -> Map<String, Value> {
    if let Some(name) = doc.get(book::NAME_FIELD).and_then(Value::as_str) {
        let slug = slugify(name);
        doc.insert(book::SLUG_FIELD.to_string(), Value::String(slug));
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn defaults_fill_missing_and_null_fields_only() {
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let doc = json!({"quantity": 4, "edition": null}).as_object().cloned().unwrap();
        let out = apply_defaults(doc, &BOOK_SCHEMA, now);
        assert_eq!(out["quantity"], json!(4));
        assert_eq!(out["edition"], json!(1));
        assert_eq!(out["images"], json!([]));
        assert_eq!(out["year"], json!("2024-05-06T07:08:09.000Z"));
    }

    #[test]
    fn slug_follows_name() {
        let doc = json!({"name": "Rust in Action"}).as_object().cloned().unwrap();
        assert_eq!(derive_slug(doc)["slug"], json!("rust-in-action"));
        let without_name = json!({"edition": 2}).as_object().cloned().unwrap();
        assert!(derive_slug(without_name).get("slug").is_none());
    }

    #[test]
    fn body_must_be_an_object() {
        assert!(body_to_map(json!([1, 2])).is_err());
        assert!(body_to_map(json!({"a": 1})).is_ok());
    }
}
