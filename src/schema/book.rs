//! The book document schema.

use crate::schema::types::{FieldDefault, FieldKind, FieldRule, Schema};

pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Internal version key; hidden from list responses unless projected.
pub const VERSION_FIELD: &str = "__v";
pub const NAME_FIELD: &str = "name";
pub const SLUG_FIELD: &str = "slug";

pub const DEPARTMENTS: &[&str] = &["Computer Science", "Marketing", "Accounting", "Managment"];

const FIELDS: &[FieldRule] = &[
    FieldRule::new(NAME_FIELD, FieldKind::Text)
        .required("A book must have a name")
        .trim()
        .length(2, 40),
    FieldRule::new(SLUG_FIELD, FieldKind::Text),
    FieldRule::new("department", FieldKind::Enum(DEPARTMENTS)).required("A book must have a department"),
    // Stored as a number, so the bound applies to the value, not the digit count.
    FieldRule::new("ISBN", FieldKind::Number).range(8.0, 15.0),
    FieldRule::new("quantity", FieldKind::Integer).default_value(FieldDefault::Integer(1)),
    FieldRule::new("edition", FieldKind::Integer).default_value(FieldDefault::Integer(1)),
    FieldRule::new("summary", FieldKind::Text)
        .required("A book must have a description")
        .trim(),
    FieldRule::new("author", FieldKind::Text).trim(),
    FieldRule::new("imageCover", FieldKind::Text),
    FieldRule::new("images", FieldKind::TextArray).default_value(FieldDefault::EmptyArray),
    FieldRule::new("year", FieldKind::Timestamp)
        .default_value(FieldDefault::Now)
        .hidden(),
];

pub static BOOK_SCHEMA: Schema = Schema {
    model: "Book",
    fields: FIELDS,
    read_only: &[ID_FIELD, CREATED_AT_FIELD, VERSION_FIELD, SLUG_FIELD],
};

/// Kind used to cast a query-string value for `field`. `None` for keys the schema does not know.
pub fn filter_kind(field: &str) -> Option<FieldKind> {
    match field {
        ID_FIELD => Some(FieldKind::Uuid),
        CREATED_AT_FIELD => Some(FieldKind::Timestamp),
        VERSION_FIELD => Some(FieldKind::Integer),
        _ => BOOK_SCHEMA.field(field).map(|f| f.kind),
    }
}
