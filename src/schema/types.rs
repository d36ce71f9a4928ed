//! Field rule types for document schemas.

/// Value shape of a document field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Text restricted to a fixed set of values.
    Enum(&'static [&'static str]),
    Number,
    Integer,
    Timestamp,
    TextArray,
    Uuid,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text | FieldKind::Enum(_) => "String",
            FieldKind::Number | FieldKind::Integer => "Number",
            FieldKind::Timestamp => "Date",
            FieldKind::TextArray => "[String]",
            FieldKind::Uuid => "Id",
        }
    }
}

/// Value used when a new document omits the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldDefault {
    Integer(i64),
    EmptyArray,
    /// Insertion time.
    Now,
}

#[derive(Clone, Copy, Debug)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Message reported when the field is missing, null or an empty string.
    pub required: Option<&'static str>,
    pub trim: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub default: Option<FieldDefault>,
    /// Left out of default read projections.
    pub hidden: bool,
}

impl FieldRule {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        FieldRule {
            name,
            kind,
            required: None,
            trim: false,
            min_length: None,
            max_length: None,
            minimum: None,
            maximum: None,
            default: None,
            hidden: false,
        }
    }

    pub const fn required(self, message: &'static str) -> Self {
        FieldRule {
            required: Some(message),
            ..self
        }
    }

    pub const fn trim(self) -> Self {
        FieldRule { trim: true, ..self }
    }

    pub const fn length(self, min: usize, max: usize) -> Self {
        FieldRule {
            min_length: Some(min),
            max_length: Some(max),
            ..self
        }
    }

    pub const fn range(self, min: f64, max: f64) -> Self {
        FieldRule {
            minimum: Some(min),
            maximum: Some(max),
            ..self
        }
    }

    pub const fn default_value(self, default: FieldDefault) -> Self {
        FieldRule {
            default: Some(default),
            ..self
        }
    }

    pub const fn hidden(self) -> Self {
        FieldRule { hidden: true, ..self }
    }
}

/// A named set of field rules. Keys outside the set are dropped on write.
#[derive(Debug)]
pub struct Schema {
    pub model: &'static str,
    pub fields: &'static [FieldRule],
    /// Keys maintained by the store or derived on write; client values are ignored.
    pub read_only: &'static [&'static str],
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_read_only(&self, name: &str) -> bool {
        self.read_only.contains(&name)
    }

    pub fn hidden_fields(&self) -> Vec<&'static str> {
        self.fields.iter().filter(|f| f.hidden).map(|f| f.name).collect()
    }
}
