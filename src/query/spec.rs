//! Store-agnostic description of a list query.

use crate::error::AppError;
use crate::schema::cast_filter_value;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Raw query-string pairs in request order. Repeated keys are kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestQuery(Vec<(String, String)>);

impl RequestQuery {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        RequestQuery(pairs)
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    /// First value given for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestQuery {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RequestQuery(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    /// Bracket operator of a `field[op]` key.
    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            "gt" => Some(Comparison::Gt),
            "gte" => Some(Comparison::Gte),
            "lt" => Some(Comparison::Lt),
            "lte" => Some(Comparison::Lte),
            _ => None,
        }
    }

    /// Whether `stored.cmp(wanted)` satisfies this comparison.
    pub fn accepts(self, ord: Ordering) -> bool {
        match self {
            Comparison::Eq => ord == Ordering::Equal,
            Comparison::Gt => ord == Ordering::Greater,
            Comparison::Gte => ord != Ordering::Less,
            Comparison::Lt => ord == Ordering::Less,
            Comparison::Lte => ord != Ordering::Greater,
        }
    }

    pub fn sql_operator(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    Compare(Comparison, String),
    /// Repeated plain key: equal to any of the values.
    AnyOf(Vec<String>),
}

/// One filter term. Values are raw; the store casts them by field kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Predicate {
    pub field: String,
    pub condition: Condition,
}

impl Predicate {
    /// Cast the raw values by the field's kind. `AnyOf` becomes an equality with several values.
    pub fn cast(&self) -> Result<TypedPredicate, AppError> {
        let cast = |raw: &String| cast_filter_value(&self.field, raw).map_err(AppError::BadRequest);
        let (comparison, values) = match &self.condition {
            Condition::Compare(cmp, raw) => (*cmp, vec![cast(raw)?]),
            Condition::AnyOf(raws) => (Comparison::Eq, raws.iter().map(cast).collect::<Result<_, _>>()?),
        };
        Ok(TypedPredicate {
            field: self.field.clone(),
            comparison,
            values,
        })
    }
}

/// A predicate with values ready to compare against stored documents.
/// Several values mean "any of".
#[derive(Clone, Debug, PartialEq)]
pub struct TypedPredicate {
    pub field: String,
    pub comparison: Comparison,
    pub values: Vec<Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        SortKey {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        SortKey {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// Requested field selection, before schema-hidden fields are accounted for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Projection {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Exclude(Vec::new())
    }
}

impl Projection {
    /// Add the schema's `hidden` fields to exclusions and `id` to inclusions.
    pub fn resolve(&self, hidden: &[&str]) -> ResolvedProjection {
        match self {
            Projection::Include(fields) => {
                let mut fields = fields.clone();
                if !fields.iter().any(|f| f == crate::schema::book::ID_FIELD) {
                    fields.insert(0, crate::schema::book::ID_FIELD.to_string());
                }
                ResolvedProjection::Include(fields)
            }
            Projection::Exclude(fields) => {
                let mut fields = fields.clone();
                for h in hidden {
                    if !fields.iter().any(|f| f == h) {
                        fields.push(h.to_string());
                    }
                }
                ResolvedProjection::Exclude(fields)
            }
        }
    }
}

/// Final key selection applied to stored documents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedProjection {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl ResolvedProjection {
    pub fn apply(&self, doc: &Map<String, Value>) -> Map<String, Value> {
        match self {
            ResolvedProjection::Include(fields) => doc
                .iter()
                .filter(|(k, _)| fields.iter().any(|f| f == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            ResolvedProjection::Exclude(fields) => doc
                .iter()
                .filter(|(k, _)| !fields.iter().any(|f| f == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Output of the query pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuerySpec {
    pub filter: Vec<Predicate>,
    pub sort: Vec<SortKey>,
    pub projection: Projection,
    pub skip: u64,
    /// `None` means unbounded.
    pub limit: Option<u64>,
}
