//! Document matching and ordering for the memory store. Follows PostgreSQL's jsonb ordering
//! so both backends agree.

use crate::query::{Comparison, Direction, SortKey, TypedPredicate};
use crate::schema::book::ID_FIELD;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Missing < null < string < number < boolean < array < object.
fn type_rank(v: Option<&Value>) -> u8 {
    match v {
        None => 0,
        Some(Value::Null) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Number(_)) => 3,
        Some(Value::Bool(_)) => 4,
        Some(Value::Array(_)) => 5,
        Some(Value::Object(_)) => 6,
    }
}

pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let by_rank = type_rank(a).cmp(&type_rank(b));
    if by_rank != Ordering::Equal {
        return by_rank;
    }
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => x.len().cmp(&y.len()).then_with(|| {
            x.iter()
                .zip(y)
                .map(|(a, b)| compare_values(Some(a), Some(b)))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        }),
        (Some(Value::Object(x)), Some(Value::Object(y))) => x.len().cmp(&y.len()).then_with(|| {
            Value::Object(x.clone()).to_string().cmp(&Value::Object(y.clone()).to_string())
        }),
        _ => Ordering::Equal,
    }
}

fn same_type(a: &Value, b: &Value) -> bool {
    type_rank(Some(a)) == type_rank(Some(b))
}

fn value_matches(stored: &Value, comparison: Comparison, wanted: &Value) -> bool {
    let direct = same_type(stored, wanted) && comparison.accepts(compare_values(Some(stored), Some(wanted)));
    if direct {
        return true;
    }
    match stored {
        Value::Array(items) => items
            .iter()
            .any(|item| same_type(item, wanted) && comparison.accepts(compare_values(Some(item), Some(wanted)))),
        _ => false,
    }
}

/// Whether `doc` satisfies the predicate. Arrays match when any element does.
pub fn matches(doc: &Map<String, Value>, predicate: &TypedPredicate) -> bool {
    let Some(stored) = doc.get(&predicate.field) else {
        return false;
    };
    predicate
        .values
        .iter()
        .any(|wanted| value_matches(stored, predicate.comparison, wanted))
}

/// Order by `sort`, missing keys first ascending and last descending, then by `id`.
pub fn compare_documents(a: &Map<String, Value>, b: &Map<String, Value>, sort: &[SortKey]) -> Ordering {
    sort.iter()
        .map(|key| {
            let ord = compare_values(a.get(&key.field), b.get(&key.field));
            match key.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        })
        .find(|o| *o != Ordering::Equal)
        .unwrap_or_else(|| compare_values(a.get(ID_FIELD), b.get(ID_FIELD)))
}
