//! Query-string features as pure stages over `QuerySpec`.

use crate::query::spec::{
    Comparison, Condition, Predicate, Projection, QuerySpec, RequestQuery, SortKey,
};
use crate::schema::book::{CREATED_AT_FIELD, VERSION_FIELD};
use regex::Regex;
use std::sync::OnceLock;

/// Keys consumed by sort, limit_fields and paginate; never filters.
pub const RESERVED_KEYS: &[&str] = &["page", "sort", "limit", "fields"];
pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 100;
pub const MAX_LIMIT: u64 = 1000;

pub type Stage = fn(QuerySpec, &RequestQuery) -> QuerySpec;

/// Applied in this order by `build`.
pub const STAGES: [(&str, Stage); 4] = [
    ("filter", filter),
    ("sort", sort),
    ("limit_fields", limit_fields),
    ("paginate", paginate),
];

pub fn build(query: &RequestQuery) -> QuerySpec {
    STAGES
        .iter()
        .fold(QuerySpec::default(), |spec, (_, stage)| stage(spec, query))
}

fn operator_key() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([^\[\]]+)\[([^\[\]]*)\]$").ok())
        .as_ref()
}

/// Split `field[op]` into its parts; `None` for plain keys.
fn split_operator(key: &str) -> Option<(&str, &str)> {
    let caps = operator_key()?.captures(key)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

fn add_equality(filter: &mut Vec<Predicate>, field: &str, value: &str) {
    let existing = filter.iter_mut().find(|p| {
        p.field == field && matches!(p.condition, Condition::Compare(Comparison::Eq, _) | Condition::AnyOf(_))
    });
    let Some(existing) = existing else {
        filter.push(Predicate {
            field: field.to_string(),
            condition: Condition::Compare(Comparison::Eq, value.to_string()),
        });
        return;
    };
    existing.condition = match std::mem::replace(&mut existing.condition, Condition::AnyOf(Vec::new())) {
        Condition::Compare(_, first) => Condition::AnyOf(vec![first, value.to_string()]),
        Condition::AnyOf(mut values) => {
            values.push(value.to_string());
            Condition::AnyOf(values)
        }
    };
}

pub fn filter(mut spec: QuerySpec, query: &RequestQuery) -> QuerySpec {
    for (key, value) in query.pairs() {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        match split_operator(key) {
            Some((field, op)) => match Comparison::from_operator(op) {
                Some(cmp) => spec.filter.push(Predicate {
                    field: field.to_string(),
                    condition: Condition::Compare(cmp, value.clone()),
                }),
                None => tracing::debug!(key = %key, "ignoring unsupported filter operator"),
            },
            None => add_equality(&mut spec.filter, key, value),
        }
    }
    spec
}

pub fn sort(mut spec: QuerySpec, query: &RequestQuery) -> QuerySpec {
    let keys: Vec<SortKey> = query
        .get("sort")
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter_map(|entry| match entry.strip_prefix('-') {
                    Some(field) if !field.is_empty() => Some(SortKey::desc(field)),
                    Some(_) => None,
                    None if !entry.is_empty() => Some(SortKey::asc(entry)),
                    None => None,
                })
                .collect()
        })
        .unwrap_or_default();
    spec.sort = if keys.is_empty() {
        vec![SortKey::desc(CREATED_AT_FIELD)]
    } else {
        keys
    };
    spec
}

pub fn limit_fields(mut spec: QuerySpec, query: &RequestQuery) -> QuerySpec {
    let entries: Vec<&str> = query
        .get("fields")
        .map(|s| s.split(',').map(str::trim).filter(|e| !e.is_empty() && *e != "-").collect())
        .unwrap_or_default();
    spec.projection = if entries.is_empty() {
        Projection::Exclude(vec![VERSION_FIELD.to_string()])
    } else if entries.iter().all(|e| e.starts_with('-')) {
        Projection::Exclude(entries.iter().map(|e| e[1..].to_string()).collect())
    } else {
        Projection::Include(
            entries
                .iter()
                .filter(|e| !e.starts_with('-'))
                .map(|e| e.to_string())
                .collect(),
        )
    };
    spec
}

fn positive(query: &RequestQuery, key: &str) -> Option<u64> {
    query.get(key)?.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

pub fn paginate(mut spec: QuerySpec, query: &RequestQuery) -> QuerySpec {
    let page = positive(query, "page").unwrap_or(DEFAULT_PAGE);
    let limit = positive(query, "limit").unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    spec.skip = (page - 1).saturating_mul(limit);
    spec.limit = Some(limit);
    spec
}
