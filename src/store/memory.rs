//! In-process store with the same semantics as the Postgres backend.

use super::compare::{compare_documents, matches};
use super::{list_projection, plan_window, read_projection, typed_filters, BookStore};
use crate::error::AppError;
use crate::query::{QuerySpec, SortKey};
use crate::reports::{BookStats, MonthlyPlan, MonthlyPlanReport, StatsReport};
use crate::schema::book::{CREATED_AT_FIELD, ID_FIELD, NAME_FIELD, VERSION_FIELD};
use crate::schema::{format_timestamp, parse_timestamp, BookPatch, NewBook};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryBookStore {
    docs: RwLock<Vec<Map<String, Value>>>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed raw documents, bypassing the schema. Missing `id`, `createdAt` and `__v` are filled in.
    pub fn with_documents(documents: impl IntoIterator<Item = Value>) -> Self {
        let docs = documents
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(mut doc) => {
                    doc.entry(ID_FIELD)
                        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
                    doc.entry(CREATED_AT_FIELD)
                        .or_insert_with(|| Value::String(format_timestamp(Utc::now())));
                    doc.entry(VERSION_FIELD).or_insert_with(|| Value::from(0));
                    Some(doc)
                }
                other => {
                    tracing::warn!(value = %other, "skipping seed value that is not an object");
                    None
                }
            })
            .collect();
        MemoryBookStore {
            docs: RwLock::new(docs),
        }
    }
}

fn id_of(doc: &Map<String, Value>) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

fn number_at(doc: &Map<String, Value>, key: &str) -> Option<f64> {
    doc.get(key).filter(|v| v.is_number()).and_then(Value::as_f64)
}

fn difficulty_of(doc: &Map<String, Value>) -> String {
    match doc.get("difficulty") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.to_uppercase(),
        Some(other) => other.to_string().to_uppercase(),
    }
}

fn start_dates(doc: &Map<String, Value>) -> Vec<&str> {
    match doc.get("startDates") {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(s)) => vec![s.as_str()],
        _ => Vec::new(),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn find(&self, spec: &QuerySpec) -> Result<Vec<Value>, AppError> {
        let filters = typed_filters(spec)?;
        let projection = list_projection(spec);
        let docs = self.docs.read().await;
        let mut hits: Vec<&Map<String, Value>> = docs
            .iter()
            .filter(|doc| filters.iter().all(|p| matches(doc, p)))
            .collect();
        hits.sort_by(|a, b| compare_documents(a, b, &spec.sort));
        let limit = spec.limit.map_or(usize::MAX, |n| n as usize);
        Ok(hits
            .into_iter()
            .skip(spec.skip as usize)
            .take(limit)
            .map(|doc| Value::Object(projection.apply(doc)))
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Value>, AppError> {
        let id = id.to_string();
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .find(|doc| id_of(doc) == Some(id.as_str()))
            .map(|doc| Value::Object(read_projection().apply(doc))))
    }

    async fn insert(&self, book: NewBook) -> Result<Value, AppError> {
        let mut doc = book.0;
        doc.insert(ID_FIELD.into(), Value::String(Uuid::new_v4().to_string()));
        doc.insert(CREATED_AT_FIELD.into(), Value::String(format_timestamp(Utc::now())));
        doc.insert(VERSION_FIELD.into(), Value::from(0));
        self.docs.write().await.push(doc.clone());
        Ok(Value::Object(doc))
    }

    async fn update_by_id(&self, id: Uuid, patch: BookPatch) -> Result<Option<Value>, AppError> {
        let id = id.to_string();
        let mut docs = self.docs.write().await;
        let Some(doc) = docs.iter_mut().find(|doc| id_of(doc) == Some(id.as_str())) else {
            return Ok(None);
        };
        doc.extend(patch.0);
        Ok(Some(Value::Object(read_projection().apply(doc))))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, AppError> {
        let id = id.to_string();
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|doc| id_of(doc) != Some(id.as_str()));
        Ok(docs.len() < before)
    }

    async fn book_stats(&self, report: &StatsReport) -> Result<Vec<BookStats>, AppError> {
        #[derive(Default)]
        struct Group {
            count: i64,
            ratings_quantity: f64,
            ratings: Vec<f64>,
            prices: Vec<f64>,
        }

        let docs = self.docs.read().await;
        let mut groups: BTreeMap<String, Group> = BTreeMap::new();
        for doc in docs.iter() {
            let Some(rating) = number_at(doc, "ratingsAverage").filter(|r| *r >= report.min_rating) else {
                continue;
            };
            let group = groups.entry(difficulty_of(doc)).or_default();
            group.count += 1;
            group.ratings_quantity += number_at(doc, "ratingsQuantity").unwrap_or(0.0);
            group.ratings.push(rating);
            group.prices.extend(number_at(doc, "price"));
        }
        let mut rows: Vec<BookStats> = groups
            .into_iter()
            .map(|(difficulty, g)| BookStats {
                difficulty,
                num_books: g.count,
                num_ratings: g.ratings_quantity,
                avg_rating: mean(&g.ratings),
                avg_price: mean(&g.prices),
                min_price: g.prices.iter().copied().reduce(f64::min),
                max_price: g.prices.iter().copied().reduce(f64::max),
            })
            .collect();
        rows.sort_by(|a, b| {
            let by_price = match (a.avg_price, b.avg_price) {
                (None, None) => std::cmp::Ordering::Equal,
                (None, Some(_)) => std::cmp::Ordering::Less,
                (Some(_), None) => std::cmp::Ordering::Greater,
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
            };
            by_price.then_with(|| a.difficulty.cmp(&b.difficulty))
        });
        Ok(rows)
    }

    async fn monthly_plan(&self, report: &MonthlyPlanReport) -> Result<Vec<MonthlyPlan>, AppError> {
        let (start, end) = plan_window(report)?;
        let docs = self.docs.read().await;
        let mut ordered: Vec<&Map<String, Value>> = docs.iter().collect();
        let by_creation = [SortKey::asc(CREATED_AT_FIELD)];
        ordered.sort_by(|a, b| compare_documents(a, b, &by_creation));

        let mut months: BTreeMap<u32, MonthlyPlan> = BTreeMap::new();
        for doc in ordered {
            for raw in start_dates(doc) {
                let Some(ts) = parse_timestamp(raw).filter(|ts| *ts >= start && *ts < end) else {
                    continue;
                };
                let row = months.entry(ts.month()).or_insert_with(|| MonthlyPlan {
                    num_book_starts: 0,
                    books: Vec::new(),
                    month: ts.month() as i32,
                });
                row.num_book_starts += 1;
                if let Some(name) = doc.get(NAME_FIELD) {
                    row.books.push(name.clone());
                }
            }
        }
        let mut rows: Vec<MonthlyPlan> = months.into_values().collect();
        rows.sort_by(|a, b| {
            b.num_book_starts
                .cmp(&a.num_book_starts)
                .then_with(|| a.month.cmp(&b.month))
        });
        rows.truncate(report.limit);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{build, RequestQuery};
    use serde_json::json;

    fn store() -> MemoryBookStore {
        MemoryBookStore::with_documents(vec![
            json!({"id": "00000000-0000-0000-0000-000000000001", "createdAt": "2021-01-01T00:00:00.000Z",
                   "name": "Alpha", "difficulty": "easy", "ratingsAverage": 5.0, "ratingsQuantity": 10,
                   "price": 30, "startDates": ["2021-03-01", "2021-07-01", "2022-03-01"]}),
            json!({"id": "00000000-0000-0000-0000-000000000002", "createdAt": "2021-01-02T00:00:00.000Z",
                   "name": "Beta", "difficulty": "Easy", "ratingsAverage": 4.5, "ratingsQuantity": 6,
                   "price": 10, "startDates": ["2021-03-15T10:00:00.000Z"]}),
            json!({"id": "00000000-0000-0000-0000-000000000003", "createdAt": "2021-01-03T00:00:00.000Z",
                   "name": "Gamma", "difficulty": "hard", "ratingsAverage": 4.9,
                   "startDates": "2021-12-31T23:30:00.000Z"}),
            json!({"id": "00000000-0000-0000-0000-000000000004", "createdAt": "2021-01-04T00:00:00.000Z",
                   "name": "Delta", "difficulty": "easy", "ratingsAverage": 4.2, "price": 99}),
            json!({"id": "00000000-0000-0000-0000-000000000005", "createdAt": "2021-01-05T00:00:00.000Z",
                   "ratingsAverage": "5", "startDates": ["2021-07-04", "not a date"]}),
        ])
    }

    fn names(docs: &[Value]) -> Vec<&str> {
        docs.iter().map(|d| d["name"].as_str().unwrap_or("-")).collect()
    }

    async fn find(store: &MemoryBookStore, pairs: &[(&str, &str)]) -> Result<Vec<Value>, AppError> {
        let query: RequestQuery = pairs.iter().copied().collect();
        store.find(&build(&query)).await
    }

    #[tokio::test]
    async fn default_find_is_newest_first_without_version() {
        let docs = find(&store(), &[]).await.unwrap();
        assert_eq!(names(&docs), vec!["-", "Delta", "Gamma", "Beta", "Alpha"]);
        assert!(docs.iter().all(|d| d.get("__v").is_none()));
    }

    #[tokio::test]
    async fn filters_sorts_and_pages() {
        let docs = find(&store(), &[("price[gte]", "10"), ("sort", "price")]).await.unwrap();
        assert_eq!(names(&docs), vec!["Beta", "Alpha", "Delta"]);
        let page = find(&store(), &[("sort", "name"), ("limit", "2"), ("page", "2")]).await.unwrap();
        assert_eq!(names(&page), vec!["Beta", "Delta"]);
    }

    #[tokio::test]
    async fn uncastable_filter_is_a_bad_request() {
        let err = find(&store(), &[("quantity", "many")]).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn inclusion_projection_returns_id_and_named_fields() {
        let docs = find(&store(), &[("fields", "name"), ("name", "Alpha")]).await.unwrap();
        assert_eq!(
            docs,
            vec![json!({"id": "00000000-0000-0000-0000-000000000001", "name": "Alpha"})]
        );
    }

    #[tokio::test]
    async fn insert_update_delete_cycle() {
        let store = MemoryBookStore::new();
        let doc = json!({"name": "Dune", "year": "2020-01-01T00:00:00.000Z"});
        let created = store.insert(NewBook(doc.as_object().cloned().unwrap())).await.unwrap();
        assert_eq!(created["__v"], json!(0));
        assert_eq!(created["year"], json!("2020-01-01T00:00:00.000Z"));
        let id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();

        let patch = json!({"edition": 2}).as_object().cloned().unwrap();
        let updated = store.update_by_id(id, BookPatch(patch)).await.unwrap().unwrap();
        assert_eq!(updated["edition"], json!(2));
        assert_eq!(updated["name"], json!("Dune"));
        assert!(updated.get("year").is_none());

        assert!(store.delete_by_id(id).await.unwrap());
        assert!(!store.delete_by_id(id).await.unwrap());
        assert!(store.find_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stats_group_highly_rated_books_by_difficulty() {
        let stats = store().book_stats(&StatsReport::default()).await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].difficulty, "HARD");
        assert_eq!(stats[0].num_books, 1);
        assert_eq!(stats[0].num_ratings, 0.0);
        assert_eq!(stats[0].avg_price, None);
        assert_eq!(stats[1].difficulty, "EASY");
        assert_eq!(stats[1].num_books, 2);
        assert_eq!(stats[1].num_ratings, 16.0);
        assert_eq!(stats[1].avg_rating, Some(4.75));
        assert_eq!(stats[1].avg_price, Some(20.0));
        assert_eq!(stats[1].min_price, Some(10.0));
        assert_eq!(stats[1].max_price, Some(30.0));
    }

    #[tokio::test]
    async fn monthly_plan_counts_starts_within_the_year() {
        let plan = store().monthly_plan(&MonthlyPlanReport::new(2021)).await.unwrap();
        let rows: Vec<(i32, i64)> = plan.iter().map(|r| (r.month, r.num_book_starts)).collect();
        assert_eq!(rows, vec![(3, 2), (7, 2), (12, 1)]);
        assert_eq!(plan[0].books, vec![json!("Alpha"), json!("Beta")]);
        assert_eq!(plan[1].books, vec![json!("Alpha")]);
        assert_eq!(plan[2].books, vec![json!("Gamma")]);
    }

    #[tokio::test]
    async fn monthly_plan_skips_impossible_dates_and_reads_bare_times_as_utc() {
        let store = MemoryBookStore::with_documents(vec![json!({
            "name": "Edge",
            "startDates": ["2021-02-30", "2021-12-31T22:00:00", "2020-12-31T23:30:00"]
        })]);
        let plan = store.monthly_plan(&MonthlyPlanReport::new(2021)).await.unwrap();
        let rows: Vec<(i32, i64)> = plan.iter().map(|r| (r.month, r.num_book_starts)).collect();
        assert_eq!(rows, vec![(12, 1)]);
    }
}
