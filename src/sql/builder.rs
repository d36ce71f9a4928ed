//! Builds parameterized SQL over the `books` JSONB table.
//! Field names and values are always bound; only integers and fixed fragments are formatted in.

use crate::query::{Comparison, Direction, ResolvedProjection, SortKey, TypedPredicate};
use crate::reports::{MonthlyPlanReport, StatsReport};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const TABLE: &str = "books";

/// Stored `doc` plus the column-backed keys, rendered the way API documents carry them.
const FULL_DOC: &str = "doc || jsonb_build_object(\
'id', id::text, \
'createdAt', to_char(created_at AT TIME ZONE 'UTC', 'YYYY-MM-DD\"T\"HH24:MI:SS.MS\"Z\"'), \
'__v', version)";

/// Documents as a derived table `b(id, created_at, doc)` so filters and sorts see every key.
fn documents() -> String {
    format!("(SELECT id, created_at, {} AS doc FROM {}) AS b", FULL_DOC, quoted(TABLE))
}

/// Quote identifier for PostgreSQL (fixed names only).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    fn push_text(&mut self, s: &str) -> u32 {
        self.push_param(Value::String(s.to_string()))
    }

    /// Bind `v` as JSON text, for use as `$n::jsonb`.
    fn push_json(&mut self, v: &Value) -> u32 {
        self.push_param(Value::String(v.to_string()))
    }
}

/// `doc -> $n::text` for a bound field name.
fn field_expr(q: &mut QueryBuf, doc: &str, field: &str) -> String {
    let n = q.push_text(field);
    format!("{} -> ${}::text", doc, n)
}

fn comparison_sql(q: &mut QueryBuf, doc: &str, p: &TypedPredicate) -> String {
    let x = field_expr(q, doc, &p.field);
    let alternatives: Vec<String> = p
        .values
        .iter()
        .map(|v| {
            let n = q.push_json(v);
            match p.comparison {
                Comparison::Eq => format!(
                    "({x} = ${n}::jsonb OR (jsonb_typeof({x}) = 'array' AND {x} @> jsonb_build_array(${n}::jsonb)))"
                ),
                cmp => {
                    let op = cmp.sql_operator();
                    format!(
                        "((jsonb_typeof({x}) = jsonb_typeof(${n}::jsonb) AND {x} {op} ${n}::jsonb) \
                         OR CASE WHEN jsonb_typeof({x}) = 'array' THEN EXISTS (\
                         SELECT 1 FROM jsonb_array_elements({x}) AS e(v) \
                         WHERE jsonb_typeof(e.v) = jsonb_typeof(${n}::jsonb) AND e.v {op} ${n}::jsonb) \
                         ELSE false END)"
                    )
                }
            }
        })
        .collect();
    if alternatives.len() == 1 {
        alternatives.concat()
    } else {
        format!("({})", alternatives.join(" OR "))
    }
}

fn where_clause(q: &mut QueryBuf, doc: &str, filters: &[TypedPredicate]) -> String {
    let parts: Vec<String> = filters.iter().map(|p| comparison_sql(q, doc, p)).collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// One sort key: jsonb type rank, then strings byte-wise (`COLLATE "C"`), then the jsonb value.
fn sort_key_sql(x: &str, direction: Direction) -> String {
    let (dir, nulls) = match direction {
        Direction::Asc => ("ASC", "NULLS FIRST"),
        Direction::Desc => ("DESC", "NULLS LAST"),
    };
    format!(
        "CASE jsonb_typeof({x}) WHEN 'null' THEN 0 WHEN 'string' THEN 1 WHEN 'number' THEN 2 \
         WHEN 'boolean' THEN 3 WHEN 'array' THEN 4 WHEN 'object' THEN 5 END {dir} {nulls}, \
         (CASE WHEN jsonb_typeof({x}) = 'string' THEN {x} #>> '{{}}' END) COLLATE \"C\" {dir}, \
         {x} {dir} {nulls}"
    )
}

/// Missing keys sort first ascending and last descending; `id` breaks ties.
fn order_clause(q: &mut QueryBuf, doc: &str, id: &str, sort: &[SortKey]) -> String {
    let mut keys: Vec<String> = sort
        .iter()
        .map(|k| {
            let x = field_expr(q, doc, &k.field);
            sort_key_sql(&x, k.direction)
        })
        .collect();
    keys.push(format!("{} ASC", id));
    format!(" ORDER BY {}", keys.join(", "))
}

/// Expression selecting the projected keys of `doc`.
fn projection_expr(q: &mut QueryBuf, doc: &str, projection: &ResolvedProjection) -> String {
    match projection {
        ResolvedProjection::Include(fields) => {
            let placeholders: Vec<String> = fields.iter().map(|f| format!("${}", q.push_text(f))).collect();
            format!(
                "COALESCE((SELECT jsonb_object_agg(e.key, e.value) FROM jsonb_each({}) AS e WHERE e.key IN ({})), '{{}}'::jsonb)",
                doc,
                placeholders.join(", ")
            )
        }
        ResolvedProjection::Exclude(fields) => fields.iter().fold(doc.to_string(), |expr, f| {
            format!("{} - ${}::text", expr, q.push_text(f))
        }),
    }
}

/// Filtered, sorted, projected page of documents. Rows carry one `doc` column.
pub fn select_books(
    filters: &[TypedPredicate],
    sort: &[SortKey],
    projection: &ResolvedProjection,
    skip: u64,
    limit: Option<u64>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let select = projection_expr(&mut q, "b.doc", projection);
    let where_clause = where_clause(&mut q, "b.doc", filters);
    let order_clause = order_clause(&mut q, "b.doc", "b.id", sort);
    let limit_clause = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_clause = if skip > 0 { format!(" OFFSET {}", skip) } else { String::new() };
    q.sql = format!(
        "SELECT {} AS doc FROM {}{}{}{}{}",
        select,
        documents(),
        where_clause,
        order_clause,
        limit_clause,
        offset_clause
    );
    q
}

pub fn select_by_id(id: &Uuid, projection: &ResolvedProjection) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_param = q.push_text(&id.to_string());
    let select = projection_expr(&mut q, "b.doc", projection);
    q.sql = format!(
        "SELECT {} AS doc FROM {} WHERE b.id = ${}::uuid",
        select,
        documents(),
        id_param
    );
    q
}

/// INSERT one document; `created_at` and `version` come from the database.
pub fn insert(id: &Uuid, doc: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_param = q.push_text(&id.to_string());
    let doc_param = q.push_json(&Value::Object(doc.clone()));
    q.sql = format!(
        "INSERT INTO {} (id, doc, created_at) VALUES (${}::uuid, ${}::jsonb, NOW()) RETURNING {} AS doc",
        quoted(TABLE),
        id_param,
        doc_param,
        FULL_DOC
    );
    q
}

/// Merge `patch` into the stored document. Keys absent from the patch are kept.
pub fn update(id: &Uuid, patch: &Map<String, Value>, projection: &ResolvedProjection) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_param = q.push_text(&id.to_string());
    let patch_param = q.push_json(&Value::Object(patch.clone()));
    let full = format!("({})", FULL_DOC);
    let returning = projection_expr(&mut q, &full, projection);
    q.sql = format!(
        "UPDATE {} SET doc = doc || ${}::jsonb WHERE id = ${}::uuid RETURNING {} AS doc",
        quoted(TABLE),
        patch_param,
        id_param,
        returning
    );
    q
}

/// DELETE by id.
pub fn delete(id: &Uuid) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_param = q.push_text(&id.to_string());
    q.sql = format!("DELETE FROM {} WHERE id = ${}::uuid RETURNING id", quoted(TABLE), id_param);
    q
}

/// Numeric value of `doc.key`, NULL when absent or not a number.
fn number_at(key: &str) -> String {
    format!(
        "CASE WHEN jsonb_typeof(doc -> '{key}') = 'number' THEN (doc ->> '{key}')::float8 END"
    )
}

/// Stats per upper-cased difficulty. Columns: difficulty, num_books, num_ratings, avg_rating,
/// avg_price, min_price, max_price.
pub fn book_stats(report: &StatsReport) -> QueryBuf {
    let mut q = QueryBuf::new();
    let min_rating = q.push_json(&Value::from(report.min_rating));
    let rating = number_at("ratingsAverage");
    let price = number_at("price");
    q.sql = format!(
        "SELECT UPPER(COALESCE(doc ->> 'difficulty', '')) AS difficulty, \
         COUNT(*) AS num_books, \
         COALESCE(SUM({quantity}), 0)::float8 AS num_ratings, \
         AVG({rating})::float8 AS avg_rating, \
         AVG({price})::float8 AS avg_price, \
         MIN({price})::float8 AS min_price, \
         MAX({price})::float8 AS max_price \
         FROM {table} \
         WHERE {rating} >= ${min_rating}::float8 \
         GROUP BY 1 \
         ORDER BY avg_price ASC NULLS FIRST, difficulty ASC",
        quantity = number_at("ratingsQuantity"),
        rating = rating,
        price = price,
        table = quoted(TABLE),
        min_rating = min_rating,
    );
    q
}

/// SQL function parsing one start date: NULL when it is not a date, offset-less values read as UTC.
pub const START_DATE_FN: &str = "books_start_date";

/// DDL for [`START_DATE_FN`].
pub fn start_date_function() -> String {
    format!(
        r#"CREATE OR REPLACE FUNCTION {name}(value text) RETURNS timestamptz
LANGUAGE plpgsql STABLE
SET TimeZone = 'UTC'
AS $fn$
BEGIN
    IF value !~ '^\d{{4}}-\d{{2}}-\d{{2}}' THEN
        RETURN NULL;
    END IF;
    RETURN value::timestamptz;
EXCEPTION WHEN others THEN
    RETURN NULL;
END
$fn$"#,
        name = quoted(START_DATE_FN)
    )
}

/// Start dates per month within `[start, end)`. Columns: month, num_book_starts, books.
/// `startDates` may be an array or a single string; entries that are not dates are skipped.
pub fn monthly_plan(report: &MonthlyPlanReport, start: DateTime<Utc>, end: DateTime<Utc>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let start_param = q.push_text(&start.to_rfc3339());
    let end_param = q.push_text(&end.to_rfc3339());
    q.sql = format!(
        "SELECT EXTRACT(MONTH FROM s.start_at AT TIME ZONE 'UTC')::int4 AS month, \
         COUNT(*) AS num_book_starts, \
         COALESCE(jsonb_agg(t.doc -> 'name' ORDER BY t.created_at, t.id) FILTER (WHERE t.doc ? 'name'), '[]'::jsonb) AS books \
         FROM {table} AS t \
         CROSS JOIN LATERAL (\
         SELECT {parse}(d.value) AS start_at \
         FROM jsonb_array_elements_text(CASE jsonb_typeof(t.doc -> 'startDates') \
         WHEN 'array' THEN t.doc -> 'startDates' \
         WHEN 'string' THEN jsonb_build_array(t.doc -> 'startDates') \
         ELSE '[]'::jsonb END) AS d(value)) AS s \
         WHERE s.start_at >= ${start}::timestamptz AND s.start_at < ${end}::timestamptz \
         GROUP BY 1 \
         ORDER BY num_book_starts DESC, month ASC \
         LIMIT {limit}",
        table = quoted(TABLE),
        parse = quoted(START_DATE_FN),
        start = start_param,
        end = end_param,
        limit = report.limit,
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eq(field: &str, values: Vec<Value>) -> TypedPredicate {
        TypedPredicate {
            field: field.into(),
            comparison: Comparison::Eq,
            values,
        }
    }

    #[test]
    fn select_binds_field_names_and_values() {
        let filters = vec![
            eq("department", vec![json!("Marketing")]),
            TypedPredicate {
                field: "quantity".into(),
                comparison: Comparison::Gte,
                values: vec![json!(2)],
            },
        ];
        let q = select_books(
            &filters,
            &[SortKey::desc("createdAt")],
            &ResolvedProjection::Exclude(vec!["__v".into(), "year".into()]),
            20,
            Some(10),
        );
        assert!(q.sql.starts_with("SELECT b.doc - $1::text - $2::text AS doc FROM (SELECT id, created_at, doc || "));
        assert!(q.sql.contains("b.doc -> $3::text = $4::jsonb"));
        assert!(q.sql.contains("b.doc -> $5::text >= $6::jsonb"));
        assert!(q.sql.contains(" ORDER BY CASE jsonb_typeof(b.doc -> $7::text) WHEN 'null' THEN 0"));
        assert!(q.sql.contains("END DESC NULLS LAST, (CASE WHEN jsonb_typeof(b.doc -> $7::text) = 'string'"));
        assert!(q.sql.contains("#>> '{}' END) COLLATE \"C\" DESC, b.doc -> $7::text DESC NULLS LAST, b.id ASC"));
        assert!(q.sql.ends_with(" LIMIT 10 OFFSET 20"));
        assert!(!q.sql.contains("Marketing"));
        assert_eq!(
            q.params,
            vec![
                json!("__v"),
                json!("year"),
                json!("department"),
                json!("\"Marketing\""),
                json!("quantity"),
                json!("2"),
                json!("createdAt"),
            ]
        );
    }

    #[test]
    fn any_of_is_a_disjunction() {
        let q = select_books(
            &[eq("edition", vec![json!(1), json!(2)])],
            &[],
            &ResolvedProjection::Exclude(vec![]),
            0,
            None,
        );
        assert!(q.sql.contains("$2::jsonb OR (jsonb_typeof"));
        assert!(q.sql.contains(") OR (b.doc -> $1::text = $3::jsonb"));
        assert!(q.sql.ends_with("ORDER BY b.id ASC"));
        assert!(!q.sql.contains("LIMIT"));
    }

    #[test]
    fn inclusion_projection_uses_key_list() {
        let q = select_by_id(
            &Uuid::nil(),
            &ResolvedProjection::Include(vec!["id".into(), "name".into()]),
        );
        assert!(q.sql.contains("WHERE e.key IN ($2, $3)"));
        assert!(q.sql.ends_with("WHERE b.id = $1::uuid"));
        assert_eq!(q.params[0], json!("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn writes_bind_documents_as_json_text() {
        let doc = json!({"name": "Dune"}).as_object().cloned().unwrap();
        let ins = insert(&Uuid::nil(), &doc);
        assert!(ins.sql.starts_with("INSERT INTO \"books\" (id, doc, created_at) VALUES ($1::uuid, $2::jsonb, NOW())"));
        assert_eq!(ins.params[1], json!("{\"name\":\"Dune\"}"));

        let upd = update(&Uuid::nil(), &doc, &ResolvedProjection::Exclude(vec!["year".into()]));
        assert!(upd.sql.starts_with("UPDATE \"books\" SET doc = doc || $2::jsonb WHERE id = $1::uuid RETURNING ("));
        assert!(upd.sql.ends_with(" - $3::text AS doc"));

        let del = delete(&Uuid::nil());
        assert_eq!(del.sql, "DELETE FROM \"books\" WHERE id = $1::uuid RETURNING id");
    }

    #[test]
    fn reports_bind_their_thresholds() {
        let stats = book_stats(&StatsReport::default());
        assert_eq!(stats.params, vec![json!("4.5")]);
        assert!(stats.sql.contains("ORDER BY avg_price ASC NULLS FIRST"));

        let report = MonthlyPlanReport::new(2021);
        let (start, end) = report.window().unwrap();
        let plan = monthly_plan(&report, start, end);
        assert_eq!(plan.params, vec![json!("2021-01-01T00:00:00+00:00"), json!("2022-01-01T00:00:00+00:00")]);
        assert!(plan.sql.ends_with("ORDER BY num_book_starts DESC, month ASC LIMIT 12"));
    }

    #[test]
    fn monthly_plan_parses_start_dates_without_raising() {
        let report = MonthlyPlanReport::new(2021);
        let (start, end) = report.window().unwrap();
        let plan = monthly_plan(&report, start, end);
        assert!(plan.sql.contains("SELECT \"books_start_date\"(d.value) AS start_at"));
        assert!(!plan.sql.contains("d.value::timestamptz"));
        assert!(plan.sql.contains("EXTRACT(MONTH FROM s.start_at AT TIME ZONE 'UTC')"));

        let ddl = start_date_function();
        assert!(ddl.starts_with("CREATE OR REPLACE FUNCTION \"books_start_date\"(value text)"));
        assert!(ddl.contains("SET TimeZone = 'UTC'"));
        assert!(ddl.contains("IF value !~ '^\\d{4}-\\d{2}-\\d{2}' THEN"));
        assert!(ddl.contains("EXCEPTION WHEN others THEN\n    RETURN NULL;"));
    }

    #[test]
    fn text_sort_keys_compare_bytewise() {
        let q = select_books(&[], &[SortKey::asc("name")], &ResolvedProjection::Exclude(vec![]), 0, None);
        assert!(q.sql.contains("END ASC NULLS FIRST, (CASE WHEN"));
        assert!(q.sql.contains("COLLATE \"C\" ASC, b.doc -> $1::text ASC NULLS FIRST, b.id ASC"));
    }
}
