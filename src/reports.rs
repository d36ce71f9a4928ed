//! Canned aggregation reports: what each one computes and the rows it yields.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

pub const STATS_MIN_RATING: f64 = 4.5;
pub const MONTHLY_PLAN_LIMIT: usize = 12;

/// Per-difficulty statistics over highly rated books.
#[derive(Clone, Debug, PartialEq)]
pub struct StatsReport {
    /// Books with `ratingsAverage` at or above this value are counted.
    pub min_rating: f64,
}

impl Default for StatsReport {
    fn default() -> Self {
        StatsReport {
            min_rating: STATS_MIN_RATING,
        }
    }
}

/// Book starts per calendar month of one year, busiest month first.
#[derive(Clone, Debug, PartialEq)]
pub struct MonthlyPlanReport {
    pub year: i32,
    pub limit: usize,
}

impl MonthlyPlanReport {
    pub fn new(year: i32) -> Self {
        MonthlyPlanReport {
            year,
            limit: MONTHLY_PLAN_LIMIT,
        }
    }

    /// `[year-01-01, (year+1)-01-01)` in UTC. `None` when the year is out of range.
    pub fn window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = Utc.with_ymd_and_hms(self.year, 1, 1, 0, 0, 0).single()?;
        let end = Utc.with_ymd_and_hms(self.year.checked_add(1)?, 1, 1, 0, 0, 0).single()?;
        Some((start, end))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookStats {
    /// Upper-cased difficulty; empty when the books have none.
    #[serde(rename = "_id")]
    pub difficulty: String,
    pub num_books: i64,
    #[serde(serialize_with = "whole_as_integer")]
    pub num_ratings: f64,
    pub avg_rating: Option<f64>,
    pub avg_price: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

/// Sums of integer counts serialize as integers (`57`, not `57.0`).
fn whole_as_integer<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPlan {
    pub num_book_starts: i64,
    pub books: Vec<Value>,
    pub month: i32,
}
