mod common;

use axum::http::StatusCode;
use book_api::MemoryBookStore;
use common::{get, router, BASE};
use serde_json::json;

fn tours() -> MemoryBookStore {
    MemoryBookStore::with_documents(vec![
        json!({"createdAt": "2021-01-01T00:00:00.000Z", "name": "Forest Hiker", "difficulty": "easy",
               "ratingsAverage": 4.75, "ratingsQuantity": 37, "price": 397,
               "startDates": ["2021-04-25T09:00:00.000Z", "2021-07-20T09:00:00.000Z", "2021-10-05T09:00:00.000Z"]}),
        json!({"createdAt": "2021-01-02T00:00:00.000Z", "name": "Sea Explorer", "difficulty": "medium",
               "ratingsAverage": 4.8, "ratingsQuantity": 23, "price": 497,
               "startDates": ["2021-06-19T09:00:00.000Z", "2021-07-20T09:00:00.000Z", "2021-08-18T09:00:00.000Z"]}),
        json!({"createdAt": "2021-01-03T00:00:00.000Z", "name": "Snow Adventurer", "difficulty": "difficult",
               "ratingsAverage": 4.5, "ratingsQuantity": 13, "price": 997,
               "startDates": ["2022-01-05T10:00:00.000Z", "2022-02-12T10:00:00.000Z"]}),
        json!({"createdAt": "2021-01-04T00:00:00.000Z", "name": "City Wanderer", "difficulty": "easy",
               "ratingsAverage": 4.5, "ratingsQuantity": 20, "price": 1197,
               "startDates": ["2021-03-11T10:00:00.000Z", "2021-07-20T10:00:00.000Z", "2021-12-31T18:00:00.000Z"]}),
        json!({"createdAt": "2021-01-05T00:00:00.000Z", "name": "Park Camper", "difficulty": "medium",
               "ratingsAverage": 4.4, "ratingsQuantity": 8, "price": 1497,
               "startDates": ["2021-08-05T10:00:00.000Z"]}),
    ])
}

#[tokio::test]
async fn stats_groups_highly_rated_books_by_difficulty() {
    let app = router(tours(), false);
    let (status, body) = get(&app, &format!("{BASE}/book-stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(
        body["data"]["stats"],
        json!([
            {"_id": "MEDIUM", "numBooks": 1, "numRatings": 23, "avgRating": 4.8,
             "avgPrice": 497.0, "minPrice": 497.0, "maxPrice": 497.0},
            {"_id": "EASY", "numBooks": 2, "numRatings": 57, "avgRating": 4.625,
             "avgPrice": 797.0, "minPrice": 397.0, "maxPrice": 1197.0},
            {"_id": "DIFFICULT", "numBooks": 1, "numRatings": 13, "avgRating": 4.5,
             "avgPrice": 997.0, "minPrice": 997.0, "maxPrice": 997.0}
        ])
    );
}

#[tokio::test]
async fn stats_is_empty_for_books_written_through_the_schema() {
    let app = router(MemoryBookStore::new(), false);
    let (status, body) = get(&app, &format!("{BASE}/book-stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stats"], json!([]));
}

#[tokio::test]
async fn monthly_plan_is_not_mounted_by_default() {
    let app = router(tours(), false);
    let (status, _) = get(&app, &format!("{BASE}/monthly-plan/2021")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn monthly_plan_counts_starts_per_month() {
    let app = router(tours(), true);
    let (status, body) = get(&app, &format!("{BASE}/monthly-plan/2021")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["plan"],
        json!([
            {"month": 7, "numBookStarts": 3, "books": ["Forest Hiker", "Sea Explorer", "City Wanderer"]},
            {"month": 8, "numBookStarts": 2, "books": ["Sea Explorer", "Park Camper"]},
            {"month": 3, "numBookStarts": 1, "books": ["City Wanderer"]},
            {"month": 4, "numBookStarts": 1, "books": ["Forest Hiker"]},
            {"month": 6, "numBookStarts": 1, "books": ["Sea Explorer"]},
            {"month": 10, "numBookStarts": 1, "books": ["Forest Hiker"]},
            {"month": 12, "numBookStarts": 1, "books": ["City Wanderer"]}
        ])
    );
}

#[tokio::test]
async fn monthly_plan_orders_ties_by_month() {
    let store = MemoryBookStore::with_documents((1..=12).map(|month| {
        json!({"name": format!("Book {month}"), "startDates": [format!("2021-{month:02}-15")]})
    }));
    let app = router(store, true);
    let (_, body) = get(&app, &format!("{BASE}/monthly-plan/2021")).await;
    let plan = body["data"]["plan"].as_array().unwrap();
    assert_eq!(plan.len(), 12);
    let months: Vec<i64> = plan.iter().map(|r| r["month"].as_i64().unwrap()).collect();
    assert_eq!(months, (1..=12).collect::<Vec<_>>());
}

#[tokio::test]
async fn monthly_plan_for_a_year_without_starts_is_empty() {
    let app = router(tours(), true);
    let (status, body) = get(&app, &format!("{BASE}/monthly-plan/1999")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["plan"], json!([]));
}

#[tokio::test]
async fn monthly_plan_rejects_a_non_numeric_year() {
    let app = router(tours(), true);
    let (status, body) = get(&app, &format!("{BASE}/monthly-plan/twenty")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
}
