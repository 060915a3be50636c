//! # HTTP API Journey Tests
//!
//! The full client loop over HTTP: create, fetch due, review, retry,
//! inspect, delete.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cadence_e2e_tests::TestDatabaseManager;
use cadence_server::api::OWNER_HEADER;
use cadence_server::{build_router, AppState, ServerConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(db: &TestDatabaseManager) -> Router {
    let state = AppState::new(db.storage.clone(), &ServerConfig::default());
    build_router(state, 3930)
}

async fn send(app: &Router, method: &str, uri: &str, owner: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(OWNER_HEADER, owner)
        .header("content-type", "application/json");
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_study_session_over_http() {
    let db = TestDatabaseManager::new_temp();
    let app = app(&db);

    let mut ids = Vec::new();
    for front in ["Capital of Peru?", "Boiling point of water?", "Speed of light?"] {
        let (status, card) = send(&app, "POST", "/api/cards", "student", Some(json!({ "front": front, "back": "..." }))).await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(card["id"].as_str().unwrap().to_string());
    }

    let (_, due) = send(&app, "GET", "/api/cards/due", "student", None).await;
    assert_eq!(due["count"], 3);

    // Work through the queue, one rating each
    for (card, quality) in due["cards"].as_array().unwrap().iter().zip([1, 3, 4]) {
        let (status, mastery) = send(
            &app,
            "POST",
            "/api/review",
            "student",
            Some(json!({ "cardId": card["id"], "quality": quality, "clientReviewId": format!("s1-{}", card["id"]) })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(mastery["duplicate"], false);
    }

    // Only the Again card is still due
    let (_, due) = send(&app, "GET", "/api/cards/due", "student", None).await;
    assert_eq!(due["count"], 1);
    assert_eq!(due["cards"][0]["mastery"]["lapses"], 1);

    let (_, stats) = send(&app, "GET", "/api/stats", "student", None).await;
    assert_eq!(stats["totalCards"], 3);
    assert_eq!(stats["totalReviews"], 3);
    assert_eq!(stats["matureCards"], 2);

    // Another learner sees nothing and can touch nothing
    let (_, due) = send(&app, "GET", "/api/cards/due", "intruder", None).await;
    assert_eq!(due["count"], 0);
    let (status, body) = send(&app, "DELETE", &format!("/api/cards/{}", ids[0]), "intruder", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_retry_returns_recorded_result() {
    let db = TestDatabaseManager::new_temp();
    let app = app(&db);
    let (_, card) = send(&app, "POST", "/api/cards", "student", Some(json!({ "front": "Q", "back": "A", "sourceKind": "material" }))).await;
    assert_eq!(card["source_kind"], "material");

    let review = json!({ "cardId": card["id"], "quality": 3, "clientReviewId": "flaky-1" });
    let (_, first) = send(&app, "POST", "/api/review", "student", Some(review.clone())).await;
    let (status, retry) = send(&app, "POST", "/api/review", "student", Some(review)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(retry["duplicate"], true);
    assert_eq!(retry["due_at"], first["due_at"]);
    assert_eq!(retry["reps"], 1);
}

#[tokio::test]
async fn test_invalid_quality_leaves_card_untouched() {
    let db = TestDatabaseManager::new_temp();
    let app = app(&db);
    let (_, card) = send(&app, "POST", "/api/cards", "student", Some(json!({ "front": "Q", "back": "A" }))).await;
    let id = card["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "POST", "/api/review", "student", Some(json!({ "cardId": id, "quality": 9 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidQuality");

    assert_eq!(db.storage.get_card(&id, "student").unwrap().version, 0);
}
