//! API endpoint handlers

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use cadence_core::{Card, Mastery, NewCard, ReviewSubmission};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use super::error::ApiError;
use super::owner::Owner;
use super::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// JSON SHAPES
// ============================================================================

fn card_json(card: &Card) -> Value {
    serde_json::json!({
        "id": card.id,
        "front": card.front,
        "back": card.back,
        "source_kind": card.source_kind,
        "owner": card.owner,
        "created_at": card.created_at.to_rfc3339(),
    })
}

fn mastery_json(mastery: &Mastery) -> Value {
    serde_json::json!({
        "card_id": mastery.card_id,
        "interval_days": mastery.interval_days,
        "ease": mastery.ease,
        "reps": mastery.reps,
        "lapses": mastery.lapses,
        "due_at": mastery.due_at.to_rfc3339(),
        "last_reviewed_at": mastery.last_reviewed_at.map(|dt| dt.to_rfc3339()),
    })
}

fn body_or_invalid<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))
}

// ============================================================================
// DUE QUEUE
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueParams {
    pub limit: Option<usize>,
    pub new_card_cap: Option<usize>,
}

/// Cards due for the caller, in review order
pub async fn due_cards(
    State(state): State<AppState>,
    owner: Owner,
    params: Result<Query<DueParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params.map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))?;
    let due = state
        .queue
        .due_cards(owner.as_str(), Utc::now(), params.limit, params.new_card_cap)?;

    let cards: Vec<Value> = due
        .iter()
        .map(|entry| {
            serde_json::json!({
                "id": entry.card.id,
                "front": entry.card.front,
                "back": entry.card.back,
                "source_kind": entry.card.source_kind,
                "created_at": entry.card.created_at.to_rfc3339(),
                "mastery": {
                    "interval_days": entry.mastery.interval_days,
                    "ease": entry.mastery.ease,
                    "reps": entry.mastery.reps,
                    "lapses": entry.mastery.lapses,
                    "due_at": entry.mastery.due_at.to_rfc3339(),
                },
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "count": cards.len(),
        "cards": cards,
    })))
}

// ============================================================================
// REVIEW
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewBody {
    pub card_id: String,
    /// Kept loose so a non-integer rating reports InvalidQuality
    pub quality: Value,
    #[serde(default)]
    pub client_review_id: Option<String>,
}

/// Submit one rating
pub async fn submit_review(
    State(state): State<AppState>,
    owner: Owner,
    body: Result<Json<ReviewBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let body = body_or_invalid(body)?;
    let quality = body.quality.as_i64().ok_or(ApiError::InvalidQuality)?;

    let mut submission = ReviewSubmission::new(body.card_id, quality);
    submission.client_review_id = body.client_review_id;

    let outcome = state
        .reviews
        .submit_review(owner.as_str(), &submission, Utc::now())?;

    let mut response = mastery_json(&outcome.mastery);
    response["duplicate"] = Value::Bool(outcome.duplicate);
    Ok(Json(response))
}

/// Outcome of each rating for a card, without applying any
pub async fn preview_review(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let preview = state.reviews.preview(owner.as_str(), &id, Utc::now())?;

    Ok(Json(serde_json::json!({
        "card_id": id,
        "again": mastery_json(&preview.again),
        "hard": mastery_json(&preview.hard),
        "good": mastery_json(&preview.good),
        "easy": mastery_json(&preview.easy),
    })))
}

/// Review log for a card, oldest first
pub async fn review_history(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let history = state.reviews.history(owner.as_str(), &id)?;

    let reviews: Vec<Value> = history
        .iter()
        .map(|r| {
            serde_json::json!({
                "id": r.id,
                "quality": r.quality.as_i64(),
                "rating": r.quality.as_str(),
                "reviewed_at": r.reviewed_at.to_rfc3339(),
                "ease_before": r.ease_before,
                "ease_after": r.ease_after,
                "interval_before": r.interval_before,
                "interval_after": r.interval_after,
                "client_review_id": r.client_review_id,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "card_id": id,
        "count": reviews.len(),
        "reviews": reviews,
    })))
}

// ============================================================================
// CARDS
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardBody {
    pub front: Option<String>,
    pub back: Option<String>,
    pub source_kind: Option<String>,
}

/// Create a card for the caller
pub async fn create_card(
    State(state): State<AppState>,
    owner: Owner,
    body: Result<Json<CreateCardBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = body_or_invalid(body)?;
    let input = NewCard {
        owner: owner.0,
        front: body.front.unwrap_or_default(),
        back: body.back.unwrap_or_default(),
        source_kind: body.source_kind,
    };

    let card = state.storage.create_card(input, Utc::now())?;
    Ok((StatusCode::CREATED, Json(card_json(&card))))
}

/// Delete a card; its mastery and review log go with it
pub async fn delete_card(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !state.storage.delete_card(&id, owner.as_str())? {
        return Err(ApiError::NotFound);
    }

    tracing::info!(card_id = %id, "Card deleted");
    Ok(Json(serde_json::json!({
        "deleted": true,
        "id": id,
    })))
}

// ============================================================================
// READ-ONLY VIEWS
// ============================================================================

/// Stored mastery rows for the caller's cards
pub async fn list_mastery(
    State(state): State<AppState>,
    owner: Owner,
) -> ApiResult<Json<Value>> {
    let rows = state.storage.list_mastery(owner.as_str())?;
    let mastery: Vec<Value> = rows.iter().map(mastery_json).collect();

    Ok(Json(serde_json::json!({
        "count": mastery.len(),
        "mastery": mastery,
    })))
}

/// Collection statistics for the caller
pub async fn get_stats(
    State(state): State<AppState>,
    owner: Owner,
) -> ApiResult<Json<Value>> {
    let stats = state.storage.stats(owner.as_str(), Utc::now())?;
    serde_json::to_value(stats)
        .map(Json)
        .map_err(|e| {
            tracing::error!("Failed to serialize stats: {}", e);
            ApiError::Internal
        })
}

/// Health check
pub async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
