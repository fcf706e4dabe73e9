use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    card_service::CardService,
    config::SchedulerConfig,
    errors::{classify_database_error, ApiError, ErrorContext},
    models::*,
    srs_scheduler::PASSING_QUALITY,
};

// Import logging macros
use crate::{log_api_error, log_api_start, log_api_success, log_api_warn};

#[derive(Clone)]
pub struct AppState {
    pub card_service: CardService,
    pub planner_defaults: SchedulerConfig,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub quality: i32,
    pub response_time: f64,
    pub accuracy: f64,
    pub was_correct: Option<bool>,
}

impl From<ReviewRequest> for ReviewResult {
    fn from(request: ReviewRequest) -> Self {
        ReviewResult {
            quality: request.quality,
            response_time: request.response_time,
            accuracy: request.accuracy,
            was_correct: request
                .was_correct
                .unwrap_or(request.quality >= PASSING_QUALITY),
        }
    }
}

#[derive(Deserialize)]
pub struct UserCardsParams {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct DueParams {
    pub limit: Option<usize>,
    pub surah_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct ScheduleParams {
    pub daily_target: Option<usize>,
    pub days_ahead: Option<u32>,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

fn card_not_found(operation: &str, id: Uuid) -> (StatusCode, Json<ApiResponse<()>>) {
    ApiError::NotFound(format!("Card with ID '{}' not found", id))
        .to_response_with_context(ErrorContext::new(operation, "card").with_id(&id.to_string()))
}

pub async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("ok"))
}

// Card endpoints
pub async fn create_card(
    State(state): State<AppState>,
    Json(request): Json<CreateCardRequest>,
) -> ApiResult<Card> {
    info!(
        user_id = %request.user_id,
        content_id = %request.content_id,
        surah_id = request.surah_id,
        "Creating new card"
    );
    let content_id = request.content_id.clone();

    match state.card_service.create_card(request).await {
        Ok(card) => {
            log_api_success!("create_card", card_id = card.id, "card created");
            Ok(Json(ApiResponse::success(card)))
        }
        Err(e) => {
            let context = ErrorContext::new("create_card", "card").with_id(&content_id);
            Err(classify_database_error(&e).to_response_with_context(context))
        }
    }
}

pub async fn get_cards_for_user(
    State(state): State<AppState>,
    Query(params): Query<UserCardsParams>,
) -> ApiResult<Vec<Card>> {
    log_api_start!("get_cards_for_user", user_id = params.user_id);

    match state.card_service.get_cards_for_user(&params.user_id).await {
        Ok(cards) => {
            log_api_success!(
                "get_cards_for_user",
                user_id = params.user_id,
                count = cards.len(),
                "cards listed"
            );
            Ok(Json(ApiResponse::success(cards)))
        }
        Err(e) => {
            log_api_error!("get_cards_for_user", user_id = params.user_id, error = &e, "database error listing cards");
            let context = ErrorContext::new("get_cards_for_user", "card");
            Err(ApiError::DatabaseError(e).to_response_with_context(context))
        }
    }
}

pub async fn get_card(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Card> {
    log_api_start!("get_card", card_id = id);

    match state.card_service.get_card(id).await {
        Ok(Some(card)) => {
            log_api_success!("get_card", card_id = id, "card retrieved successfully");
            Ok(Json(ApiResponse::success(card)))
        }
        Ok(None) => {
            log_api_warn!("get_card", card_id = id, "card not found");
            Err(card_not_found("get_card", id))
        }
        Err(e) => {
            log_api_error!("get_card", card_id = id, error = &e, "database error retrieving card");
            let context = ErrorContext::new("get_card", "card").with_id(&id.to_string());
            Err(ApiError::DatabaseError(e).to_response_with_context(context))
        }
    }
}

pub async fn delete_card(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<bool> {
    info!(card_id = %id, "Deleting card");

    match state.card_service.delete_card(id).await {
        Ok(true) => {
            log_api_success!("delete_card", card_id = id, "card deleted");
            Ok(Json(ApiResponse::success(true)))
        }
        Ok(false) => Err(card_not_found("delete_card", id)),
        Err(e) => {
            let context = ErrorContext::new("delete_card", "card").with_id(&id.to_string());
            Err(ApiError::DatabaseError(e).to_response_with_context(context))
        }
    }
}

// Review endpoints
pub async fn review_card(
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
    Json(request): Json<ReviewRequest>,
) -> ApiResult<Card> {
    log_api_start!("review_card", card_id = card_id);
    let result = ReviewResult::from(request);

    match state.card_service.review_card(card_id, result).await {
        Ok(Some(card)) => {
            info!(
                card_id = %card_id,
                quality = result.quality,
                interval_days = card.interval_days,
                due_date = %card.due_date,
                "Card review recorded"
            );
            Ok(Json(ApiResponse::success(card)))
        }
        Ok(None) => Err(card_not_found("review_card", card_id)),
        Err(e) => {
            let context = ErrorContext::new("review_card", "card").with_id(&card_id.to_string());
            Err(classify_database_error(&e).to_response_with_context(context))
        }
    }
}

pub async fn rebuild_card(
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
) -> ApiResult<Card> {
    log_api_start!("rebuild_card", card_id = card_id);

    match state.card_service.rebuild_card_state(card_id).await {
        Ok(Some(card)) => {
            log_api_success!("rebuild_card", card_id = card_id, "state rebuilt from history");
            Ok(Json(ApiResponse::success(card)))
        }
        Ok(None) => Err(card_not_found("rebuild_card", card_id)),
        Err(e) => {
            let context = ErrorContext::new("rebuild_card", "card").with_id(&card_id.to_string());
            Err(ApiError::DatabaseError(e).to_response_with_context(context))
        }
    }
}

// Planning endpoints
pub async fn get_due_cards(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<DueParams>,
) -> ApiResult<Vec<Card>> {
    log_api_start!("get_due_cards", user_id = user_id);
    let limit = params.limit.unwrap_or(state.planner_defaults.due_limit);
    if limit == 0 {
        let context = ErrorContext::new("get_due_cards", "card").with_id(&user_id);
        return Err(ApiError::BadRequest("limit must be greater than 0".to_string())
            .to_response_with_context(context));
    }

    match state
        .card_service
        .get_due_cards(&user_id, limit, params.surah_id, Utc::now())
        .await
    {
        Ok(cards) => {
            log_api_success!("get_due_cards", user_id = user_id, count = cards.len(), "due cards selected");
            Ok(Json(ApiResponse::success(cards)))
        }
        Err(e) => {
            log_api_error!("get_due_cards", user_id = user_id, error = &e, "database error loading cards");
            let context = ErrorContext::new("get_due_cards", "card").with_id(&user_id);
            Err(ApiError::DatabaseError(e).to_response_with_context(context))
        }
    }
}

pub async fn get_study_schedule(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<ScheduleParams>,
) -> ApiResult<Vec<StudyDay>> {
    log_api_start!("get_study_schedule", user_id = user_id);
    let daily_target = params
        .daily_target
        .unwrap_or(state.planner_defaults.daily_target);
    let days_ahead = params.days_ahead.unwrap_or(state.planner_defaults.days_ahead);
    if days_ahead == 0 || days_ahead > 366 {
        let context = ErrorContext::new("get_study_schedule", "schedule").with_id(&user_id);
        return Err(ApiError::BadRequest("days_ahead must be between 1 and 366".to_string())
            .to_response_with_context(context));
    }

    match state
        .card_service
        .get_study_schedule(&user_id, daily_target, days_ahead, Utc::now())
        .await
    {
        Ok(schedule) => Ok(Json(ApiResponse::success(schedule))),
        Err(e) => {
            log_api_error!("get_study_schedule", user_id = user_id, error = &e, "database error loading cards");
            let context = ErrorContext::new("get_study_schedule", "schedule").with_id(&user_id);
            Err(ApiError::DatabaseError(e).to_response_with_context(context))
        }
    }
}

pub async fn get_study_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<StudyStats> {
    log_api_start!("get_study_stats", user_id = user_id);

    match state.card_service.get_study_stats(&user_id, Utc::now()).await {
        Ok(stats) => Ok(Json(ApiResponse::success(stats))),
        Err(e) => {
            log_api_error!("get_study_stats", user_id = user_id, error = &e, "database error loading cards");
            let context = ErrorContext::new("get_study_stats", "stats")
                .with_id(&user_id)
                .with_user_message("Statistics are temporarily unavailable");
            Err(ApiError::DatabaseError(e).to_response_with_context(context))
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Card routes
        .route("/api/cards", post(create_card).get(get_cards_for_user))
        .route("/api/cards/:id", get(get_card).delete(delete_card))
        .route("/api/cards/:id/review", post(review_card))
        .route("/api/cards/:id/rebuild", post(rebuild_card))
        // Planning routes
        .route("/api/users/:user_id/due", get(get_due_cards))
        .route("/api/users/:user_id/schedule", get(get_study_schedule))
        .route("/api/users/:user_id/stats", get(get_study_stats))
        .with_state(state)
}
