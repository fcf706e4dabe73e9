use crate::api::ApiResponse;
use axum::{http::StatusCode, response::Json};
use tracing::{error, info, warn};

/// Rejections raised by the scheduler's validating entry point.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulerError {
    #[error("Quality must be between 0 and 5, got {0}")]
    InvalidQuality(i32),

    #[error("Accuracy must be between 0 and 100, got {0}")]
    InvalidAccuracy(f64),

    #[error("Response time must be a positive number of seconds, got {0}")]
    InvalidResponseTime(f64),
}

/// Rejections of a card creation request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CardValidationError {
    #[error("Difficulty must be between 0 and 5, got {0}")]
    InvalidDifficulty(f64),

    #[error("Surah id must be between 1 and 114, got {0}")]
    InvalidSurah(i32),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

/// Centralized error types for consistent API error handling
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] anyhow::Error),

    #[error("Resource already exists: {0}")]
    DuplicateResource(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl From<CardValidationError> for ApiError {
    fn from(err: CardValidationError) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

/// Error context for structured logging
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub resource_id: Option<String>,
    pub resource_type: String,
    pub user_friendly_message: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            resource_id: None,
            resource_type: resource_type.to_string(),
            user_friendly_message: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn with_user_message(mut self, message: &str) -> Self {
        self.user_friendly_message = Some(message.to_string());
        self
    }
}

impl ApiError {
    /// Convert API error to HTTP response with consistent structure and logging
    pub fn to_response_with_context(
        self,
        context: ErrorContext,
    ) -> (StatusCode, Json<ApiResponse<()>>) {
        match &self {
            ApiError::NotFound(_) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Resource not found"
                );
                (
                    StatusCode::NOT_FOUND,
                    Json(ApiResponse::error(
                        context
                            .user_friendly_message
                            .unwrap_or_else(|| format!("{} not found", context.resource_type)),
                    )),
                )
            }
            ApiError::ValidationError(_) | ApiError::BadRequest(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Rejected request"
                );
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error(self.to_string())),
                )
            }
            ApiError::DuplicateResource(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Duplicate resource"
                );
                (
                    StatusCode::CONFLICT,
                    Json(ApiResponse::error(self.to_string())),
                )
            }
            ApiError::DatabaseError(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Database error"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(context.user_friendly_message.unwrap_or_else(
                        || "Database operation failed. Please try again.".to_string(),
                    ))),
                )
            }
        }
    }

    /// Conversion with a generic context
    pub fn to_response(self) -> (StatusCode, Json<ApiResponse<()>>) {
        let context = ErrorContext::new("unknown", "resource");
        self.to_response_with_context(context)
    }
}

/// Sort an anyhow error coming out of the service layer into an ApiError
pub fn classify_database_error(error: &anyhow::Error) -> ApiError {
    if let Some(rejection) = error.downcast_ref::<SchedulerError>() {
        return ApiError::from(rejection.clone());
    }
    if let Some(rejection) = error.downcast_ref::<CardValidationError>() {
        return ApiError::from(rejection.clone());
    }

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("already exists") || error_str.contains("unique constraint") {
        // Extract the relevant part of the error message
        if let Some(start) = error_str.find('\'') {
            if let Some(end) = error_str[start + 1..].find('\'') {
                let identifier = &error_str[start + 1..start + 1 + end];
                return ApiError::DuplicateResource(format!(
                    "Resource '{}' already exists",
                    identifier
                ));
            }
        }
        ApiError::DuplicateResource("Resource already exists".to_string())
    } else if error_str.contains("not found") || error_str.contains("no rows") {
        ApiError::NotFound("Resource not found".to_string())
    } else if error_str.contains("required") || error_str.contains("cannot be null") {
        ApiError::ValidationError("Required field is missing or invalid".to_string())
    } else {
        ApiError::DatabaseError(anyhow::anyhow!("{}", error))
    }
}
