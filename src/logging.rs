//! Standardized logging macros so that every layer emits the same field names
//! (`operation`, `card_id`, `user_id`, `component`) for the same concepts.
//!
//! tracing macros are referenced by full path inside the macro bodies.

// ============================================================================
// API Operation Logging Macros
// ============================================================================

/// Log the start of an API operation with consistent fields
#[macro_export]
macro_rules! log_api_start {
    ($operation:expr, card_id = $card_id:expr) => {
        tracing::debug!(
            operation = $operation,
            card_id = %$card_id,
            "API operation started"
        );
    };
    ($operation:expr, user_id = $user_id:expr) => {
        tracing::debug!(
            operation = $operation,
            user_id = %$user_id,
            "API operation started"
        );
    };
    ($operation:expr) => {
        tracing::debug!(
            operation = $operation,
            "API operation started"
        );
    };
}

/// Log successful completion of an API operation
#[macro_export]
macro_rules! log_api_success {
    ($operation:expr, card_id = $card_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            card_id = %$card_id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, user_id = $user_id:expr, count = $count:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            user_id = %$user_id,
            count = $count,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            "API operation completed: {}", $msg
        );
    };
}

/// Log API operation errors with consistent structure
#[macro_export]
macro_rules! log_api_error {
    ($operation:expr, card_id = $card_id:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            card_id = %$card_id,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
    ($operation:expr, user_id = $user_id:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            user_id = %$user_id,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
}

/// Log API warnings with context
#[macro_export]
macro_rules! log_api_warn {
    ($operation:expr, card_id = $card_id:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            card_id = %$card_id,
            "API operation warning: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            "API operation warning: {}", $msg
        );
    };
}

// ============================================================================
// Service Layer Logging Macros
// ============================================================================

/// Log service operation start with context
#[macro_export]
macro_rules! log_service_start {
    ($service:expr, $operation:expr, card_id = $card_id:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            card_id = %$card_id,
            "Service operation started"
        );
    };
    ($service:expr, $operation:expr, user_id = $user_id:expr) => {
        tracing::debug!(
            service = $service,
            operation = $operation,
            user_id = %$user_id,
            "Service operation started"
        );
    };
}

/// Log service operation success
#[macro_export]
macro_rules! log_service_success {
    ($service:expr, $operation:expr, card_id = $card_id:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            card_id = %$card_id,
            duration_ms = $duration,
            "Service operation completed successfully"
        );
    };
    ($service:expr, $operation:expr, $msg:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            "Service operation completed: {}", $msg
        );
    };
}

/// Log service operation errors
#[macro_export]
macro_rules! log_service_error {
    ($service:expr, $operation:expr, card_id = $card_id:expr, error = $error:expr) => {
        tracing::error!(
            service = $service,
            operation = $operation,
            card_id = %$card_id,
            error = %$error,
            "Service operation failed"
        );
    };
}

// ============================================================================
// Database Operation Logging Macros
// ============================================================================

/// Log database operation performance and results
#[macro_export]
macro_rules! log_db_operation {
    (debug, $operation:expr, card_id = $card_id:expr, duration_ms = $duration:expr) => {
        tracing::debug!(
            component = "database",
            operation = $operation,
            card_id = %$card_id,
            duration_ms = $duration,
            "Database operation completed"
        );
    };
    (debug, $operation:expr, count = $count:expr, duration_ms = $duration:expr) => {
        tracing::debug!(
            component = "database",
            operation = $operation,
            result_count = $count,
            duration_ms = $duration,
            "Database operation completed"
        );
    };
    (info, $operation:expr, $msg:expr) => {
        tracing::info!(
            component = "database",
            operation = $operation,
            "Database operation: {}", $msg
        );
    };
}

// ============================================================================
// Scheduler Logging Macros
// ============================================================================

/// Log decisions made by the pure scheduler core
#[macro_export]
macro_rules! log_scheduler {
    (card_id = $card_id:expr, quality = $quality:expr, interval_days = $interval:expr, ease_factor = $ease:expr, $msg:expr) => {
        tracing::debug!(
            component = "scheduler",
            card_id = %$card_id,
            quality = $quality,
            interval_days = $interval,
            ease_factor = $ease,
            "Scheduler: {}", $msg
        );
    };
    (planner, $operation:expr, card_count = $count:expr, $msg:expr) => {
        tracing::debug!(
            component = "study_planner",
            operation = $operation,
            card_count = $count,
            "Scheduler: {}", $msg
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log system startup and shutdown events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (shutdown, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "shutdown",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}
