//! HTTP surface: commit endpoint plus read-only diagnostics.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use courier_core::domain::{AppointmentId, BookingError, BookingRequest};

use crate::wiring::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/appointments", post(create_appointment))
        .route("/appointments/:id/tasks", get(task_statuses))
        .route("/diagnostics/summary", get(summary))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn create_appointment(
    State(state): State<AppState>,
    body: Result<Json<BookingRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text());
        }
    };

    match state.booking.commit(request).await {
        Ok(appointment) => (StatusCode::CREATED, Json(appointment)).into_response(),
        Err(err) => booking_error_to_response(err),
    }
}

async fn task_statuses(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(id) = id.parse::<AppointmentId>() else {
        return json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("'{id}' is not an appointment id"));
    };
    match state.diagnostics.get_task_statuses(id) {
        Some(report) => Json(report).into_response(),
        None => json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("no task statuses for appointment {id}"),
        ),
    }
}

async fn summary(State(state): State<AppState>) -> Response {
    Json(state.diagnostics.summary()).into_response()
}

fn booking_error_to_response(err: BookingError) -> Response {
    let status = match err {
        BookingError::Validation { .. } => StatusCode::BAD_REQUEST,
        BookingError::Conflict { .. } => StatusCode::CONFLICT,
        BookingError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_error(status, err.code(), err.to_string())
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
