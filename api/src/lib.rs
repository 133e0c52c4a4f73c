//! HTTP surface over the controller registry: `GET /state_all`,
//! `GET /state/{env}`, `POST /up/{env}`, `POST /down/{env}`.

pub mod routes;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use scheduler_controller::{ControllerError, Registry};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
}

/// Maps controller error kinds to the HTTP status codes this surface
/// promises, and everything else to a plain JSON message.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl From<ControllerError> for AppError {
    fn from(err: ControllerError) -> Self {
        let status = match err {
            ControllerError::UnknownEnvironment(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ControllerError::AnotherActionInProgress(_) => StatusCode::CONFLICT,
            ControllerError::ManualAlreadyScheduled(_) => StatusCode::CONFLICT,
            ControllerError::EnvironmentAlreadyScheduled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError { status, message: err.to_string() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/state_all", get(routes::state_all))
        .route("/state/:env", get(routes::state_one))
        .route("/up/:env", post(routes::up))
        .route("/down/:env", post(routes::down))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
