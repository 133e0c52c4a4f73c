use axum::extract::{Path, State};
use axum::response::Json;
use chrono::Utc;
use scheduler_core::ActionKind;
use serde::Serialize;
use tracing::{debug, info};

use crate::{AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct StateAllResponse {
    environments: Vec<scheduler_controller::EnvState>,
}

pub async fn state_all(State(state): State<AppState>) -> AppResult<Json<StateAllResponse>> {
    debug!("handling GET /state_all");
    let environments = state.registry.list_all_states().await;
    Ok(Json(StateAllResponse { environments }))
}

pub async fn state_one(
    State(state): State<AppState>,
    Path(env): Path<String>,
) -> AppResult<Json<scheduler_controller::EnvState>> {
    debug!(env = %env, "handling GET /state/{env}");
    let snapshot = state.registry.get_state(&env).await?;
    Ok(Json(snapshot))
}

pub async fn up(State(state): State<AppState>, Path(env): Path<String>) -> AppResult<()> {
    dispatch_manual(state, env, ActionKind::Up).await
}

pub async fn down(State(state): State<AppState>, Path(env): Path<String>) -> AppResult<()> {
    dispatch_manual(state, env, ActionKind::Down).await
}

async fn dispatch_manual(state: AppState, env: String, kind: ActionKind) -> AppResult<()> {
    let now = Utc::now().with_timezone(&chrono_tz::Tz::UTC);
    state.registry.request_action(&env, kind, now).await?;
    info!(env = %env, ?kind, "manual action accepted");
    Ok(())
}
