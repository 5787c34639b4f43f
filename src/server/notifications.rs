//! Notification feed. Any authenticated caller may read it and mark entries
//! read; no permission-matrix resource covers notifications.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::debug;

use super::AppState;
use crate::error::AppResult;
use crate::identity::Caller;

pub async fn list(State(state): State<AppState>, _caller: Caller) -> AppResult<Json<Value>> {
    let (data, unread) = {
        let store = state.store.0.lock();
        (store.recent_notifications(), store.unread_notifications())
    };
    Ok(Json(json!({ "success": true, "data": data, "unread_count": unread })))
}

/// Marking an unknown id still reports success, matching what the UI expects.
pub async fn mark_read(State(state): State<AppState>, caller: Caller, Path(id): Path<i64>) -> AppResult<Json<Value>> {
    let found = state.write(move |store| Ok(store.mark_notification_read(id)?)).await?;
    if !found {
        debug!(user = %caller.username(), notification_id = id, "mark_read on unknown notification");
    }
    Ok(Json(json!({ "success": true })))
}
