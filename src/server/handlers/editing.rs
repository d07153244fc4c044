//! Editing flow handler.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;

use crate::editing::{EditingRequest, EditingResponse};
use crate::error::LayoutError;

use super::super::state::AppState;

pub const HANDLER_NAME: &str = "preview-server";

/// Handle GET /api/layout/editing - run the editing flow for one item.
///
/// Query parameters: `path`, `itemId`, `itemPath`, `sc_lang`, `sc_site`,
/// `version`.
pub async fn editing(
    State(state): State<Arc<AppState>>,
    Query(request): Query<EditingRequest>,
) -> Response {
    match state.editing.handle(&request, HANDLER_NAME).await {
        Ok(response) => editing_response(response),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "errors": [e.to_string()] })),
        )
            .into_response(),
    }
}

fn editing_response(response: EditingResponse) -> Response {
    let status = match (&response.content, response.errors.first()) {
        (Some(_), _) | (None, None) => StatusCode::OK,
        (None, Some(LayoutError::ItemNotFound(_))) => StatusCode::NOT_FOUND,
        (None, Some(LayoutError::Transport { .. })) => StatusCode::BAD_GATEWAY,
        (None, Some(_)) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    let errors: Vec<String> = response.errors.iter().map(ToString::to_string).collect();
    let body = json!({
        "success": response.is_success(),
        "handler": response.handler_name,
        "state": response.state,
        "content": response.content,
        "errors": errors,
    });
    (status, Json(body)).into_response()
}
