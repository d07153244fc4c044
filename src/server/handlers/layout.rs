//! Layout parse and decorate handlers.
//!
//! Both take a raw layout service document as the request body and answer
//! with the content tree serialized back to layout JSON.

use axum::{Json, http::StatusCode, response::IntoResponse};

use crate::chrome::{ChromeFeed, inject_chromes};
use crate::layout::{LayoutDeserializer, LayoutResponse};

fn parse_body(body: &str) -> Result<LayoutResponse, (StatusCode, String)> {
    LayoutDeserializer::default()
        .deserialize(body)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

/// Handle POST /api/layout/parse - parse a layout document.
pub async fn parse(body: String) -> Result<impl IntoResponse, (StatusCode, String)> {
    let response = parse_body(&body)?;
    Ok(Json(response))
}

/// Handle POST /api/layout/decorate - parse and wrap every placeholder,
/// rendering and editable field in chromes.
pub async fn decorate(body: String) -> Result<impl IntoResponse, (StatusCode, String)> {
    let response = parse_body(&body)?;
    Ok(Json(inject_chromes(response, &ChromeFeed::everything())))
}
