//! Request helpers shared by the ingress handlers

use axum::body::Body;
use axum::http::{HeaderMap, header};
use http_body_util::{BodyExt, Limited};

use crate::api::error::ApiError;

/// Require `Content-Type: application/json`, optionally with parameters.
///
/// `application/jsonp`, `application/*+json` and `text/json` are refused.
pub fn require_json(headers: &HeaderMap) -> Result<mime::Mime, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;

    parse_content_type(content_type)
}

pub fn parse_content_type(content_type: &str) -> Result<mime::Mime, ApiError> {
    let media_type: mime::Mime = content_type
        .parse()
        .map_err(|_| ApiError::InvalidPayload(format!("invalid Content-Type: {content_type}")))?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(ApiError::InvalidPayload(format!(
            "Content-Type must be application/json, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(media_type)
}

/// Collect a request body, refusing anything over `max_bytes`.
///
/// The limit applies after `RequestDecompressionLayer` has inflated the body.
pub async fn read_body(body: Body, max_bytes: usize) -> Result<Vec<u8>, ApiError> {
    if let Some(declared) = declared_length(&body) {
        if declared > max_bytes {
            return Err(ApiError::PayloadTooLarge(declared));
        }
    }

    let collected = Limited::new(body, max_bytes)
        .collect()
        .await
        .map_err(|err| {
            if err.is::<http_body_util::LengthLimitError>() {
                ApiError::PayloadTooLarge(max_bytes + 1)
            } else {
                ApiError::Internal(err.to_string())
            }
        })?;

    Ok(collected.to_bytes().to_vec())
}

fn declared_length(body: &Body) -> Option<usize> {
    axum::body::HttpBody::size_hint(body)
        .exact()
        .and_then(|len| usize::try_from(len).ok())
}
