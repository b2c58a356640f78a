/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use builder::error::SubmitError;
use shipyard_core::input::InputError;
use shipyard_core::ledger::LedgerError;
use shipyard_core::types::BaseResponse;
use std::fmt;

#[derive(Debug)]
pub enum WebError {
    NotFound(String),
    InputValidation(InputError),
    JsonParsing(JsonRejection),
    Store(LedgerError),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            WebError::InputValidation(err) => write!(f, "Input validation error: {}", err),
            WebError::JsonParsing(err) => write!(f, "JSON parsing error: {}", err),
            WebError::Store(err) => write!(f, "Store error: {}", err),
        }
    }
}

impl std::error::Error for WebError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WebError::InputValidation(err) => Some(err),
            WebError::JsonParsing(err) => Some(err),
            WebError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LedgerError> for WebError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(_) => WebError::not_found("Build"),
            err => WebError::Store(err),
        }
    }
}

impl From<SubmitError> for WebError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::InvalidRequest(err) => WebError::InputValidation(err),
            SubmitError::Store(err) => WebError::from(err),
        }
    }
}

impl From<InputError> for WebError {
    fn from(err: InputError) -> Self {
        WebError::InputValidation(err)
    }
}

impl From<JsonRejection> for WebError {
    fn from(err: JsonRejection) -> Self {
        WebError::JsonParsing(err)
    }
}

/// Build ids only come from the path, so an id that does not parse names no build.
impl From<PathRejection> for WebError {
    fn from(err: PathRejection) -> Self {
        tracing::debug!("Rejected build path: {}", err.body_text());
        WebError::not_found("Build")
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            WebError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            WebError::InputValidation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            WebError::JsonParsing(err) => {
                (StatusCode::BAD_REQUEST, format!("Invalid JSON: {}", err.body_text()))
            }
            WebError::Store(err) => {
                tracing::error!("Store error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Store error".to_string())
            }
        };

        let body = Json(BaseResponse {
            error: true,
            message: error_message,
        });

        (status, body).into_response()
    }
}

pub type WebResult<T> = Result<T, WebError>;

impl WebError {
    pub fn not_found(resource: &str) -> Self {
        WebError::NotFound(format!("{} not found", resource))
    }
}
