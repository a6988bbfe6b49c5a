//! JSON error bodies for the HTTP routes.
//!
//! Game errors on the socket are answered with `invalidMove` or dropped and
//! never reach this module.

use serde::{Deserialize, Serialize};
use std::fmt;
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::Reply;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Machine-readable code, e.g. "session_storage_error"
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }

    pub fn into_response(self, status: StatusCode) -> Response {
        reply::with_status(reply::json(&self), status).into_response()
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

pub trait IntoErrorResponse: fmt::Display {
    fn status_code(&self) -> StatusCode;

    fn error_code(&self) -> &'static str;

    /// Render as an HTTP response. Server-side failures are logged at error
    /// level, everything else at info.
    fn into_http_response(self) -> Response
    where
        Self: Sized,
    {
        let status = self.status_code();
        let body = ErrorResponse::new(self.error_code(), self.to_string());

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %body.error, message = %body.message, "request failed");
        } else {
            tracing::info!(status = status.as_u16(), error = %body.error, message = %body.message, "request rejected");
        }

        body.into_response(status)
    }
}
