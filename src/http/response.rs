//! Rendering of admin outcomes as HTTP responses

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::admin::{ControlError, Reply};

const MUST_REVALIDATE: &str = "must-revalidate";
const TEXT_PLAIN: &str = "text/plain";
const APPLICATION_JSON: &str = "application/json";

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let plain = [(CACHE_CONTROL, MUST_REVALIDATE), (CONTENT_TYPE, TEXT_PLAIN)];
        match self {
            Reply::Created => (StatusCode::CREATED, plain).into_response(),
            Reply::Done => (StatusCode::OK, plain).into_response(),
            Reply::Listing(json) => (
                StatusCode::OK,
                [
                    (CACHE_CONTROL, MUST_REVALIDATE),
                    (CONTENT_TYPE, APPLICATION_JSON),
                ],
                json,
            )
                .into_response(),
        }
    }
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let status = if self.kind.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!("Admin request failed on the server: {}", self.message);
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (
            status,
            [(CACHE_CONTROL, MUST_REVALIDATE), (CONTENT_TYPE, TEXT_PLAIN)],
            self.message,
        )
            .into_response()
    }
}
