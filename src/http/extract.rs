//! Parameter extraction
//!
//! Admin parameters may arrive in the query string or, for POST and PUT, in
//! an `application/x-www-form-urlencoded` body. Body values win over query
//! values of the same name.

use std::collections::HashMap;

use axum::extract::{FromRequest, Query, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use axum::Form;

use crate::admin::{AdminRequest, ControlError, ErrorKind};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Query and form parameters merged into one request
pub(crate) struct AdminParams(pub(crate) AdminRequest);

impl<S: Send + Sync> FromRequest<S> for AdminParams {
    type Rejection = ControlError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(req.uri())
            .map_err(|e| ControlError::new(ErrorKind::MalformedParameter, e.body_text()))?;

        if carries_form(&req) {
            let Form(body) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| ControlError::new(ErrorKind::MalformedParameter, e.body_text()))?;
            params.extend(body);
        }

        Ok(Self(AdminRequest::from(params)))
    }
}

fn carries_form(req: &Request) -> bool {
    if req.method() == Method::GET || req.method() == Method::HEAD {
        return false;
    }
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(FORM_URLENCODED))
}
