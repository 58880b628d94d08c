//! Request extractors whose rejections use the API error format

use axum::extract::{FromRequest, FromRequestParts};

use crate::utils::AppError;

/// JSON body; a malformed or mistyped body is a `validation_error`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string; an unparsable parameter is a `validation_error`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);
