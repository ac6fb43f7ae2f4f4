//! Extractors whose rejections render as `ApiError`.

use axum::extract::{FromRequest, FromRequestParts};

use super::error::ApiError;

/// JSON body; decode failures become `ApiError::BadRequest`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Path parameters; parse failures become `ApiError::BadRequest`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);
