//! HTTP handlers for all web routes.

pub mod admin;
pub mod auth;
pub mod pests;
pub mod site;
pub mod submissions;

use axum::extract::{FromRequest, FromRequestParts};
use serde::Serialize;

use crate::error::ApiError;

/// `Json` whose rejections use the API error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Path` whose rejections use the API error shape.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Mutation acknowledgement. `id` is set by creates, `affected` by updates
/// and deletes.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected: Option<u64>,
}

impl Ack {
    pub fn ok() -> Self {
        Self { success: true, id: None, affected: None }
    }

    pub fn created(id: i64) -> Self {
        Self { id: Some(id), ..Self::ok() }
    }

    pub fn affected(rows: u64) -> Self {
        Self { affected: Some(rows), ..Self::ok() }
    }
}
