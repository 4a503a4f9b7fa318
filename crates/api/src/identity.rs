//! Caller identity taken from headers set by the upstream gateway.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use common::UserId;
use saga::CallerContext;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ADMIN_USERNAME_HEADER: &str = "x-admin-username";
pub const UNKNOWN_ADMIN: &str = "UnknownAdmin";

/// An authenticated customer.
#[derive(Debug, Clone)]
pub struct Caller(pub CallerContext);

impl Caller {
    pub fn user_id(&self) -> UserId {
        self.0.user_id
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("Missing X-User-Id header".to_string()))?;
        let user_id = raw
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| ApiError::Unauthorized("Invalid X-User-Id header".to_string()))?;

        let mut caller = CallerContext::new(user_id);
        if let Some(auth) = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        {
            caller = caller.with_authorization(auth);
        }
        Ok(Caller(caller))
    }
}

/// The acting administrator. Falls back to `UnknownAdmin`.
#[derive(Debug, Clone)]
pub struct Admin(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Admin {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let name = parts
            .headers
            .get(ADMIN_USERNAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(UNKNOWN_ADMIN);
        Ok(Admin(name.to_string()))
    }
}
