use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::app::auth;
use crate::http::ApiError;
use crate::AppState;

/// Identity of the authenticated caller, extracted from the Bearer token.
/// Every guarded handler takes this as an argument; requests without a
/// valid token are rejected before the handler runs.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    pub role: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("invalid Authorization header"))?;

        let identity = auth::verify_token(&state.token_key, token)
            .map_err(|_| ApiError::internal("failed to authenticate"))?;

        let identity = identity.ok_or_else(|| ApiError::unauthorized("invalid or expired token"))?;
        Ok(AuthUser {
            user_id: identity.user_id,
            role: identity.role,
        })
    }
}
