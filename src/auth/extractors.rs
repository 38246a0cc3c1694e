use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::auth::jwt::JwtKeys;
use crate::auth::User;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated identity for protected routes. Extracts the bearer token,
/// verifies it and resolves the embedded id to a live user row; the handler
/// never runs when any step fails.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::Unauthenticated("Please authenticate."))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthenticated("Please authenticate."))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            AppError::Unauthenticated("Please authenticate.")
        })?;

        // A token for a user that no longer exists is invalid.
        let user = User::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = claims.sub, "token references unknown user");
                AppError::Unauthenticated("Please authenticate.")
            })?;

        Ok(CurrentUser(user))
    }
}
