//! Authentication: password hashing, bearer tokens and the request extractor
//! that turns a bearer token into an [`Actor`].

pub mod password;
pub mod tokens;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use model::entities::user;
use policy::Actor;
use sea_orm::EntityTrait;
use tracing::{debug, warn};

use crate::{error::ApiError, schemas::AppState};

pub use password::{hash_password, verify_password};
pub use tokens::{TokenIssuer, TokenType};

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The authenticated caller of a request.
pub struct CurrentUser {
    pub user: user::Model,
    pub actor: Actor,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                ApiError::Unauthenticated("Authentication credentials were not provided".into())
            })?;

        let token = bearer_token(header)
            .ok_or_else(|| ApiError::Unauthenticated("Malformed authorization header".into()))?;

        let claims = state.tokens.verify(token, TokenType::Access)?;

        let user = user::Entity::find_by_id(claims.sub)
            .one(&state.db)
            .await?
            .ok_or_else(|| {
                warn!("Token refers to missing user {}", claims.sub);
                ApiError::Unauthenticated("User not found".into())
            })?;

        if !user.is_active {
            warn!("Rejected token of inactive user {}", user.id);
            return Err(ApiError::Unauthenticated("User account is disabled".into()));
        }

        let actor = Actor::resolve(&state.db, &user).await?;
        debug!(?actor, "Authenticated request");

        Ok(CurrentUser { user, actor })
    }
}
