use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderName;
use uuid::Uuid;

use crate::app::profiles::ProfileService;
use crate::http::AppError;
use crate::AppState;

/// Caller identity, as asserted by the identity gateway in front of the API.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Caller whose profile carries the admin flag.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: Uuid,
}

/// Server-to-server caller holding the configured admin token.
#[derive(Debug, Clone)]
pub struct ServiceToken;

const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
const ADMIN_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-admin-token");

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing user identity"))?;

        let user_id = Uuid::parse_str(user_id.trim())
            .map_err(|_| AppError::unauthorized("invalid user identity"))?;

        Ok(AuthUser { user_id })
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;

        let service = ProfileService::new(state.profiles.clone());
        let profile = service.get(auth.user_id).await.map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to load profile");
            AppError::internal("failed to authorize")
        })?;

        match profile {
            Some(profile) if profile.is_admin => Ok(AdminUser {
                user_id: auth.user_id,
            }),
            _ => Err(AppError::forbidden("admin access required")),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for ServiceToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state
            .admin_token
            .as_ref()
            .ok_or_else(|| AppError::forbidden("admin token not configured"))?;

        let provided = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::forbidden("missing admin token"))?;

        if provided != expected {
            return Err(AppError::forbidden("invalid admin token"));
        }

        Ok(ServiceToken)
    }
}
