//! Bearer-token authentication.
//!
//! The middleware verifies the access token, loads the user and hands the
//! handlers an explicit [`Principal`] through request extensions.

mod password;
mod tokens;

pub use password::*;
pub use tokens::*;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::AppState;

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub email: String,
}

/// Reject the request with 401 unless it carries a valid access token for an active user.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    // Owned so the request is not borrowed across the await.
    let token = bearer_token(&request).map(str::to_string);
    match authenticate(&state, token.as_deref()).await {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(
                path = %request.uri().path(),
                "Rejected request: {}",
                err.message()
            );
            err.into_response()
        }
    }
}

async fn authenticate(state: &AppState, token: Option<&str>) -> Result<Principal, AppError> {
    let token = token.ok_or_else(|| {
        AppError::Unauthorized("Authentication credentials were not provided.".to_string())
    })?;

    let claims = state.sessions.verify_access(token)?;

    let user = state
        .repo
        .get_user(&claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| AppError::Unauthorized("User not found or inactive.".to_string()))?;

    Ok(Principal {
        user_id: user.id,
        email: user.email,
    })
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
