//! Authentication API endpoints: registration, login, token rotation and profile.

use axum::{extract::State, Extension, Json};

use super::{created, success, ApiResult};
use crate::auth::{hash_password, validate_password, verify_password, Principal};
use crate::errors::{AppError, ValidationErrors};
use crate::models::{
    check_name, is_valid_email, normalize_email, AuthResponse, ChangePasswordRequest,
    LoginRequest, MessageResponse, RefreshTokenRequest, RegisterRequest, TokenPair,
    UpdateProfileRequest, User,
};
use crate::AppState;

/// POST /api/auth/register - Create an account and open a session.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    let email = normalize_email(&request.email);

    let mut errors = ValidationErrors::new();
    if email.is_empty() {
        errors.add("email", "This field may not be blank.");
    } else if !is_valid_email(&email) {
        errors.add("email", "Enter a valid email address.");
    }
    check_name(&mut errors, "firstName", &request.first_name);
    check_name(&mut errors, "lastName", &request.last_name);
    validate_password(&mut errors, "password", &request.password, &email);
    if request.password != request.password_confirm {
        errors.add("passwordConfirm", "Password fields didn't match.");
    }
    errors.into_result()?;

    let password_hash = hash_password(&request.password)?;
    let user = state
        .repo
        .insert_user(
            &email,
            &password_hash,
            request.first_name.trim(),
            request.last_name.trim(),
        )
        .await?;
    let tokens = state.sessions.issue_session(&user)?;

    created(AuthResponse {
        message: "User registered successfully".to_string(),
        user,
        tokens,
    })
}

/// POST /api/auth/login - Exchange credentials for a token pair.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let email = normalize_email(&request.email);

    let Some((user, password_hash)) = state.repo.get_user_credentials(&email).await? else {
        tracing::warn!("Login attempt for unknown email");
        return Err(invalid_credentials());
    };
    if !verify_password(&request.password, &password_hash) {
        tracing::warn!(user_id = %user.id, "Login attempt with wrong password");
        return Err(invalid_credentials());
    }
    if !user.is_active {
        return Err(AppError::InvalidCredentials(
            "User account is disabled.".to_string(),
        ));
    }

    state.repo.touch_last_login(&user.id).await?;
    let user = load_user(&state, &user.id).await?;
    let tokens = state.sessions.issue_session(&user)?;

    tracing::info!(user_id = %user.id, "User logged in");
    success(AuthResponse {
        message: "Login successful".to_string(),
        user,
        tokens,
    })
}

/// POST /api/auth/token/refresh - Rotate a refresh token into a new pair.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> ApiResult<TokenPair> {
    let claims = state.sessions.verify_refresh(&request.refresh)?;

    let user = state
        .repo
        .get_user(&claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| AppError::Unauthorized("User not found or inactive.".to_string()))?;

    // Revoking is the single-use check: only the first presenter gets a new pair.
    let revoked = state
        .repo
        .revoke_token(&claims.jti, &user.id, claims.expires_at())
        .await?;
    if !revoked {
        tracing::warn!(user_id = %user.id, "Refresh token replayed");
        return Err(AppError::Unauthorized("Token is blacklisted".to_string()));
    }
    let tokens = state.sessions.issue_session(&user)?;

    tracing::info!(user_id = %user.id, "Session refreshed");
    success(tokens)
}

/// POST /api/auth/logout - Revoke the caller's refresh token.
pub async fn logout(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<RefreshTokenRequest>,
) -> ApiResult<MessageResponse> {
    let claims = state
        .sessions
        .verify_refresh(&request.refresh)
        .map_err(|e| AppError::field("refresh", e.to_string()))?;
    if claims.sub != principal.user_id {
        return Err(AppError::field(
            "refresh",
            "Token does not belong to the current user.",
        ));
    }

    state
        .repo
        .revoke_token(&claims.jti, &principal.user_id, claims.expires_at())
        .await?;

    tracing::info!(user_id = %principal.user_id, "User logged out");
    success(MessageResponse::new("Successfully logged out"))
}

/// GET /api/auth/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<User> {
    success(load_user(&state, &principal.user_id).await?)
}

/// PATCH /api/auth/profile - Partial update of names and bio.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<User> {
    let mut errors = ValidationErrors::new();
    request.validate(&mut errors);
    errors.into_result()?;

    success(state.repo.update_profile(&principal.user_id, &request).await?)
}

/// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<MessageResponse> {
    let current_hash = state.repo.get_password_hash(&principal.user_id).await?;

    let mut errors = ValidationErrors::new();
    if !verify_password(&request.old_password, &current_hash) {
        errors.add("oldPassword", "Old password is incorrect.");
    }
    validate_password(
        &mut errors,
        "newPassword",
        &request.new_password,
        &principal.email,
    );
    if request.new_password != request.new_password_confirm {
        errors.add("newPasswordConfirm", "Password fields didn't match.");
    }
    errors.into_result()?;

    let new_hash = hash_password(&request.new_password)?;
    state
        .repo
        .set_password_hash(&principal.user_id, &new_hash)
        .await?;

    tracing::info!(user_id = %principal.user_id, "Password changed");
    success(MessageResponse::new("Password changed successfully"))
}

fn invalid_credentials() -> AppError {
    AppError::InvalidCredentials("Invalid email or password.".to_string())
}

async fn load_user(state: &AppState, user_id: &str) -> Result<User, AppError> {
    state
        .repo
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
}
