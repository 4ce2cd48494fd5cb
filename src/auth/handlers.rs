use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, MessageResponse, PublicUser, RefreshRequest,
            RegisterRequest, ResetPasswordRequest, ResetRequest, UpdateAccountRequest,
        },
        jwt::{AuthUser, JwtKeys},
        repo_types::User,
        reset::ResetTokens,
        services,
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/reset-password", post(request_reset))
        .route(
            "/auth/reset-password/:token",
            get(check_reset_token).post(reset_with_token),
        )
}

pub fn account_routes() -> Router<AppState> {
    Router::new().route("/account", get(get_account).put(update_account))
}

fn issue_pair(keys: &JwtKeys, user: User) -> AppResult<AuthResponse> {
    Ok(AuthResponse {
        access_token: keys.sign_access(user.id)?,
        refresh_token: keys.sign_refresh(user.id)?,
        user: user.into(),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    if payload.password != payload.confirm_password {
        return Err(AppError::Validation("Passwords must match".into()));
    }
    let user = services::register(
        state.users.as_ref(),
        &payload.username,
        &payload.email,
        &payload.password,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = services::authenticate(state.users.as_ref(), &payload.email, &payload.password)
        .await?
        .ok_or_else(|| {
            AppError::Unauthenticated("Login unsuccessful. Please check email and password".into())
        })?;

    let keys = JwtKeys::from_ref(&state);
    info!(user_id = %user.id, "user logged in");
    Ok(Json(issue_pair(&keys, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::Unauthenticated("Invalid or expired refresh token".into())
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".into()))?;
    Ok(Json(issue_pair(&keys, user)?))
}

#[instrument(skip(state))]
pub async fn get_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".into()))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateAccountRequest>,
) -> AppResult<Json<PublicUser>> {
    let user =
        services::update_profile(state.users.as_ref(), user_id, &payload.username, &payload.email)
            .await?;
    Ok(Json(user.into()))
}

const RESET_ACCEPTED: &str =
    "If an account exists for that email, a message with reset instructions has been sent";

/// Always answers the same way so the response does not reveal which emails exist.
#[instrument(skip(state, payload))]
pub async fn request_reset(
    State(state): State<AppState>,
    Json(payload): Json<ResetRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let email = services::normalize_email(&payload.email);
    match state.users.find_by_email(&email).await? {
        Some(user) => {
            let tokens = ResetTokens::from_ref(&state);
            services::send_reset_email(
                state.mailer.clone(),
                &tokens,
                &state.config.base_url,
                &user,
            )?;
        }
        None => warn!(%email, "reset requested for unknown email"),
    }
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: RESET_ACCEPTED,
        }),
    ))
}

#[instrument(skip(state, token))]
pub async fn check_reset_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<StatusCode> {
    let tokens = ResetTokens::from_ref(&state);
    services::verify_reset_token(state.users.as_ref(), &tokens, &token)
        .await
        .ok_or(AppError::InvalidToken)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, token, payload))]
pub async fn reset_with_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let tokens = ResetTokens::from_ref(&state);
    let user = services::verify_reset_token(state.users.as_ref(), &tokens, &token)
        .await
        .ok_or(AppError::InvalidToken)?;

    if payload.password != payload.confirm_password {
        return Err(AppError::Validation("Passwords must match".into()));
    }
    services::reset_password(state.users.as_ref(), user.id, &payload.password).await?;
    Ok(Json(MessageResponse {
        message: "Your password has been updated! You are now able to log in",
    }))
}
