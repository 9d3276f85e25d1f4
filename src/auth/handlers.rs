use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use super::{
    dto::{AuthData, LoginRequest, MeData, RegisterRequest},
    extractors::AuthUser,
    jwt::TokenPayload,
    password::{hash_password, verify_password},
    services::{is_valid_email, normalize_email, present, MIN_PASSWORD_LEN},
};
use crate::{
    error::AppError,
    response::{ApiJson, ApiResponse},
    state::AppState,
    users::{
        dto::blank_to_none,
        model::{NewUser, PublicUser, User},
    },
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_current_user))
        .route("/auth/logout", post(logout))
}

fn issue_token(state: &AppState, user: &User) -> Result<String, AppError> {
    let token = state.keys.generate_token(&TokenPayload {
        user_id: user.id,
        email: user.email.clone(),
    })?;
    Ok(token)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, ApiResponse<AuthData>), AppError> {
    let (Some(email), Some(password), Some(first_name), Some(last_name)) = (
        present(payload.email.as_deref()),
        payload.password.as_deref().filter(|p| !p.is_empty()),
        present(payload.first_name.as_deref()),
        present(payload.last_name.as_deref()),
    ) else {
        return Err(AppError::validation(
            "Email, password, first name and last name are required",
        ));
    };

    let email = normalize_email(email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("Invalid email format"));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::validation("Email is already registered"));
    }

    let plain = password.to_string();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .map_err(anyhow::Error::from)??;

    let new_user = NewUser {
        email: email.clone(),
        password_hash,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        date_of_birth: payload.date_of_birth,
        gender: blank_to_none(payload.gender),
        phone: blank_to_none(payload.phone),
    };

    // Lost the race against a concurrent registration for the same email.
    let Some(user) = state.users.create(new_user).await? else {
        warn!(email = %email, "email already registered");
        return Err(AppError::validation("Email is already registered"));
    };

    let token = issue_token(&state, &user)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        ApiResponse::data(AuthData {
            onboarding_completed: user.onboarding_completed,
            user: PublicUser::from(&user),
            token,
        })
        .with_message("User registered successfully"),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<ApiResponse<AuthData>, AppError> {
    let (Some(email), Some(password)) = (
        present(payload.email.as_deref()),
        payload.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation("Email and password are required"));
    };
    let email = normalize_email(email);

    let Some(mut user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    };

    let (plain, stored) = (password.to_string(), user.password_hash.clone());
    let matches = tokio::task::spawn_blocking(move || verify_password(&plain, &stored))
        .await
        .map_err(anyhow::Error::from)??;
    if !matches {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }

    let now = OffsetDateTime::now_utc();
    state.users.record_login(user.id, now).await?;
    user.last_login = Some(now);

    let token = issue_token(&state, &user)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(ApiResponse::data(AuthData {
        onboarding_completed: user.onboarding_completed,
        user: PublicUser::from(&user),
        token,
    })
    .with_message("Login successful"))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_current_user(AuthUser(user): AuthUser) -> ApiResponse<MeData> {
    ApiResponse::data(MeData {
        user: PublicUser::from(&user),
    })
}

/// Tokens are stateless; the client discards its copy.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn logout(AuthUser(user): AuthUser) -> ApiResponse<()> {
    info!("user logged out");
    ApiResponse::message("Logged out successfully")
}
