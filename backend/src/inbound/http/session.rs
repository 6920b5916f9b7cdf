//! Authentication and session handlers.

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use zeroize::Zeroizing;

use super::auth::bearer_token;
use super::state::HttpState;
use crate::domain::auth::{LoginCredentials, Role};
use crate::domain::session_service::{NewAccount, SessionTokens};
use crate::domain::token::TokenClass;
use crate::domain::user::{Email, UserAccount};
use crate::domain::Error;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[schema(example = "Amit Kumar")]
    pub full_name: String,
    #[schema(example = "amit@example.com")]
    pub email: String,
    #[schema(example = "9876543210")]
    pub phone: String,
    #[schema(example = "Traffic@123")]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Token pair returned by login, registration, and refresh.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in_secs: u64,
    pub role: Role,
}

impl TokenResponse {
    fn from_session(tokens: SessionTokens, access_ttl_secs: u64) -> Self {
        Self {
            access_token: tokens.access.token,
            refresh_token: tokens.refresh.token,
            token_type: "bearer".to_owned(),
            expires_in_secs: access_ttl_secs,
            role: tokens.role,
        }
    }
}

/// The caller's own account, sans credentials.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub last_login: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&UserAccount> for UserResponse {
    fn from(account: &UserAccount) -> Self {
        Self {
            id: account.id.as_uuid(),
            full_name: account.full_name.clone(),
            email: account.email.as_str().to_owned(),
            phone: account.phone.clone(),
            role: account.role,
            last_login: account.last_login,
            created_at: account.created_at,
        }
    }
}

fn parse_email(raw: &str) -> Result<Email, Error> {
    Email::parse(raw).map_err(|_| Error::invalid_request("not a valid email address"))
}

fn access_ttl_secs(state: &HttpState) -> u64 {
    state.sessions.codec().ttl(TokenClass::Access).as_secs()
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, session opened", body = TokenResponse),
        (status = 400, description = "Validation failed", body = super::error::ErrorBody),
        (status = 409, description = "Email already registered", body = super::error::ErrorBody),
    ),
    tag = "auth"
)]
#[post("/auth/register")]
pub async fn register(
    state: web::Data<HttpState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, Error> {
    let body = body.into_inner();
    let tokens = state
        .sessions
        .register(NewAccount {
            full_name: body.full_name,
            email: parse_email(&body.email)?,
            phone: body.phone,
            password: Zeroizing::new(body.password),
        })
        .await?;
    let ttl = access_ttl_secs(&state);
    Ok(HttpResponse::Created().json(TokenResponse::from_session(tokens, ttl)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = super::error::ErrorBody),
        (status = 423, description = "Account locked", body = super::error::ErrorBody),
    ),
    tag = "auth"
)]
#[post("/auth/login")]
pub async fn login(
    state: web::Data<HttpState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, Error> {
    let body = body.into_inner();
    let credentials = LoginCredentials::new(parse_email(&body.email)?, body.password);
    let tokens = state.sessions.login(credentials).await?;
    let ttl = access_ttl_secs(&state);
    Ok(HttpResponse::Ok().json(TokenResponse::from_session(tokens, ttl)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token pair rotated", body = TokenResponse),
        (status = 401, description = "Refresh token rejected", body = super::error::ErrorBody),
    ),
    tag = "auth"
)]
#[post("/auth/refresh")]
pub async fn refresh(
    state: web::Data<HttpState>,
    body: web::Json<RefreshRequest>,
) -> Result<HttpResponse, Error> {
    let tokens = state.sessions.refresh(&body.refresh_token).await?;
    let ttl = access_ttl_secs(&state);
    Ok(HttpResponse::Ok().json(TokenResponse::from_session(tokens, ttl)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 204, description = "Refresh token revoked"),
        (status = 401, description = "Not authenticated", body = super::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
#[post("/auth/logout")]
pub async fn logout(state: web::Data<HttpState>, req: HttpRequest) -> Result<HttpResponse, Error> {
    let caller = state.sessions.authorize(bearer_token(&req), &[]).await?;
    state.sessions.logout(&caller).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "The caller's account", body = UserResponse),
        (status = 401, description = "Not authenticated", body = super::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
#[get("/auth/me")]
pub async fn me(state: web::Data<HttpState>, req: HttpRequest) -> Result<HttpResponse, Error> {
    let caller = state.sessions.authorize(bearer_token(&req), &[]).await?;
    let account = state.sessions.current_user(&caller).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&account)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed, refresh tokens revoked"),
        (status = 401, description = "Current password incorrect", body = super::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
#[post("/auth/change-password")]
pub async fn change_password(
    state: web::Data<HttpState>,
    req: HttpRequest,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, Error> {
    let caller = state.sessions.authorize(bearer_token(&req), &[]).await?;
    state
        .sessions
        .change_password(&caller, &body.current_password, &body.new_password)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
