use crate::server::{
    Result, ServerError, ServerRouter,
    auth::{TokenSettings, issue_token, verify_token},
    extract::{Created, Json},
};
use agora_common::model::{
    auth::{AccessToken, Credentials, LoggedOut, RefreshRequest, TokenKind, TokenPair},
    user::{CreateUser, CreatedUser, Email},
};
use agora_db::client::DbClient;
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(register)
        .typed_post(obtain_token)
        .typed_post(refresh_token)
        .typed_post(logout)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/register", rejection(ServerError))]
struct RegisterPath();

async fn register(
    RegisterPath(): RegisterPath,
    State(db): State<Arc<DbClient>>,
    Json(user): Json<CreateUser>,
) -> Result<Created<CreatedUser>> {
    let password_hash = user.password.hash()?;
    let created = db.create_user(&user, &password_hash).await?;

    info!(user_id = %created.id, "Registered new user");
    Ok(Created(created))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/token", rejection(ServerError))]
struct TokenPath();

async fn obtain_token(
    TokenPath(): TokenPath,
    State(db): State<Arc<DbClient>>,
    State(settings): State<TokenSettings>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<TokenPair>> {
    let email = Email::new(credentials.email).map_err(|_| ServerError::InvalidCredentials)?;
    let (user_id, password_hash) = db
        .fetch_credentials(&email)
        .await?
        .ok_or(ServerError::InvalidCredentials)?;

    if !password_hash.verify(&credentials.password) {
        return Err(ServerError::InvalidCredentials);
    }

    let access = issue_token(&db, settings, user_id, TokenKind::Access).await?;
    let refresh = issue_token(&db, settings, user_id, TokenKind::Refresh).await?;

    Ok(Json(TokenPair {
        access: access.as_token_str(),
        refresh: refresh.as_token_str(),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/token/refresh", rejection(ServerError))]
struct RefreshPath();

async fn refresh_token(
    RefreshPath(): RefreshPath,
    State(db): State<Arc<DbClient>>,
    State(settings): State<TokenSettings>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<AccessToken>> {
    let authentication = verify_token(&db, &request.refresh, TokenKind::Refresh).await?;
    let access = issue_token(&db, settings, authentication.user, TokenKind::Access).await?;

    Ok(Json(AccessToken {
        access: access.as_token_str(),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/logout", rejection(ServerError))]
struct LogoutPath();

async fn logout(
    LogoutPath(): LogoutPath,
    State(db): State<Arc<DbClient>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<LoggedOut>> {
    let authentication = verify_token(&db, &request.refresh, TokenKind::Refresh).await?;
    db.delete_auth(&authentication.token_hash).await?;

    info!(user_id = %authentication.user, "Logged out");
    Ok(Json(LoggedOut {}))
}
