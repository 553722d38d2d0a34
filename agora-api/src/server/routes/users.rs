use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    extract::{Json, Query},
    media::MediaStore,
};
use agora_common::{
    access::{Action, Resource, authorize},
    model::{
        Id,
        auth::{HashedPassword, Password},
        follow::FollowEdge,
        user::{PatchUser, UpdateUser, UserDetail, UserMarker, UserQuery, UserSummary},
    },
    upload::UploadDir,
};
use agora_db::client::DbClient;
use axum::{
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_me)
        .typed_put(update_me)
        .typed_patch(patch_me)
        .typed_delete(delete_me)
        .typed_post(upload_picture)
        .typed_get(list_users)
        .typed_get(get_user)
        .typed_post(follow)
        .typed_post(unfollow)
}

async fn fetch_detail(db: &DbClient, id: Id<UserMarker>) -> Result<UserDetail> {
    db.fetch_user_detail(id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(id))
}

fn hash_new_password(password: Option<&Password>) -> Result<Option<HashedPassword>> {
    Ok(password.map(Password::hash).transpose()?)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/me", rejection(ServerError))]
struct MePath();

async fn get_me(
    MePath(): MePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<UserDetail>> {
    let detail = fetch_detail(&db, user.user_id()).await?;

    Ok(Json(detail))
}

async fn update_me(
    MePath(): MePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(update): Json<UpdateUser>,
) -> Result<Json<UserDetail>> {
    let password_hash = hash_new_password(update.password.as_ref())?;
    db.update_user(user.user_id(), &update, password_hash.as_ref())
        .await?
        .ok_or(ServerError::UserByIdNotFound(user.user_id()))?;

    let detail = fetch_detail(&db, user.user_id()).await?;
    Ok(Json(detail))
}

async fn patch_me(
    MePath(): MePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(patch): Json<PatchUser>,
) -> Result<Json<UserDetail>> {
    let password_hash = hash_new_password(patch.password.as_ref())?;
    db.patch_user(user.user_id(), &patch, password_hash.as_ref())
        .await?
        .ok_or(ServerError::UserByIdNotFound(user.user_id()))?;

    let detail = fetch_detail(&db, user.user_id()).await?;
    Ok(Json(detail))
}

async fn delete_me(
    MePath(): MePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    if !db.delete_user(user.user_id()).await? {
        return Err(ServerError::UserByIdNotFound(user.user_id()));
    }

    info!(user_id = %user.user_id(), "Deleted account");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/me/picture", rejection(ServerError))]
struct PicturePath();

async fn upload_picture(
    PicturePath(): PicturePath,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
    user: AuthenticatedUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UserDetail>> {
    let current = db
        .fetch_user(user.user_id())
        .await?
        .ok_or(ServerError::UserByIdNotFound(user.user_id()))?;

    let picture = media
        .store_upload(
            multipart?,
            "picture",
            UploadDir::UserPictures,
            &current.profile.upload_title(),
        )
        .await?;
    db.set_user_picture(user.user_id(), &picture).await?;

    let detail = fetch_detail(&db, user.user_id()).await?;
    Ok(Json(detail))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users", rejection(ServerError))]
struct UsersPath();

async fn list_users(
    UsersPath(): UsersPath,
    State(db): State<Arc<DbClient>>,
    _: AuthenticatedUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<UserSummary>>> {
    let users = db.list_users(&query).await?;

    Ok(Json(users))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}", rejection(ServerError))]
struct UserPath {
    id: Id<UserMarker>,
}

async fn get_user(
    UserPath { id }: UserPath,
    State(db): State<Arc<DbClient>>,
    _: AuthenticatedUser,
) -> Result<Json<UserDetail>> {
    let detail = fetch_detail(&db, id).await?;

    Ok(Json(detail))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/follow", rejection(ServerError))]
struct FollowPath {
    id: Id<UserMarker>,
}

async fn follow(
    FollowPath { id }: FollowPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<UserDetail>> {
    let edge = FollowEdge::new(id, user.user_id())?;
    authorize(user.user_id(), Action::Create, Resource::Follow)?;

    if db.fetch_user(id).await?.is_none() {
        return Err(ServerError::UserByIdNotFound(id));
    }
    if !db.create_follow(edge).await? {
        return Err(ServerError::AlreadyFollowing(id));
    }

    let detail = fetch_detail(&db, user.user_id()).await?;
    Ok(Json(detail))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/unfollow", rejection(ServerError))]
struct UnfollowPath {
    id: Id<UserMarker>,
}

async fn unfollow(
    UnfollowPath { id }: UnfollowPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    authorize(user.user_id(), Action::Delete, Resource::Follow)?;

    // Nobody follows themselves, so there is nothing to remove.
    if let Ok(edge) = FollowEdge::new(id, user.user_id()) {
        db.delete_follow(edge).await?;
    }

    Ok(StatusCode::OK)
}
