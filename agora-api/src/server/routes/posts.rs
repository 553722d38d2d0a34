use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    extract::{Created, Json, Query},
    media::MediaStore,
};
use agora_common::{
    access::{Action, Resource, authorize},
    model::{
        Id,
        post::{PatchPost, Post, PostContent, PostDetail, PostMarker, PostSummary},
    },
    upload::UploadDir,
    visibility::PostFilter,
};
use agora_db::client::DbClient;
use axum::{
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use time::OffsetDateTime;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_put(update_post)
        .typed_patch(patch_post)
        .typed_delete(delete_post)
        .typed_post(upload_image)
        .typed_post(like_post)
        .typed_post(unlike_post)
}

async fn fetch_post(db: &DbClient, id: Id<PostMarker>) -> Result<Post> {
    db.fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))
}

async fn fetch_summary(db: &DbClient, id: Id<PostMarker>) -> Result<PostSummary> {
    db.fetch_post_summary(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))
}

/// Fetches a post the caller may read. Posts hidden from the caller are reported as missing.
pub(super) async fn fetch_visible_post(
    db: &DbClient,
    user: AuthenticatedUser,
    id: Id<PostMarker>,
    filter: &PostFilter,
) -> Result<Post> {
    let post = fetch_post(db, id).await?;
    let viewer = db.fetch_viewer(user.user_id()).await?;

    if viewer.can_view_post(&post, filter) {
        Ok(post)
    } else {
        Err(ServerError::PostByIdNotFound(id))
    }
}

/// Fetches a post the caller is allowed to perform `action` on.
async fn fetch_owned_post(
    db: &DbClient,
    user: AuthenticatedUser,
    id: Id<PostMarker>,
    action: Action,
) -> Result<Post> {
    let post = fetch_post(db, id).await?;
    authorize(
        user.user_id(),
        action,
        Resource::Post {
            author: post.author,
        },
    )?;

    Ok(post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

async fn list_posts(
    PostsPath(): PostsPath,
    State(db): State<Arc<DbClient>>,
    _: AuthenticatedUser,
) -> Result<Json<Vec<PostSummary>>> {
    let posts = db.list_posts().await?;

    Ok(Json(posts))
}

async fn create_post(
    PostsPath(): PostsPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(content): Json<PostContent>,
) -> Result<Created<Post>> {
    let author = user.user_id();
    authorize(author, Action::Create, Resource::Post { author })?;

    let post = db
        .create_post(author, &content, OffsetDateTime::now_utc())
        .await?;

    Ok(Created(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Query(filter): Query<PostFilter>,
) -> Result<Json<PostDetail>> {
    fetch_visible_post(&db, user, id, &filter).await?;
    let detail = db
        .fetch_post_detail(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(detail))
}

async fn update_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(content): Json<PostContent>,
) -> Result<Json<Post>> {
    fetch_owned_post(&db, user, id, Action::Update).await?;
    let post = db
        .update_post(id, &content)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

async fn patch_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(patch): Json<PatchPost>,
) -> Result<Json<Post>> {
    fetch_owned_post(&db, user, id, Action::Update).await?;
    let post = db
        .patch_post(id, &patch)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    fetch_owned_post(&db, user, id, Action::Delete).await?;
    db.delete_post(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/image", rejection(ServerError))]
struct PostImagePath {
    id: Id<PostMarker>,
}

async fn upload_image(
    PostImagePath { id }: PostImagePath,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
    user: AuthenticatedUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Post>> {
    let post = fetch_owned_post(&db, user, id, Action::Update).await?;

    let image = media
        .store_upload(
            multipart?,
            "image",
            UploadDir::PostImages,
            post.upload_title(),
        )
        .await?;
    let post = db
        .set_post_image(id, &image)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/like", rejection(ServerError))]
struct LikePath {
    id: Id<PostMarker>,
}

async fn like_post(
    LikePath { id }: LikePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<PostSummary>> {
    fetch_post(&db, id).await?;
    authorize(user.user_id(), Action::Create, Resource::Like)?;

    if !db.create_like(id, user.user_id()).await? {
        return Err(ServerError::AlreadyLiked(id));
    }

    let summary = fetch_summary(&db, id).await?;
    Ok(Json(summary))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/unlike", rejection(ServerError))]
struct UnlikePath {
    id: Id<PostMarker>,
}

async fn unlike_post(
    UnlikePath { id }: UnlikePath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<PostSummary>> {
    fetch_post(&db, id).await?;
    authorize(user.user_id(), Action::Delete, Resource::Like)?;

    db.delete_like(id, user.user_id()).await?;

    let summary = fetch_summary(&db, id).await?;
    Ok(Json(summary))
}
