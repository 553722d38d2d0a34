use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    extract::{Created, Json},
    routes::posts::fetch_visible_post,
};
use agora_common::{
    access::{Action, Resource, authorize},
    model::{
        Id,
        comment::{Comment, CommentMarker, WriteComment},
        post::PostMarker,
    },
    visibility::PostFilter,
};
use agora_db::client::DbClient;
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;
use time::OffsetDateTime;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_comments)
        .typed_post(create_comment)
        .typed_get(get_comment)
        .typed_put(update_comment)
        .typed_delete(delete_comment)
}

async fn fetch_comment(
    db: &DbClient,
    post_id: Id<PostMarker>,
    id: Id<CommentMarker>,
) -> Result<Comment> {
    db.fetch_comment(post_id, id)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))
}

/// Comments are only readable through a post the caller can see.
async fn fetch_visible_comment(
    db: &DbClient,
    user: AuthenticatedUser,
    post_id: Id<PostMarker>,
    id: Id<CommentMarker>,
) -> Result<Comment> {
    fetch_visible_post(db, user, post_id, &PostFilter::default()).await?;

    fetch_comment(db, post_id, id).await
}

/// Fetches a comment the caller is allowed to perform `action` on.
async fn fetch_owned_comment(
    db: &DbClient,
    user: AuthenticatedUser,
    post_id: Id<PostMarker>,
    id: Id<CommentMarker>,
    action: Action,
) -> Result<Comment> {
    let comment = fetch_comment(db, post_id, id).await?;
    authorize(
        user.user_id(),
        action,
        Resource::Comment {
            author: comment.user,
        },
    )?;

    Ok(comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}/comments", rejection(ServerError))]
struct CommentsPath {
    post_id: Id<PostMarker>,
}

async fn list_comments(
    CommentsPath { post_id }: CommentsPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Comment>>> {
    fetch_visible_post(&db, user, post_id, &PostFilter::default()).await?;
    let comments = db.fetch_post_comments(post_id).await?;

    Ok(Json(comments))
}

async fn create_comment(
    CommentsPath { post_id }: CommentsPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(comment): Json<WriteComment>,
) -> Result<Created<Comment>> {
    fetch_visible_post(&db, user, post_id, &PostFilter::default()).await?;

    let author = user.user_id();
    authorize(author, Action::Create, Resource::Comment { author })?;

    let comment = db
        .create_comment(post_id, author, &comment.content, OffsetDateTime::now_utc())
        .await?;

    Ok(Created(comment))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{post_id}/comments/{id}", rejection(ServerError))]
struct CommentPath {
    post_id: Id<PostMarker>,
    id: Id<CommentMarker>,
}

async fn get_comment(
    CommentPath { post_id, id }: CommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<Comment>> {
    let comment = fetch_visible_comment(&db, user, post_id, id).await?;

    Ok(Json(comment))
}

async fn update_comment(
    CommentPath { post_id, id }: CommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(update): Json<WriteComment>,
) -> Result<Json<Comment>> {
    fetch_owned_comment(&db, user, post_id, id, Action::Update).await?;

    let comment = db
        .update_comment(id, &update.content)
        .await?
        .ok_or(ServerError::CommentByIdNotFound(id))?;

    Ok(Json(comment))
}

async fn delete_comment(
    CommentPath { post_id, id }: CommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<StatusCode> {
    fetch_owned_comment(&db, user, post_id, id, Action::Delete).await?;

    db.delete_comment(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
