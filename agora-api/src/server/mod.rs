use agora_common::{
    access::AccessDenied,
    model::{
        Id,
        auth::{AuthTokenDecodeError, AuthTokenHashError, PasswordHashError},
        comment::CommentMarker,
        follow::SelfFollowError,
        post::PostMarker,
        user::UserMarker,
    },
};
use agora_db::client::{DbClient, DbError};
use auth::TokenSettings;
use axum::{
    Router,
    extract::{
        FromRef, Request,
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use extract::Json;
use media::MediaStore;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, warn};

pub mod auth;
mod extract;
pub mod media;
mod routes;
#[cfg(test)]
mod tests;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub token_settings: TokenSettings,
    pub media: Arc<MediaStore>,
}

/// The full application: API routes, uploaded media under `/media` and request tracing.
pub fn app(state: ServerState) -> Router {
    let media = ServeDir::new(state.media.root());

    routes()
        .nest_service("/media", media)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Multipart body rejected: {0}")]
    MultipartRejection(#[from] MultipartRejection),
    #[error("Reading multipart body failed: {0}")]
    Multipart(#[from] MultipartError),
    #[error("No file was submitted in the {0} field.")]
    MissingUpload(&'static str),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error("The password could not be hashed: {0}")]
    PasswordHash(#[from] PasswordHashError),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error("No active account found with the given credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Storing uploaded file failed: {0}")]
    Media(std::io::Error),
    #[error(transparent)]
    SelfFollow(#[from] SelfFollowError),
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),
    #[error("You already follow user {0}.")]
    AlreadyFollowing(Id<UserMarker>),
    #[error("You already like post {0}.")]
    AlreadyLiked(Id<PostMarker>),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("Comment with id {0} was not found.")]
    CommentByIdNotFound(Id<CommentMarker>),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::UserByIdNotFound(_)
            | ServerError::CommentByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_)
            | ServerError::InvalidToken
            | ServerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServerError::AccessDenied(_) => StatusCode::FORBIDDEN,
            ServerError::AlreadyFollowing(_) | ServerError::AlreadyLiked(_) => StatusCode::CONFLICT,
            ServerError::JsonRejection(_)
            | ServerError::QueryRejection(_)
            | ServerError::MultipartRejection(_)
            | ServerError::Multipart(_)
            | ServerError::MissingUpload(_)
            | ServerError::SelfFollow(_)
            | ServerError::Database(DbError::EmailTaken(_)) => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::AuthTokenHash(_)
            | ServerError::PasswordHash(_)
            | ServerError::Database(_)
            | ServerError::Media(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
struct ErrorResponse {
    status: u16,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            error!(error = %self, %status, "Replying with error");
            "Internal server error".to_owned()
        } else {
            warn!(error = %self, %status, "Rejecting request");
            self.to_string()
        };

        let error_response = ErrorResponse {
            status: status.as_u16(),
            message,
        };
        (status, Json(error_response)).into_response()
    }
}
