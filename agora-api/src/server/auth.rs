use crate::server::{Result, ServerError};
use agora_common::{
    model::{
        Id,
        auth::{AuthToken, Authentication, TokenKind},
        user::UserMarker,
    },
    util::PositiveDuration,
};
use agora_db::client::DbClient;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use std::{hash::Hash, sync::Arc};
use time::OffsetDateTime;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// Lifetimes of newly issued tokens.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct TokenSettings {
    pub access_lifetime: PositiveDuration,
    pub refresh_lifetime: PositiveDuration,
}

impl TokenSettings {
    #[must_use]
    pub fn lifetime(self, kind: TokenKind) -> PositiveDuration {
        match kind {
            TokenKind::Access => self.access_lifetime,
            TokenKind::Refresh => self.refresh_lifetime,
        }
    }
}

/// The caller of a request, proven by a live access token.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(self) -> Id<UserMarker> {
        self.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?;

        let db = Arc::<DbClient>::from_ref(state);
        let authentication = verify_token(&db, header.token(), TokenKind::Access).await?;

        Ok(Self {
            id: authentication.user,
        })
    }
}

/// Looks up the stored authentication of `token` and checks that it is a live token of `kind`.
pub async fn verify_token(db: &DbClient, token: &str, kind: TokenKind) -> Result<Authentication> {
    let request_token: AuthToken = token.parse()?;
    let token_hash = request_token.hash()?;

    let authentication = db
        .fetch_auth(&token_hash)
        .await?
        .ok_or(ServerError::InvalidToken)?;

    if authentication.user != request_token.user_id
        || !authentication.is_valid_for(kind, OffsetDateTime::now_utc())
    {
        return Err(ServerError::InvalidToken);
    }

    Ok(authentication)
}

/// Issues a token of `kind` for `user_id` and persists its hash.
///
/// Tokens that have already expired are purged on the way.
pub async fn issue_token(
    db: &DbClient,
    settings: TokenSettings,
    user_id: Id<UserMarker>,
    kind: TokenKind,
) -> Result<AuthToken> {
    let now = OffsetDateTime::now_utc();
    db.delete_expired_auths(now).await?;

    let (token, authentication) =
        AuthToken::issue(user_id, kind, Some(settings.lifetime(kind)), now)?;
    db.create_auth(&authentication).await?;

    Ok(token)
}
