use crate::client::model_id;
use agora_common::{
    model::{
        ModelValidationError,
        auth::Authentication,
        comment::{Comment, CommentContent},
        count_from_db,
        like::Like,
        post::{Hashtag, Post, PostSummary},
        user::{Email, LocationName, PersonName, Profile, User, UserSummary},
    },
    util::PositiveDuration,
};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub picture: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CredentialsRecord {
    pub user_snowflake: i64,
    pub password_hash: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UserSummaryRecord {
    pub user_snowflake: i64,
    pub first_name: String,
    pub last_name: String,
    pub country: Option<String>,
    pub city: Option<String>,
    pub picture: Option<String>,
    pub count_followers: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub author_snowflake: i64,
    pub content: Option<String>,
    pub image: Option<String>,
    pub hashtag: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct PostSummaryRecord {
    #[sqlx(flatten)]
    pub post: PostRecord,
    pub count_likes: i64,
    pub count_comments: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct LikeRecord {
    pub like_snowflake: i64,
    pub post_snowflake: i64,
    pub user_snowflake: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub user_snowflake: i64,
    pub content: String,
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub kind: String,
    pub created_at: OffsetDateTime,
    pub expires_after_seconds: Option<i64>,
}

fn location(value: Option<String>) -> Result<Option<LocationName>, ModelValidationError> {
    value
        .map(LocationName::new)
        .transpose()
        .map_err(ModelValidationError::from)
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model_id(value.user_snowflake),
            email: Email::new(value.email)?,
            profile: Profile {
                first_name: PersonName::new(value.first_name)?,
                last_name: PersonName::new(value.last_name)?,
                bio: value.bio,
                country: location(value.country)?,
                city: location(value.city)?,
                picture: value.picture,
            },
        })
    }
}

impl TryFrom<UserSummaryRecord> for UserSummary {
    type Error = ModelValidationError;

    fn try_from(value: UserSummaryRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model_id(value.user_snowflake),
            first_name: PersonName::new(value.first_name)?,
            last_name: PersonName::new(value.last_name)?,
            country: location(value.country)?,
            city: location(value.city)?,
            picture: value.picture,
            count_followers: count_from_db(value.count_followers)?,
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model_id(value.post_snowflake),
            created_at: value.created_at,
            author: model_id(value.author_snowflake),
            content: value.content,
            image: value.image,
            hashtag: value.hashtag.map(Hashtag::new).transpose()?,
        })
    }
}

impl TryFrom<PostSummaryRecord> for PostSummary {
    type Error = ModelValidationError;

    fn try_from(value: PostSummaryRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            post: value.post.try_into()?,
            count_likes: count_from_db(value.count_likes)?,
            count_comments: count_from_db(value.count_comments)?,
        })
    }
}

impl From<LikeRecord> for Like {
    fn from(value: LikeRecord) -> Self {
        Self {
            id: model_id(value.like_snowflake),
            post: model_id(value.post_snowflake),
            user: model_id(value.user_snowflake),
        }
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model_id(value.comment_snowflake),
            post: model_id(value.post_snowflake),
            user: model_id(value.user_snowflake),
            content: CommentContent::new(&value.content)?,
            created_at: value.created_at,
        })
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: model_id(value.user_snowflake),
            token_hash: value.token_hash.into_boxed_slice().try_into()?,
            kind: value.kind.parse()?,
            created_at: value.created_at,
            expires_after: value
                .expires_after_seconds
                .map(PositiveDuration::from_seconds)
                .transpose()?,
        })
    }
}
