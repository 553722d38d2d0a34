use crate::model::{Id, post::PostMarker, user::UserMarker};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

/// Comment text, trimmed and never blank.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct CommentContent(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("This field may not be blank.")]
pub struct BlankCommentError;

impl CommentContent {
    pub fn new(content: &str) -> Result<Self, BlankCommentError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            Err(BlankCommentError)
        } else {
            Ok(Self(trimmed.to_owned()))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for CommentContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        CommentContent::new(&inner).map_err(D::Error::custom)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub post: Id<PostMarker>,
    pub user: Id<UserMarker>,
    pub content: CommentContent,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Body of comment creation and replacement.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct WriteComment {
    pub content: CommentContent,
}
