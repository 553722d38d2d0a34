use crate::{
    model::{Id, comment::Comment, like::Like, user::UserMarker},
    util::bounded_text,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

bounded_text!(Hashtag: field = "hashtag", max_len = 50);

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub author: Id<UserMarker>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub hashtag: Option<Hashtag>,
}

impl Post {
    /// Title used when naming an uploaded image.
    #[must_use]
    pub fn upload_title(&self) -> &str {
        self.hashtag
            .as_ref()
            .map(Hashtag::get)
            .filter(|hashtag| !hashtag.trim().is_empty())
            .unwrap_or("post")
    }
}

/// Body of `POST /posts` and `PUT /posts/{id}`.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct PostContent {
    pub content: Option<String>,
    pub hashtag: Option<Hashtag>,
}

/// Body of `PATCH /posts/{id}`: absent fields keep their value.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct PatchPost {
    pub content: Option<String>,
    pub hashtag: Option<Hashtag>,
}

/// List view of a post.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PostSummary {
    #[serde(flatten)]
    pub post: Post,
    pub count_likes: u64,
    pub count_comments: u64,
}

/// Detail view of a post with its likes and comments.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub likes: Vec<Like>,
    pub comments: Vec<Comment>,
}

impl PostDetail {
    #[must_use]
    pub fn new(post: Post, likes: Vec<Like>, comments: Vec<Comment>) -> Self {
        Self {
            post,
            likes,
            comments,
        }
    }
}
