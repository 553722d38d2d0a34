//! Which posts, and through them which comments, a user may read.
//!
//! A user sees their own content and the content of everyone they follow.

use crate::model::{
    Id,
    post::{Hashtag, Post},
    user::UserMarker,
};
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Viewer {
    id: Id<UserMarker>,
    followings: HashSet<Id<UserMarker>>,
}

impl Viewer {
    #[must_use]
    pub fn new(id: Id<UserMarker>, followings: impl IntoIterator<Item = Id<UserMarker>>) -> Self {
        Self {
            id,
            followings: followings.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Id<UserMarker> {
        self.id
    }

    #[must_use]
    pub fn can_view(&self, author: Id<UserMarker>) -> bool {
        author == self.id || self.followings.contains(&author)
    }

    #[must_use]
    pub fn can_view_post(&self, post: &Post, filter: &PostFilter) -> bool {
        self.can_view(post.author) && filter.matches(post)
    }
}

/// Optional narrowing of the post detail view, taken from the query string.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct PostFilter {
    pub hashtag: Option<String>,
}

impl PostFilter {
    /// Case-insensitive substring match on the hashtag. Without a filter every post
    /// matches; with one, posts lacking a hashtag never do.
    #[must_use]
    pub fn matches(&self, post: &Post) -> bool {
        match self.hashtag.as_deref().filter(|needle| !needle.is_empty()) {
            None => true,
            Some(needle) => post.hashtag.as_ref().map(Hashtag::get).is_some_and(|hashtag| {
                hashtag.to_lowercase().contains(&needle.to_lowercase())
            }),
        }
    }
}
