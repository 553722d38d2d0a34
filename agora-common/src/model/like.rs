use crate::model::{Id, post::PostMarker, user::UserMarker};
use serde::Serialize;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct LikeMarker;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Like {
    pub id: Id<LikeMarker>,
    pub post: Id<PostMarker>,
    pub user: Id<UserMarker>,
}
