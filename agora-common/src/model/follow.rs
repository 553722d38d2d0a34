use crate::model::{Id, user::UserMarker};
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("User can't follow self")]
pub struct SelfFollowError;

/// A directed "follower reads followed's content" relationship.
///
/// Can only be constructed between two different users.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct FollowEdge {
    followed: Id<UserMarker>,
    follower: Id<UserMarker>,
}

impl FollowEdge {
    pub fn new(followed: Id<UserMarker>, follower: Id<UserMarker>) -> Result<Self, SelfFollowError> {
        if followed == follower {
            return Err(SelfFollowError);
        }

        Ok(Self { followed, follower })
    }

    #[must_use]
    pub fn followed(self) -> Id<UserMarker> {
        self.followed
    }

    #[must_use]
    pub fn follower(self) -> Id<UserMarker> {
        self.follower
    }
}
