//! Authorization of actions against resources.
//!
//! Reading is governed by [`crate::visibility`]; this module only decides whether an
//! authenticated caller may perform an action once the resource has been found.

use crate::model::{Id, user::UserMarker};
use std::fmt::{Display, Formatter};
use thiserror::Error;
use tracing::debug;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

/// A resource as far as authorization is concerned.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Resource {
    Post { author: Id<UserMarker> },
    Comment { author: Id<UserMarker> },
    /// The caller's like on a post.
    Like,
    /// The caller's follow edge towards another user.
    Follow,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum ResourceKind {
    Post,
    Comment,
    Like,
    Follow,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Error)]
#[error("You do not have permission to {action} this {resource}.")]
pub struct AccessDenied {
    pub action: Action,
    pub resource: ResourceKind,
}

impl Resource {
    #[must_use]
    pub fn kind(self) -> ResourceKind {
        match self {
            Resource::Post { .. } => ResourceKind::Post,
            Resource::Comment { .. } => ResourceKind::Comment,
            Resource::Like => ResourceKind::Like,
            Resource::Follow => ResourceKind::Follow,
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        })
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ResourceKind::Post => "post",
            ResourceKind::Comment => "comment",
            ResourceKind::Like => "like",
            ResourceKind::Follow => "follow",
        })
    }
}

/// Decides whether `caller` may perform `action` on `resource`.
///
/// Posts and comments may only be changed or removed by their author. Likes and
/// follow edges always belong to the caller, so every action on them is allowed.
pub fn authorize(
    caller: Id<UserMarker>,
    action: Action,
    resource: Resource,
) -> Result<(), AccessDenied> {
    let allowed = match (action, resource) {
        (Action::Update | Action::Delete, Resource::Post { author })
        | (Action::Update | Action::Delete, Resource::Comment { author }) => author == caller,
        (Action::Read | Action::Create, Resource::Post { .. } | Resource::Comment { .. })
        | (_, Resource::Like | Resource::Follow) => true,
    };

    if allowed {
        Ok(())
    } else {
        debug!(%caller, %action, resource = %resource.kind(), "Denied access");
        Err(AccessDenied {
            action,
            resource: resource.kind(),
        })
    }
}
