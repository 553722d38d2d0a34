pub mod auth;
pub mod comment;
pub mod follow;
pub mod like;
pub mod post;
pub mod user;

use crate::{
    model::{
        auth::{InvalidAuthTokenHashError, InvalidTokenKindError},
        comment::BlankCommentError,
        user::InvalidEmailError,
    },
    snowflake::Snowflake,
    util::{NonPositiveDurationError, TextTooLongError},
};
use derive_where::derive_where;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;

/// A stored value that no longer satisfies the model's invariants.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    TextTooLong(#[from] TextTooLongError),
    #[error(transparent)]
    Email(#[from] InvalidEmailError),
    #[error(transparent)]
    BlankComment(#[from] BlankCommentError),
    #[error(transparent)]
    NonPositiveDuration(#[from] NonPositiveDurationError),
    #[error(transparent)]
    TokenHash(#[from] InvalidAuthTokenHashError),
    #[error(transparent)]
    TokenKind(#[from] InvalidTokenKindError),
    #[error("Stored count was negative: {0}")]
    NegativeCount(i64),
}

/// Snowflake id tagged with the kind of entity it identifies.
#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<Marker>(Snowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: Snowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> Snowflake {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<Snowflake> for Id<Marker> {
    fn from(value: Snowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(Snowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}

/// Converts a stored `COUNT(*)` into an unsigned count.
pub fn count_from_db(count: i64) -> Result<u64, ModelValidationError> {
    u64::try_from(count).map_err(|_| ModelValidationError::NegativeCount(count))
}
