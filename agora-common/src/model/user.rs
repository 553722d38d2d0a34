use crate::{
    model::{Id, auth::Password},
    util::bounded_text,
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;

pub const EMAIL_MAX_LEN: usize = 254;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

bounded_text!(
    /// First or last name of a user.
    PersonName: field = "name", max_len = 150
);

bounded_text!(
    /// Country or city of a user.
    LocationName: field = "location", max_len = 50
);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Enter a valid email address: {0}")]
pub struct InvalidEmailError(String);

impl Email {
    /// Validates the address and lowercases its domain part.
    pub fn new(email: String) -> Result<Self, InvalidEmailError> {
        let trimmed = email.trim();
        let Some((local, domain)) = trimmed.rsplit_once('@') else {
            return Err(InvalidEmailError(email));
        };

        let valid = !local.is_empty()
            && !domain.is_empty()
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && trimmed.chars().count() <= EMAIL_MAX_LEN
            && !trimmed.chars().any(char::is_whitespace);
        if !valid {
            return Err(InvalidEmailError(email));
        }

        Ok(Self(format!("{local}@{}", domain.to_lowercase())))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Email::new(inner).map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"Email"))
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Profile {
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub bio: Option<String>,
    pub country: Option<LocationName>,
    pub city: Option<LocationName>,
    pub picture: Option<String>,
}

impl Profile {
    /// Title used when naming an uploaded picture.
    #[must_use]
    pub fn upload_title(&self) -> String {
        let full_name = format!("{} {}", self.first_name.get(), self.last_name.get());
        let full_name = full_name.trim();
        if full_name.is_empty() {
            "user".to_owned()
        } else {
            full_name.to_owned()
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct User {
    pub id: Id<UserMarker>,
    pub email: Email,
    pub profile: Profile,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct CreateUser {
    pub email: Email,
    pub password: Password,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct CreatedUser {
    pub id: Id<UserMarker>,
    pub email: Email,
}

/// Body of `PUT /users/me`: every profile field is replaced.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct UpdateUser {
    pub email: Email,
    pub password: Option<Password>,
    #[serde(default)]
    pub first_name: PersonName,
    #[serde(default)]
    pub last_name: PersonName,
    pub bio: Option<String>,
    pub country: Option<LocationName>,
    pub city: Option<LocationName>,
}

/// Body of `PATCH /users/me`: absent fields keep their value.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct PatchUser {
    pub email: Option<Email>,
    pub password: Option<Password>,
    pub first_name: Option<PersonName>,
    pub last_name: Option<PersonName>,
    pub bio: Option<String>,
    pub country: Option<LocationName>,
    pub city: Option<LocationName>,
}

/// Case-insensitive substring filters for the user list.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct UserQuery {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
}

impl UserQuery {
    #[must_use]
    pub fn first_name(&self) -> Option<&str> {
        non_empty(self.first_name.as_deref())
    }

    #[must_use]
    pub fn last_name(&self) -> Option<&str> {
        non_empty(self.last_name.as_deref())
    }

    #[must_use]
    pub fn country(&self) -> Option<&str> {
        non_empty(self.country.as_deref())
    }

    #[must_use]
    pub fn city(&self) -> Option<&str> {
        non_empty(self.city.as_deref())
    }
}

fn non_empty(term: Option<&str>) -> Option<&str> {
    term.filter(|term| !term.is_empty())
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct UserSummary {
    pub id: Id<UserMarker>,
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub country: Option<LocationName>,
    pub city: Option<LocationName>,
    pub picture: Option<String>,
    pub count_followers: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct UserDetail {
    pub id: Id<UserMarker>,
    pub email: Email,
    #[serde(flatten)]
    pub profile: Profile,
    pub followings: Vec<Id<UserMarker>>,
    pub followers: Vec<Id<UserMarker>>,
}

impl UserDetail {
    #[must_use]
    pub fn new(
        user: User,
        followings: Vec<Id<UserMarker>>,
        followers: Vec<Id<UserMarker>>,
    ) -> Self {
        Self {
            id: user.id,
            email: user.email,
            profile: user.profile,
            followings,
            followers,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::user::{Email, Profile, UpdateUser, UserQuery};

    #[test]
    fn email_domain_is_lowercased() {
        let email = Email::new("Jane.Doe@Example.COM".to_owned()).unwrap();
        assert_eq!(email.get(), "Jane.Doe@example.com");
    }

    #[test]
    fn invalid_emails() {
        for email in ["", "no-at-sign", "@example.com", "jane@", "ja ne@example.com", "a@.com"] {
            assert!(Email::new(email.to_owned()).is_err(), "{email}");
        }
    }

    #[test]
    fn update_user_defaults_missing_names() {
        let update: UpdateUser =
            serde_json::from_str(r#"{"email": "a@b.io", "city": "Lviv"}"#).unwrap();

        assert_eq!(update.first_name.get(), "");
        assert_eq!(update.city.unwrap().get(), "Lviv");
        assert!(update.password.is_none());
    }

    #[test]
    fn too_long_country_is_rejected() {
        let body = format!(r#"{{"email": "a@b.io", "country": "{}"}}"#, "x".repeat(51));
        assert!(serde_json::from_str::<UpdateUser>(&body).is_err());
    }

    #[test]
    fn empty_filters_are_ignored() {
        let query = UserQuery {
            first_name: Some(String::new()),
            city: Some("kyiv".to_owned()),
            ..UserQuery::default()
        };

        assert_eq!(query.first_name(), None);
        assert_eq!(query.city(), Some("kyiv"));
    }

    #[test]
    fn upload_title_falls_back_to_user() {
        assert_eq!(Profile::default().upload_title(), "user");
    }
}
