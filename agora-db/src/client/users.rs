use crate::{
    client::{DbClient, DbError, Result, db_id, model_id},
    record::{CredentialsRecord, UserRecord, UserSummaryRecord},
};
use agora_common::model::{
    Id,
    auth::HashedPassword,
    user::{
        CreateUser, CreatedUser, Email, PatchUser, UpdateUser, User, UserDetail, UserMarker,
        UserQuery, UserSummary,
    },
};
use sqlx::{query, query_as};
use tracing::debug;

const USER_COLUMNS: &str = "
    users.user_snowflake,
    users.email,
    users.first_name,
    users.last_name,
    users.bio,
    users.country,
    users.city,
    users.picture
";

fn map_unique_email(email: &Email) -> impl FnOnce(sqlx::Error) -> DbError + '_ {
    move |err| match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            DbError::EmailTaken(email.clone())
        }
        other => other.into(),
    }
}

impl DbClient {
    pub async fn create_user(
        &self,
        user: &CreateUser,
        password_hash: &HashedPassword,
    ) -> Result<CreatedUser> {
        let user_id = self.next_id::<UserMarker>();

        let inserted = query(
            "
            INSERT INTO users (user_snowflake, email, password_hash)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (email) DO NOTHING
            ",
        )
        .bind(db_id(user_id))
        .bind(user.email.get())
        .bind(password_hash.get())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(DbError::EmailTaken(user.email.clone()));
        }

        debug!(%user_id, "Registered user");
        Ok(CreatedUser {
            id: user_id,
            email: user.email.clone(),
        })
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE users.user_snowflake = ?1"
        ))
        .bind(db_id(user_id))
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    /// The user's profile together with both directions of their follow edges.
    pub async fn fetch_user_detail(&self, user_id: Id<UserMarker>) -> Result<Option<UserDetail>> {
        let Some(user) = self.fetch_user(user_id).await? else {
            return Ok(None);
        };

        let followings = self.fetch_followings(user_id).await?;
        let followers = self.fetch_followers(user_id).await?;

        Ok(Some(UserDetail::new(user, followings, followers)))
    }

    pub async fn fetch_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(Id<UserMarker>, HashedPassword)>> {
        let record = query_as::<_, CredentialsRecord>(
            "SELECT user_snowflake, password_hash FROM users WHERE email = ?1",
        )
        .bind(email.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(|record| {
            (
                model_id(record.user_snowflake),
                HashedPassword::from_stored(record.password_hash),
            )
        }))
    }

    pub async fn list_users(&self, filter: &UserQuery) -> Result<Vec<UserSummary>> {
        let records = query_as::<_, UserSummaryRecord>(
            "
            SELECT
                users.user_snowflake,
                users.first_name,
                users.last_name,
                users.country,
                users.city,
                users.picture,
                (
                    SELECT COUNT(*) FROM follows
                    WHERE follows.followed_snowflake = users.user_snowflake
                ) AS count_followers
            FROM
                users
            WHERE
                (?1 IS NULL OR instr(lower(users.first_name), lower(?1)) > 0)
                AND (?2 IS NULL OR instr(lower(users.last_name), lower(?2)) > 0)
                AND (?3 IS NULL OR instr(lower(users.country), lower(?3)) > 0)
                AND (?4 IS NULL OR instr(lower(users.city), lower(?4)) > 0)
            ORDER BY
                users.user_snowflake
            ",
        )
        .bind(filter.first_name())
        .bind(filter.last_name())
        .bind(filter.country())
        .bind(filter.city())
        .fetch_all(&self.pool)
        .await?;

        let users = records
            .into_iter()
            .map(UserSummary::try_from)
            .collect::<Result<_, _>>()?;
        Ok(users)
    }

    pub async fn update_user(
        &self,
        user_id: Id<UserMarker>,
        update: &UpdateUser,
        password_hash: Option<&HashedPassword>,
    ) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(&format!(
            "
            UPDATE users SET
                email = ?2,
                password_hash = COALESCE(?3, password_hash),
                first_name = ?4,
                last_name = ?5,
                bio = ?6,
                country = ?7,
                city = ?8
            WHERE
                users.user_snowflake = ?1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(db_id(user_id))
        .bind(update.email.get())
        .bind(password_hash.map(HashedPassword::get))
        .bind(update.first_name.get())
        .bind(update.last_name.get())
        .bind(update.bio.as_deref())
        .bind(update.country.as_ref().map(|country| country.get()))
        .bind(update.city.as_ref().map(|city| city.get()))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_email(&update.email))?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn patch_user(
        &self,
        user_id: Id<UserMarker>,
        patch: &PatchUser,
        password_hash: Option<&HashedPassword>,
    ) -> Result<Option<User>> {
        let sql = format!(
            "
            UPDATE users SET
                email = COALESCE(?2, email),
                password_hash = COALESCE(?3, password_hash),
                first_name = COALESCE(?4, first_name),
                last_name = COALESCE(?5, last_name),
                bio = COALESCE(?6, bio),
                country = COALESCE(?7, country),
                city = COALESCE(?8, city)
            WHERE
                users.user_snowflake = ?1
            RETURNING {USER_COLUMNS}
            "
        );
        let result = query_as::<_, UserRecord>(&sql)
            .bind(db_id(user_id))
            .bind(patch.email.as_ref().map(Email::get))
            .bind(password_hash.map(HashedPassword::get))
            .bind(patch.first_name.as_ref().map(|name| name.get()))
            .bind(patch.last_name.as_ref().map(|name| name.get()))
            .bind(patch.bio.as_deref())
            .bind(patch.country.as_ref().map(|country| country.get()))
            .bind(patch.city.as_ref().map(|city| city.get()))
            .fetch_optional(&self.pool)
            .await;

        let record = match (result, &patch.email) {
            (Err(err), Some(email)) => Err(map_unique_email(email)(err)),
            (result, _) => result.map_err(DbError::from),
        }?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn set_user_picture(
        &self,
        user_id: Id<UserMarker>,
        picture: &str,
    ) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(&format!(
            "
            UPDATE users SET picture = ?2
            WHERE users.user_snowflake = ?1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(db_id(user_id))
        .bind(picture)
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    /// Deletes the user and, through the foreign keys, everything they own.
    pub async fn delete_user(&self, user_id: Id<UserMarker>) -> Result<bool> {
        let deleted = query("DELETE FROM users WHERE user_snowflake = ?1")
            .bind(db_id(user_id))
            .execute(&self.pool)
            .await?
            .rows_affected();

        debug!(%user_id, deleted, "Deleted user");
        Ok(deleted > 0)
    }
}
