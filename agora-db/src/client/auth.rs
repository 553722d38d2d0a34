use crate::{
    client::{DbClient, Result, db_id},
    record::AuthenticationRecord,
};
use agora_common::model::auth::{Authentication, AuthTokenHash};
use sqlx::{query, query_as};
use time::OffsetDateTime;
use tracing::debug;

impl DbClient {
    pub async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        let expires_after_seconds = authentication
            .expires_after
            .map(|expires_after| expires_after.get().whole_seconds());
        let expires_at_unix = authentication
            .expires_at()
            .map(OffsetDateTime::unix_timestamp);

        query(
            "
            INSERT INTO authentications
                (token_hash, user_snowflake, kind, created_at, expires_after_seconds, expires_at_unix)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(&authentication.token_hash.0[..])
        .bind(db_id(authentication.user))
        .bind(authentication.kind.as_str())
        .bind(authentication.created_at)
        .bind(expires_after_seconds)
        .bind(expires_at_unix)
        .execute(&self.pool)
        .await?;

        debug!(user_id = %authentication.user, kind = %authentication.kind, "Issued token");
        Ok(())
    }

    pub async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT user_snowflake, token_hash, kind, created_at, expires_after_seconds
            FROM authentications
            WHERE token_hash = ?1
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    /// Revokes a token. Returns `false` if it was unknown.
    pub async fn delete_auth(&self, token_hash: &AuthTokenHash) -> Result<bool> {
        let deleted = query("DELETE FROM authentications WHERE token_hash = ?1")
            .bind(&token_hash.0[..])
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }

    /// Drops every token that expired before `now`. Returns how many were removed.
    pub async fn delete_expired_auths(&self, now: OffsetDateTime) -> Result<u64> {
        let deleted = query("DELETE FROM authentications WHERE expires_at_unix < ?1")
            .bind(now.unix_timestamp())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted > 0 {
            debug!(deleted, "Purged expired tokens");
        }
        Ok(deleted)
    }
}
