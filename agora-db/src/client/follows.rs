use crate::client::{DbClient, Result, db_id, model_id};
use agora_common::{
    model::{Id, follow::FollowEdge, user::UserMarker},
    visibility::Viewer,
};
use sqlx::{query, query_scalar};
use tracing::debug;

impl DbClient {
    /// Returns `false` if the edge already existed.
    pub async fn create_follow(&self, edge: FollowEdge) -> Result<bool> {
        let inserted = query(
            "
            INSERT INTO follows (followed_snowflake, follower_snowflake)
            VALUES (?1, ?2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(db_id(edge.followed()))
        .bind(db_id(edge.follower()))
        .execute(&self.pool)
        .await?
        .rows_affected();

        debug!(followed = %edge.followed(), follower = %edge.follower(), inserted, "Follow");
        Ok(inserted > 0)
    }

    /// Returns `false` if there was no such edge.
    pub async fn delete_follow(&self, edge: FollowEdge) -> Result<bool> {
        let deleted = query(
            "DELETE FROM follows WHERE followed_snowflake = ?1 AND follower_snowflake = ?2",
        )
        .bind(db_id(edge.followed()))
        .bind(db_id(edge.follower()))
        .execute(&self.pool)
        .await?
        .rows_affected();

        debug!(followed = %edge.followed(), follower = %edge.follower(), deleted, "Unfollow");
        Ok(deleted > 0)
    }

    /// Users that `user_id` follows.
    pub async fn fetch_followings(&self, user_id: Id<UserMarker>) -> Result<Vec<Id<UserMarker>>> {
        let followings = query_scalar::<_, i64>(
            "
            SELECT followed_snowflake FROM follows
            WHERE follower_snowflake = ?1
            ORDER BY followed_snowflake
            ",
        )
        .bind(db_id(user_id))
        .fetch_all(&self.pool)
        .await?;

        Ok(followings.into_iter().map(model_id).collect())
    }

    /// Users following `user_id`.
    pub async fn fetch_followers(&self, user_id: Id<UserMarker>) -> Result<Vec<Id<UserMarker>>> {
        let followers = query_scalar::<_, i64>(
            "
            SELECT follower_snowflake FROM follows
            WHERE followed_snowflake = ?1
            ORDER BY follower_snowflake
            ",
        )
        .bind(db_id(user_id))
        .fetch_all(&self.pool)
        .await?;

        Ok(followers.into_iter().map(model_id).collect())
    }

    pub async fn fetch_viewer(&self, user_id: Id<UserMarker>) -> Result<Viewer> {
        let followings = self.fetch_followings(user_id).await?;
        Ok(Viewer::new(user_id, followings))
    }
}
