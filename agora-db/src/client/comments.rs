use crate::{
    client::{DbClient, Result, db_id},
    record::CommentRecord,
};
use agora_common::model::{
    Id,
    comment::{Comment, CommentContent, CommentMarker},
    post::PostMarker,
    user::UserMarker,
};
use sqlx::{query, query_as};
use time::OffsetDateTime;
use tracing::debug;

const COMMENT_COLUMNS: &str = "
    comments.comment_snowflake,
    comments.post_snowflake,
    comments.user_snowflake,
    comments.content,
    comments.created_at
";

impl DbClient {
    pub async fn create_comment(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
        content: &CommentContent,
        created_at: OffsetDateTime,
    ) -> Result<Comment> {
        let comment_id = self.next_id::<CommentMarker>();

        let record = query_as::<_, CommentRecord>(&format!(
            "
            INSERT INTO comments (comment_snowflake, post_snowflake, user_snowflake, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING {COMMENT_COLUMNS}
            "
        ))
        .bind(db_id(comment_id))
        .bind(db_id(post_id))
        .bind(db_id(user_id))
        .bind(content.get())
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        debug!(%comment_id, %post_id, %user_id, "Created comment");
        Ok(Comment::try_from(record)?)
    }

    /// Comments on the post, newest first.
    pub async fn fetch_post_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = query_as::<_, CommentRecord>(&format!(
            "
            SELECT {COMMENT_COLUMNS}
            FROM comments
            WHERE comments.post_snowflake = ?1
            ORDER BY comments.comment_snowflake DESC
            "
        ))
        .bind(db_id(post_id))
        .fetch_all(&self.pool)
        .await?;

        let comments = records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?;
        Ok(comments)
    }

    /// A comment, only if it belongs to `post_id`.
    pub async fn fetch_comment(
        &self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
    ) -> Result<Option<Comment>> {
        let record = query_as::<_, CommentRecord>(&format!(
            "
            SELECT {COMMENT_COLUMNS}
            FROM comments
            WHERE comments.post_snowflake = ?1 AND comments.comment_snowflake = ?2
            "
        ))
        .bind(db_id(post_id))
        .bind(db_id(comment_id))
        .fetch_optional(&self.pool)
        .await?;

        let comment = record.map(Comment::try_from).transpose()?;
        Ok(comment)
    }

    pub async fn update_comment(
        &self,
        comment_id: Id<CommentMarker>,
        content: &CommentContent,
    ) -> Result<Option<Comment>> {
        let record = query_as::<_, CommentRecord>(&format!(
            "
            UPDATE comments SET content = ?2
            WHERE comments.comment_snowflake = ?1
            RETURNING {COMMENT_COLUMNS}
            "
        ))
        .bind(db_id(comment_id))
        .bind(content.get())
        .fetch_optional(&self.pool)
        .await?;

        let comment = record.map(Comment::try_from).transpose()?;
        Ok(comment)
    }

    pub async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<bool> {
        let deleted = query("DELETE FROM comments WHERE comment_snowflake = ?1")
            .bind(db_id(comment_id))
            .execute(&self.pool)
            .await?
            .rows_affected();

        debug!(%comment_id, deleted, "Deleted comment");
        Ok(deleted > 0)
    }
}
