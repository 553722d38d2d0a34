use crate::{
    client::{DbClient, Result, db_id},
    record::{LikeRecord, PostRecord, PostSummaryRecord},
};
use agora_common::model::{
    Id,
    like::{Like, LikeMarker},
    post::{PatchPost, Post, PostContent, PostDetail, PostMarker, PostSummary},
    user::UserMarker,
};
use sqlx::{query, query_as};
use time::OffsetDateTime;
use tracing::debug;

const POST_COLUMNS: &str = "
    posts.post_snowflake,
    posts.author_snowflake,
    posts.content,
    posts.image,
    posts.hashtag,
    posts.created_at
";

const POST_COUNTS: &str = "
    (SELECT COUNT(*) FROM likes WHERE likes.post_snowflake = posts.post_snowflake) AS count_likes,
    (SELECT COUNT(*) FROM comments WHERE comments.post_snowflake = posts.post_snowflake) AS count_comments
";

impl DbClient {
    pub async fn create_post(
        &self,
        author: Id<UserMarker>,
        content: &PostContent,
        created_at: OffsetDateTime,
    ) -> Result<Post> {
        let post_id = self.next_id::<PostMarker>();

        let record = query_as::<_, PostRecord>(&format!(
            "
            INSERT INTO posts (post_snowflake, author_snowflake, content, hashtag, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING {POST_COLUMNS}
            "
        ))
        .bind(db_id(post_id))
        .bind(db_id(author))
        .bind(content.content.as_deref())
        .bind(content.hashtag.as_ref().map(|hashtag| hashtag.get()))
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        debug!(%post_id, %author, "Created post");
        Ok(Post::try_from(record)?)
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE posts.post_snowflake = ?1"
        ))
        .bind(db_id(post_id))
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    pub async fn fetch_post_summary(&self, post_id: Id<PostMarker>) -> Result<Option<PostSummary>> {
        let record = query_as::<_, PostSummaryRecord>(&format!(
            "
            SELECT {POST_COLUMNS}, {POST_COUNTS}
            FROM posts
            WHERE posts.post_snowflake = ?1
            "
        ))
        .bind(db_id(post_id))
        .fetch_optional(&self.pool)
        .await?;

        let summary = record.map(PostSummary::try_from).transpose()?;
        Ok(summary)
    }

    /// Every post, newest first.
    pub async fn list_posts(&self) -> Result<Vec<PostSummary>> {
        let records = query_as::<_, PostSummaryRecord>(&format!(
            "
            SELECT {POST_COLUMNS}, {POST_COUNTS}
            FROM posts
            ORDER BY posts.post_snowflake DESC
            "
        ))
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(PostSummary::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    /// The post with all of its likes and comments.
    pub async fn fetch_post_detail(&self, post_id: Id<PostMarker>) -> Result<Option<PostDetail>> {
        let Some(post) = self.fetch_post(post_id).await? else {
            return Ok(None);
        };

        let likes = self.fetch_post_likes(post_id).await?;
        let comments = self.fetch_post_comments(post_id).await?;

        Ok(Some(PostDetail::new(post, likes, comments)))
    }

    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(&format!(
            "
            UPDATE posts SET content = ?2, hashtag = ?3
            WHERE posts.post_snowflake = ?1
            RETURNING {POST_COLUMNS}
            "
        ))
        .bind(db_id(post_id))
        .bind(content.content.as_deref())
        .bind(content.hashtag.as_ref().map(|hashtag| hashtag.get()))
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    pub async fn patch_post(
        &self,
        post_id: Id<PostMarker>,
        patch: &PatchPost,
    ) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(&format!(
            "
            UPDATE posts SET
                content = COALESCE(?2, content),
                hashtag = COALESCE(?3, hashtag)
            WHERE posts.post_snowflake = ?1
            RETURNING {POST_COLUMNS}
            "
        ))
        .bind(db_id(post_id))
        .bind(patch.content.as_deref())
        .bind(patch.hashtag.as_ref().map(|hashtag| hashtag.get()))
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    pub async fn set_post_image(
        &self,
        post_id: Id<PostMarker>,
        image: &str,
    ) -> Result<Option<Post>> {
        let record = query_as::<_, PostRecord>(&format!(
            "
            UPDATE posts SET image = ?2
            WHERE posts.post_snowflake = ?1
            RETURNING {POST_COLUMNS}
            "
        ))
        .bind(db_id(post_id))
        .bind(image)
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    /// Deletes the post together with its likes and comments.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let deleted = query("DELETE FROM posts WHERE post_snowflake = ?1")
            .bind(db_id(post_id))
            .execute(&self.pool)
            .await?
            .rows_affected();

        debug!(%post_id, deleted, "Deleted post");
        Ok(deleted > 0)
    }

    /// Returns `false` if the user already liked the post.
    pub async fn create_like(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<bool> {
        let like_id = self.next_id::<LikeMarker>();

        let inserted = query(
            "
            INSERT INTO likes (like_snowflake, post_snowflake, user_snowflake)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (post_snowflake, user_snowflake) DO NOTHING
            ",
        )
        .bind(db_id(like_id))
        .bind(db_id(post_id))
        .bind(db_id(user_id))
        .execute(&self.pool)
        .await?
        .rows_affected();

        debug!(%post_id, %user_id, inserted, "Like");
        Ok(inserted > 0)
    }

    /// Returns `false` if there was no like to remove.
    pub async fn delete_like(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<bool> {
        let deleted = query("DELETE FROM likes WHERE post_snowflake = ?1 AND user_snowflake = ?2")
            .bind(db_id(post_id))
            .bind(db_id(user_id))
            .execute(&self.pool)
            .await?
            .rows_affected();

        debug!(%post_id, %user_id, deleted, "Unlike");
        Ok(deleted > 0)
    }

    pub async fn fetch_post_likes(&self, post_id: Id<PostMarker>) -> Result<Vec<Like>> {
        let records = query_as::<_, LikeRecord>(
            "
            SELECT like_snowflake, post_snowflake, user_snowflake
            FROM likes
            WHERE post_snowflake = ?1
            ORDER BY like_snowflake
            ",
        )
        .bind(db_id(post_id))
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Like::from).collect())
    }
}
