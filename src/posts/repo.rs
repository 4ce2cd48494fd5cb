use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::map_write_error;
use crate::error::{AppError, AppResult};
use crate::posts::repo_types::{NewPost, Post};

/// Persistence for posts. Listings come back in insertion order together
/// with the total row count for the same filter.
#[async_trait]
pub trait PostRepo: Send + Sync {
    async fn create_post(&self, post: NewPost) -> AppResult<Post>;
    async fn get_post(&self, id: Uuid) -> AppResult<Option<Post>>;
    async fn list_posts(&self, limit: i64, offset: i64) -> AppResult<(Vec<Post>, i64)>;
    async fn list_posts_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Post>, i64)>;
    async fn update_post(&self, id: Uuid, title: &str, content: &str) -> AppResult<Post>;
    async fn delete_post(&self, id: Uuid) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct PgPostRepo {
    db: PgPool,
}

impl PgPostRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PostRepo for PgPostRepo {
    async fn create_post(&self, post: NewPost) -> AppResult<Post> {
        let created = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (title, content, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, title, content, date_posted, user_id
            "#,
        )
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.user_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_write_error(e, "create post"))?;
        Ok(created)
    }

    async fn get_post(&self, id: Uuid) -> AppResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, content, date_posted, user_id
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get post")?;
        Ok(post)
    }

    async fn list_posts(&self, limit: i64, offset: i64) -> AppResult<(Vec<Post>, i64)> {
        let rows = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, content, date_posted, user_id
            FROM posts
            ORDER BY date_posted ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list posts")?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.db)
            .await
            .context("count posts")?;
        Ok((rows, total))
    }

    async fn list_posts_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Post>, i64)> {
        let rows = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, title, content, date_posted, user_id
            FROM posts
            WHERE user_id = $1
            ORDER BY date_posted ASC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list posts by user")?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.db)
            .await
            .context("count posts by user")?;
        Ok((rows, total))
    }

    async fn update_post(&self, id: Uuid, title: &str, content: &str) -> AppResult<Post> {
        let updated = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts SET title = $2, content = $3
            WHERE id = $1
            RETURNING id, title, content, date_posted, user_id
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(content)
        .fetch_optional(&self.db)
        .await
        .context("update post")?;
        updated.ok_or(AppError::NotFound("Post"))
    }

    async fn delete_post(&self, id: Uuid) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete post")?;
        Ok(res.rows_affected() > 0)
    }
}
