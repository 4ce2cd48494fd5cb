//! In-process store used when no `DATABASE_URL` is configured, and by tests.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserRepo,
        repo_types::{NewUser, User, DEFAULT_IMAGE_FILE},
    },
    error::{AppError, AppResult},
    posts::{
        repo::PostRepo,
        repo_types::{NewPost, Post},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    // insertion order is the listing order
    posts: Vec<Post>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

fn duplicate(users: &[User], skip: Option<Uuid>, username: &str, email: &str) -> Option<AppError> {
    let others = users.iter().filter(|u| Some(u.id) != skip);
    for u in others {
        if u.username == username {
            return Some(AppError::DuplicateCredential(
                "That username is taken. Please choose a different one".into(),
            ));
        }
        if u.email == email {
            return Some(AppError::DuplicateCredential("Email already registered".into()));
        }
    }
    None
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut t = self.tables.write().await;
        if let Some(err) = duplicate(&t.users, None, &user.username, &user.email) {
            return Err(err);
        }
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            image_file: DEFAULT_IMAGE_FILE.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(created.clone());
        Ok(created)
    }

    async fn update_profile(&self, id: Uuid, username: &str, email: &str) -> AppResult<User> {
        let mut t = self.tables.write().await;
        if let Some(err) = duplicate(&t.users, Some(id), username, email) {
            return Err(err);
        }
        let user = t
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AppError::NotFound("User"))?;
        user.username = username.to_string();
        user.email = email.to_string();
        Ok(user.clone())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        let mut t = self.tables.write().await;
        let user = t
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AppError::NotFound("User"))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }
}

fn page(posts: impl Iterator<Item = Post>, limit: i64, offset: i64) -> Vec<Post> {
    posts
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl PostRepo for MemoryStore {
    async fn create_post(&self, post: NewPost) -> AppResult<Post> {
        let mut t = self.tables.write().await;
        if !t.users.iter().any(|u| u.id == post.user_id) {
            return Err(AppError::NotFound("User"));
        }
        let created = Post {
            id: Uuid::new_v4(),
            title: post.title,
            content: post.content,
            date_posted: OffsetDateTime::now_utc(),
            user_id: post.user_id,
        };
        t.posts.push(created.clone());
        Ok(created)
    }

    async fn get_post(&self, id: Uuid) -> AppResult<Option<Post>> {
        let t = self.tables.read().await;
        Ok(t.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn list_posts(&self, limit: i64, offset: i64) -> AppResult<(Vec<Post>, i64)> {
        let t = self.tables.read().await;
        let total = t.posts.len() as i64;
        Ok((page(t.posts.iter().cloned(), limit, offset), total))
    }

    async fn list_posts_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Post>, i64)> {
        let t = self.tables.read().await;
        let owned: Vec<Post> = t
            .posts
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        let total = owned.len() as i64;
        Ok((page(owned.into_iter(), limit, offset), total))
    }

    async fn update_post(&self, id: Uuid, title: &str, content: &str) -> AppResult<Post> {
        let mut t = self.tables.write().await;
        let post = t
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(AppError::NotFound("Post"))?;
        post.title = title.to_string();
        post.content = content.to_string();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> AppResult<bool> {
        let mut t = self.tables.write().await;
        let before = t.posts.len();
        t.posts.retain(|p| p.id != id);
        Ok(t.posts.len() != before)
    }
}
