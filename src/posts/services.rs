use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::repo::UserRepo,
    error::{AppError, AppResult},
    posts::{
        dto::Page,
        guard::{authorize, Mutation, Rejection},
        repo::PostRepo,
        repo_types::{NewPost, Post},
    },
};

pub const TITLE_MAX: usize = 100;

#[derive(Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Soft rejection: nothing was removed, the caller shows `notice`.
    NotOwner { notice: &'static str },
}

fn validate(title: &str, content: &str) -> AppResult<()> {
    let title_len = title.trim().chars().count();
    if title_len == 0 || title_len > TITLE_MAX {
        return Err(AppError::Validation(format!(
            "Title is required and must be at most {TITLE_MAX} characters"
        )));
    }
    if content.trim().is_empty() {
        return Err(AppError::Validation("Content is required".into()));
    }
    Ok(())
}

pub async fn create(
    posts: &dyn PostRepo,
    owner: Uuid,
    title: &str,
    content: &str,
) -> AppResult<Post> {
    validate(title, content)?;
    let post = posts
        .create_post(NewPost {
            user_id: owner,
            title: title.trim().to_string(),
            content: content.to_string(),
        })
        .await?;
    info!(post_id = %post.id, user_id = %owner, "post created");
    Ok(post)
}

pub async fn get(posts: &dyn PostRepo, id: Uuid) -> AppResult<Post> {
    posts.get_post(id).await?.ok_or(AppError::NotFound("Post"))
}

/// Changes title and content. A non-owner gets `Forbidden`.
pub async fn edit(
    posts: &dyn PostRepo,
    requester: Uuid,
    id: Uuid,
    title: &str,
    content: &str,
) -> AppResult<Post> {
    let post = get(posts, id).await?;
    if let Err(rejection) = authorize(&post, requester, Mutation::Edit) {
        warn!(post_id = %id, user_id = %requester, "edit refused: not the author");
        return Err(match rejection {
            Rejection::Hard(e) => e,
            Rejection::Soft(_) => AppError::Forbidden,
        });
    }
    validate(title, content)?;
    let updated = posts.update_post(id, title.trim(), content).await?;
    info!(post_id = %id, user_id = %requester, "post updated");
    Ok(updated)
}

/// Removes the post if `requester` owns it. A non-owner is refused softly.
pub async fn delete(posts: &dyn PostRepo, requester: Uuid, id: Uuid) -> AppResult<DeleteOutcome> {
    let post = get(posts, id).await?;
    match authorize(&post, requester, Mutation::Delete) {
        Ok(()) => {}
        Err(Rejection::Soft(notice)) => {
            warn!(post_id = %id, user_id = %requester, "delete refused: not the author");
            return Ok(DeleteOutcome::NotOwner { notice });
        }
        Err(Rejection::Hard(e)) => return Err(e),
    }
    if !posts.delete_post(id).await? {
        return Err(AppError::NotFound("Post"));
    }
    info!(post_id = %id, user_id = %requester, "post deleted");
    Ok(DeleteOutcome::Deleted)
}

fn offset_for(page: i64, per_page: i64) -> AppResult<i64> {
    if page < 1 {
        return Err(AppError::NotFound("Page"));
    }
    (page - 1)
        .checked_mul(per_page)
        .ok_or(AppError::NotFound("Page"))
}

fn finish(rows: Vec<Post>, page: i64, per_page: i64, total: i64) -> AppResult<Page<Post>> {
    // Page 1 of an empty listing is a valid empty page; anything past the end is not.
    if rows.is_empty() && page != 1 {
        return Err(AppError::NotFound("Page"));
    }
    Ok(Page::new(rows, page, per_page, total))
}

pub async fn list(posts: &dyn PostRepo, page: i64, per_page: i64) -> AppResult<Page<Post>> {
    let offset = offset_for(page, per_page)?;
    let (rows, total) = posts.list_posts(per_page, offset).await?;
    finish(rows, page, per_page, total)
}

pub async fn posts_by_user(
    users: &dyn UserRepo,
    posts: &dyn PostRepo,
    user_id: Uuid,
    page: i64,
    per_page: i64,
) -> AppResult<Page<Post>> {
    if users.find_by_id(user_id).await?.is_none() {
        return Err(AppError::NotFound("User"));
    }
    let offset = offset_for(page, per_page)?;
    let (rows, total) = posts.list_posts_by_user(user_id, per_page, offset).await?;
    finish(rows, page, per_page, total)
}
