use uuid::Uuid;

use crate::error::AppError;
use crate::posts::repo_types::Post;

pub const NOT_AUTHOR_NOTICE: &str =
    "You are not the author of this post. You can not delete or update this post.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Edit,
    Delete,
}

/// How a refused mutation is reported.
#[derive(Debug)]
pub enum Rejection {
    /// The request still completes normally and carries this notice.
    Soft(&'static str),
    /// The request is aborted.
    Hard(AppError),
}

pub fn can_mutate(post: &Post, requester_id: Uuid) -> bool {
    post.user_id == requester_id
}

/// Deletes are refused softly, edits hard.
pub fn authorize(post: &Post, requester_id: Uuid, mutation: Mutation) -> Result<(), Rejection> {
    if can_mutate(post, requester_id) {
        return Ok(());
    }
    match mutation {
        Mutation::Delete => Err(Rejection::Soft(NOT_AUTHOR_NOTICE)),
        Mutation::Edit => Err(Rejection::Hard(AppError::Forbidden)),
    }
}
