use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::posts::repo_types::Post;

/// Body for both creating and editing a post.
#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_posted: OffsetDateTime,
    pub author_id: Uuid,
}

impl From<Post> for PostView {
    fn from(p: Post) -> Self {
        Self {
            id: p.id,
            title: p.title,
            content: p.content,
            date_posted: p.date_posted,
            author_id: p.user_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
}
fn default_page() -> i64 {
    1
}

/// One page of a listing. `page` is 1-based.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
    pub has_prev: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: i64, per_page: i64, total: i64) -> Self {
        let pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };
        Self {
            items,
            page,
            per_page,
            total,
            pages,
            has_prev: page > 1,
            has_next: page < pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            pages: self.pages,
            has_prev: self.has_prev,
            has_next: self.has_next,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub notice: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_math() {
        let p = Page::new(vec![1, 2, 3], 1, 3, 7);
        assert_eq!(p.pages, 3);
        assert!(!p.has_prev);
        assert!(p.has_next);

        let last = Page::new(vec![7], 3, 3, 7);
        assert!(last.has_prev);
        assert!(!last.has_next);

        let empty: Page<i32> = Page::new(vec![], 1, 3, 0);
        assert_eq!(empty.pages, 0);
        assert!(!empty.has_next);
    }

    #[test]
    fn post_view_serializes_rfc3339() {
        let view = PostView {
            id: Uuid::nil(),
            title: "Hello".into(),
            content: "World".into(),
            date_posted: time::macros::datetime!(2024-01-02 03:04:05 UTC),
            author_id: Uuid::nil(),
        };
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("\"date_posted\":\"2024-01-02T03:04:05Z\""));
        assert!(json.contains("\"author_id\""));
    }
}
