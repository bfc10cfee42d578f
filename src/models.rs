use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type Id = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: Option<String>,
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct UpdateUser {
    pub username: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct Post {
    pub id: Id,
    pub author: Id,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    /// User ids, ascending.
    pub likes: Vec<Id>,
}

impl Post {
    pub fn total_likes(&self) -> usize {
        self.likes.len()
    }
}

/// Writable post fields, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct PostFields {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "postgres-store", derive(sqlx::FromRow))]
pub struct Comment {
    pub id: Id,
    pub post: Id,
    pub author: Id,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub likes: Vec<Id>,
}

impl Comment {
    pub fn total_likes(&self) -> usize {
        self.likes.len()
    }
}

/// Outbound shape of a post: the record plus its computed like count.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub total_likes: usize,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        let total_likes = post.total_likes();
        Self { post, total_likes }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub total_likes: usize,
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        let total_likes = comment.total_likes();
        Self { comment, total_likes }
    }
}

/// Newest first; `sort_by` is stable so equal timestamps keep insertion order.
pub(crate) fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}
