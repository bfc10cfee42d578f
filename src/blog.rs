//! Mutating post/comment operations. Every one takes the acting user id
//! explicitly; ownership is checked here rather than in the store.

use tracing::info;

use crate::error::ApiError;
use crate::models::*;
use crate::repo::Repo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Edit,
    Delete,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

/// `Forbidden` unless `actor` is exactly `author`.
pub fn ensure_author(actor: Id, author: Id, action: Action, noun: &str) -> Result<(), ApiError> {
    if actor == author {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!("You are not allowed to {} this {noun}.", action.verb())))
    }
}

pub async fn create_post(repo: &dyn Repo, actor: Id, fields: PostFields) -> Result<Post, ApiError> {
    let post = repo.create_post(actor, fields).await?;
    info!(post_id = post.id, author = actor, "post created");
    Ok(post)
}

/// Loads the post and checks `actor` may act on it.
pub async fn owned_post(repo: &dyn Repo, actor: Id, id: Id, action: Action) -> Result<Post, ApiError> {
    let post = repo.get_post(id).await?;
    ensure_author(actor, post.author, action, "post")?;
    Ok(post)
}

pub async fn update_post(repo: &dyn Repo, actor: Id, id: Id, fields: PostFields) -> Result<Post, ApiError> {
    owned_post(repo, actor, id, Action::Edit).await?;
    Ok(repo.update_post(id, fields).await?)
}

pub async fn delete_post(repo: &dyn Repo, actor: Id, id: Id) -> Result<(), ApiError> {
    owned_post(repo, actor, id, Action::Delete).await?;
    repo.delete_post(id).await?;
    info!(post_id = id, "post deleted with its comments");
    Ok(())
}

pub async fn add_comment(repo: &dyn Repo, actor: Id, post: Id, content: String) -> Result<Comment, ApiError> {
    repo.get_post(post).await?;
    Ok(repo.create_comment(post, actor, content).await?)
}

pub async fn owned_comment(repo: &dyn Repo, actor: Id, id: Id, action: Action) -> Result<Comment, ApiError> {
    let comment = repo.get_comment(id).await?;
    ensure_author(actor, comment.author, action, "comment")?;
    Ok(comment)
}

pub async fn update_comment(repo: &dyn Repo, actor: Id, id: Id, content: String) -> Result<Comment, ApiError> {
    owned_comment(repo, actor, id, Action::Edit).await?;
    Ok(repo.update_comment(id, content).await?)
}

/// Returns the parent post id, where the browser goes next.
pub async fn delete_comment(repo: &dyn Repo, actor: Id, id: Id) -> Result<Id, ApiError> {
    let comment = owned_comment(repo, actor, id, Action::Delete).await?;
    repo.delete_comment(id).await?;
    Ok(comment.post)
}

/// Flips `actor`'s membership in the post's like-set; returns the post as it is afterwards.
pub async fn toggle_post_like(repo: &dyn Repo, actor: Id, id: Id) -> Result<Post, ApiError> {
    let liked = repo.toggle_post_like(id, actor).await?;
    tracing::debug!(post_id = id, user = actor, liked, "post like toggled");
    Ok(repo.get_post(id).await?)
}

pub async fn toggle_comment_like(repo: &dyn Repo, actor: Id, id: Id) -> Result<Comment, ApiError> {
    let liked = repo.toggle_comment_like(id, actor).await?;
    tracing::debug!(comment_id = id, user = actor, liked, "comment like toggled");
    Ok(repo.get_comment(id).await?)
}
