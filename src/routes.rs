use std::sync::Arc;
use actix_web::{web, HttpResponse};

use crate::auth::Auth;
use crate::blog::{self, Action};
use crate::config::Config;
use crate::error::ApiError;
use crate::models::*;
use crate::repo::{Repo, RepoError};
use crate::validate::{CommentForm, NewCommentPayload, NewPostPayload, PostForm, PostPatch};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::resource("/posts/")
                    .route(web::get().to(list_posts))
                    .route(web::post().to(create_post)),
            )
            .service(
                web::resource("/posts/{id}/")
                    .route(web::get().to(get_post))
                    .route(web::put().to(replace_post))
                    .route(web::patch().to(patch_post))
                    .route(web::delete().to(delete_post)),
            )
            .service(
                web::resource("/comments/")
                    .route(web::get().to(list_comments))
                    .route(web::post().to(create_comment)),
            )
            .service(
                web::resource("/comments/{id}/")
                    .route(web::get().to(get_comment))
                    .route(web::put().to(replace_comment))
                    .route(web::patch().to(patch_comment))
                    .route(web::delete().to(delete_comment)),
            ),
    );
    crate::pages::config(cfg);
}

#[derive(Clone)]
pub struct AppState { pub repo: Arc<dyn Repo>, pub config: Arc<Config> }

impl AppState {
    /// The identity the API acts as: required and returned when ownership is
    /// enforced, ignored otherwise.
    fn api_actor(&self, auth: Option<Auth>) -> Result<Option<Id>, ApiError> {
        if !self.config.api_enforce_ownership {
            return Ok(None);
        }
        auth.map(|a| Some(a.user_id())).ok_or(ApiError::Unauthenticated)
    }
}

/// Unknown related rows in a create payload are the client's fault.
fn bad_reference(e: RepoError, what: &str) -> ApiError {
    match e {
        RepoError::NotFound => ApiError::BadRequest(format!("Invalid {what}.")),
        other => other.into(),
    }
}

#[utoipa::path(
    get,
    path = "/api/posts/",
    responses((status = 200, description = "All posts, newest first", body = [PostView]))
)]
pub async fn list_posts(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let posts: Vec<PostView> = data.repo.search_posts(None).await?.into_iter().map(PostView::from).collect();
    Ok(HttpResponse::Ok().json(posts))
}

#[utoipa::path(
    post,
    path = "/api/posts/",
    request_body = NewPostPayload,
    responses(
        (status = 201, description = "Post created", body = PostView),
        (status = 400, description = "Missing or unknown author"),
        (status = 401, description = "Ownership enforced and no identity"),
        (status = 422, description = "Field constraints violated")
    )
)]
pub async fn create_post(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    payload: web::Json<NewPostPayload>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    let author = match data.api_actor(auth)? {
        Some(actor) => actor,
        None => payload.author.ok_or_else(|| ApiError::BadRequest("author is required.".into()))?,
    };
    let fields = payload.form.clean()?;
    let post = blog::create_post(data.repo.as_ref(), author, fields)
        .await
        .map_err(|e| match e {
            ApiError::NotFound => ApiError::BadRequest("Invalid author.".into()),
            other => other,
        })?;
    Ok(HttpResponse::Created().json(PostView::from(post)))
}

#[utoipa::path(
    get,
    path = "/api/posts/{id}/",
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post", body = PostView),
        (status = 404, description = "Post not found")
    )
)]
pub async fn get_post(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let post = data.repo.get_post(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(PostView::from(post)))
}

/// Resolves who is acting on post `id` before its body is looked at: with
/// ownership enforced an anonymous caller is 401 and a non-author 403.
async fn post_editor(data: &AppState, auth: Option<Auth>, id: Id) -> Result<(Option<Id>, Post), ApiError> {
    match data.api_actor(auth)? {
        Some(actor) => Ok((Some(actor), blog::owned_post(data.repo.as_ref(), actor, id, Action::Edit).await?)),
        None => Ok((None, data.repo.get_post(id).await?)),
    }
}

async fn save_post(data: &AppState, actor: Option<Id>, id: Id, fields: PostFields) -> Result<HttpResponse, ApiError> {
    let post = match actor {
        Some(actor) => blog::update_post(data.repo.as_ref(), actor, id, fields).await?,
        None => data.repo.update_post(id, fields).await?,
    };
    Ok(HttpResponse::Ok().json(PostView::from(post)))
}

#[utoipa::path(
    put,
    path = "/api/posts/{id}/",
    request_body = PostForm,
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post replaced", body = PostView),
        (status = 403, description = "Not the author (ownership enforced)"),
        (status = 404, description = "Post not found"),
        (status = 422, description = "Field constraints violated")
    )
)]
pub async fn replace_post(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<PostForm>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let (actor, _) = post_editor(&data, auth, id).await?;
    let fields = payload.into_inner().clean()?;
    save_post(&data, actor, id, fields).await
}

#[utoipa::path(
    patch,
    path = "/api/posts/{id}/",
    request_body = PostPatch,
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post updated", body = PostView),
        (status = 403, description = "Not the author (ownership enforced)"),
        (status = 404, description = "Post not found"),
        (status = 422, description = "Field constraints violated")
    )
)]
pub async fn patch_post(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<PostPatch>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let (actor, current) = post_editor(&data, auth, id).await?;
    let fields = payload.into_inner().apply(PostFields {
        title: current.title,
        content: current.content,
        category: current.category,
        image: current.image,
    })?;
    save_post(&data, actor, id, fields).await
}

#[utoipa::path(
    delete,
    path = "/api/posts/{id}/",
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post and its comments deleted"),
        (status = 403, description = "Not the author (ownership enforced)"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn delete_post(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    match data.api_actor(auth)? {
        Some(actor) => blog::delete_post(data.repo.as_ref(), actor, id).await?,
        None => data.repo.delete_post(id).await?,
    }
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/comments/",
    responses((status = 200, description = "All comments, newest first", body = [CommentView]))
)]
pub async fn list_comments(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let comments: Vec<CommentView> = data.repo.list_comments().await?.into_iter().map(CommentView::from).collect();
    Ok(HttpResponse::Ok().json(comments))
}

#[utoipa::path(
    post,
    path = "/api/comments/",
    request_body = NewCommentPayload,
    responses(
        (status = 201, description = "Comment created", body = CommentView),
        (status = 400, description = "Missing or unknown post/author"),
        (status = 422, description = "Field constraints violated")
    )
)]
pub async fn create_comment(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    payload: web::Json<NewCommentPayload>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    let author = match data.api_actor(auth)? {
        Some(actor) => actor,
        None => payload.author.ok_or_else(|| ApiError::BadRequest("author is required.".into()))?,
    };
    let content = CommentForm { content: payload.content }.clean()?;
    let comment = data
        .repo
        .create_comment(payload.post, author, content)
        .await
        .map_err(|e| bad_reference(e, "post or author"))?;
    Ok(HttpResponse::Created().json(CommentView::from(comment)))
}

#[utoipa::path(
    get,
    path = "/api/comments/{id}/",
    params(("id" = Id, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment", body = CommentView),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn get_comment(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let comment = data.repo.get_comment(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(CommentView::from(comment)))
}

async fn comment_editor(data: &AppState, auth: Option<Auth>, id: Id) -> Result<(Option<Id>, Comment), ApiError> {
    match data.api_actor(auth)? {
        Some(actor) => Ok((Some(actor), blog::owned_comment(data.repo.as_ref(), actor, id, Action::Edit).await?)),
        None => Ok((None, data.repo.get_comment(id).await?)),
    }
}

async fn save_comment(data: &AppState, actor: Option<Id>, id: Id, content: String) -> Result<HttpResponse, ApiError> {
    let comment = match actor {
        Some(actor) => blog::update_comment(data.repo.as_ref(), actor, id, content).await?,
        None => data.repo.update_comment(id, content).await?,
    };
    Ok(HttpResponse::Ok().json(CommentView::from(comment)))
}

#[utoipa::path(
    put,
    path = "/api/comments/{id}/",
    request_body = CommentForm,
    params(("id" = Id, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment replaced", body = CommentView),
        (status = 404, description = "Comment not found"),
        (status = 422, description = "Field constraints violated")
    )
)]
pub async fn replace_comment(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<CommentForm>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let (actor, _) = comment_editor(&data, auth, id).await?;
    let content = payload.into_inner().clean()?;
    save_comment(&data, actor, id, content).await
}

#[derive(Debug, Default, serde::Deserialize, utoipa::ToSchema)]
pub struct CommentPatch {
    pub content: Option<String>,
}

#[utoipa::path(
    patch,
    path = "/api/comments/{id}/",
    request_body = CommentPatch,
    params(("id" = Id, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment updated", body = CommentView),
        (status = 404, description = "Comment not found"),
        (status = 422, description = "Field constraints violated")
    )
)]
pub async fn patch_comment(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<CommentPatch>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let (actor, current) = comment_editor(&data, auth, id).await?;
    let content = CommentForm { content: payload.into_inner().content.unwrap_or(current.content) }.clean()?;
    save_comment(&data, actor, id, content).await
}

#[utoipa::path(
    delete,
    path = "/api/comments/{id}/",
    params(("id" = Id, Path, description = "Comment id")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Not the author (ownership enforced)"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn delete_comment(auth: Option<Auth>, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    match data.api_actor(auth)? {
        Some(actor) => {
            blog::delete_comment(data.repo.as_ref(), actor, id).await?;
        }
        None => data.repo.delete_comment(id).await?,
    }
    Ok(HttpResponse::NoContent().finish())
}
