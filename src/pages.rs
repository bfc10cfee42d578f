//! Browser-facing routes. Rendering is left to whatever sits in front of this
//! service, so a page answers with its context as JSON, and a successful form
//! submission answers with a redirect. A rejected submission comes back as 422
//! carrying the submitted values and the field errors.

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{self, Auth};
use crate::blog::{self, Action};
use crate::error::ApiError;
use crate::models::*;
use crate::repo::RepoError;
use crate::routes::AppState;
use crate::search::{self, FeedParams};
use crate::validate::{
    CommentForm, FieldErrors, LoginForm, PostForm, ProfileForm, SignupForm, NON_FIELD, REQUIRED,
};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(post_list))
        .service(web::resource("/post/new/").route(web::get().to(post_create_form)).route(web::post().to(post_create)))
        .route("/post/{id}/", web::get().to(post_detail))
        .service(web::resource("/post/{id}/edit/").route(web::get().to(post_update_form)).route(web::post().to(post_update)))
        .service(web::resource("/post/{id}/delete/").route(web::get().to(post_delete_confirm)).route(web::post().to(post_delete)))
        .service(web::resource("/post/{id}/comment/").route(web::get().to(comment_create_form)).route(web::post().to(comment_create)))
        .route("/post/{id}/like/", web::post().to(post_like))
        .service(web::resource("/comment/{id}/edit/").route(web::get().to(comment_update_form)).route(web::post().to(comment_update)))
        .service(web::resource("/comment/{id}/delete/").route(web::get().to(comment_delete_confirm)).route(web::post().to(comment_delete)))
        .route("/comment/{id}/like/", web::post().to(comment_like))
        .service(web::resource("/signup/").route(web::get().to(signup_form)).route(web::post().to(signup)))
        .service(web::resource("/login/").route(web::get().to(login_form)).route(web::post().to(login)))
        .service(web::resource("/logout/").route(web::get().to(logout)).route(web::post().to(logout)))
        .service(web::resource("/profile/").route(web::get().to(profile)).route(web::post().to(profile_update)));
}

/// A form page: the values to show and any errors against them.
#[derive(Debug, Serialize, Deserialize)]
pub struct FormPage<F> {
    pub form: F,
    pub errors: FieldErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Id>,
}

impl<F: Serialize> FormPage<F> {
    fn blank(form: F) -> Self {
        Self { form, errors: FieldErrors::default(), post: None }
    }

    fn for_post(mut self, post: Id) -> Self {
        self.post = Some(post);
        self
    }

    fn ok(self) -> HttpResponse {
        HttpResponse::Ok().json(self)
    }

    fn rejected(form: F, errors: FieldErrors) -> Self {
        Self { form, errors, post: None }
    }

    fn invalid(self) -> HttpResponse {
        HttpResponse::UnprocessableEntity().json(self)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostDetail {
    pub post: PostView,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfilePage {
    pub user: User,
    pub posts: Vec<PostView>,
    pub comments: Vec<CommentView>,
    pub form: ProfileForm,
    pub errors: FieldErrors,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextParam {
    pub next: Option<String>,
}

fn redirect(to: impl Into<String>) -> HttpResponse {
    HttpResponse::Found().insert_header((header::LOCATION, to.into())).finish()
}

fn detail_url(post: Id) -> String {
    format!("/post/{post}/")
}

/// Anonymous visitors are sent to the login form, coming back here afterwards.
fn login_required(req: &HttpRequest, auth: Option<Auth>) -> Result<Auth, ApiError> {
    auth.ok_or_else(|| {
        let next = match req.uri().query() {
            Some(q) => format!("{}?{q}", req.path()),
            None => req.path().to_string(),
        };
        ApiError::LoginRequired { next }
    })
}

/// Only same-site absolute paths are followed after login.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") && !n.contains('\\') => n,
        _ => "/",
    }
}

fn back_or(req: &HttpRequest, fallback: String) -> HttpResponse {
    let referer = req
        .headers()
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());
    redirect(referer.map(str::to_string).unwrap_or(fallback))
}

fn post_fields_of(post: &Post) -> PostFields {
    PostFields {
        title: post.title.clone(),
        content: post.content.clone(),
        category: post.category.clone(),
        image: post.image.clone(),
    }
}

// ---------------- feed & detail -----------------------------------

pub async fn post_list(data: web::Data<AppState>, params: web::Query<FeedParams>) -> Result<HttpResponse, ApiError> {
    let feed = search::feed(data.repo.as_ref(), &params).await?;
    Ok(HttpResponse::Ok().json(feed))
}

pub async fn post_detail(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let post = data.repo.get_post(id).await?;
    let comments = data.repo.list_comments_for_post(id).await?;
    Ok(HttpResponse::Ok().json(PostDetail {
        post: post.into(),
        comments: comments.into_iter().map(CommentView::from).collect(),
    }))
}

// ---------------- posts -------------------------------------------

pub async fn post_create_form(req: HttpRequest, auth: Option<Auth>) -> Result<HttpResponse, ApiError> {
    login_required(&req, auth)?;
    Ok(FormPage::blank(PostForm::default()).ok())
}

pub async fn post_create(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    form: web::Form<PostForm>,
) -> Result<HttpResponse, ApiError> {
    let auth = login_required(&req, auth)?;
    let form = form.into_inner();
    let fields = match form.clone().clean() {
        Ok(f) => f,
        Err(errors) => return Ok(FormPage::rejected(form, errors).invalid()),
    };
    let post = blog::create_post(data.repo.as_ref(), auth.user_id(), fields).await?;
    Ok(redirect(detail_url(post.id)))
}

pub async fn post_update_form(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let auth = login_required(&req, auth)?;
    let post = blog::owned_post(data.repo.as_ref(), auth.user_id(), path.into_inner(), Action::Edit).await?;
    Ok(FormPage::blank(PostForm::from_fields(&post_fields_of(&post))).for_post(post.id).ok())
}

pub async fn post_update(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    form: web::Form<PostForm>,
) -> Result<HttpResponse, ApiError> {
    let auth = login_required(&req, auth)?;
    let id = path.into_inner();
    blog::owned_post(data.repo.as_ref(), auth.user_id(), id, Action::Edit).await?;
    let form = form.into_inner();
    let fields = match form.clone().clean() {
        Ok(f) => f,
        Err(errors) => return Ok(FormPage::rejected(form, errors).for_post(id).invalid()),
    };
    let post = blog::update_post(data.repo.as_ref(), auth.user_id(), id, fields).await?;
    Ok(redirect(detail_url(post.id)))
}

pub async fn post_delete_confirm(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let auth = login_required(&req, auth)?;
    let post = blog::owned_post(data.repo.as_ref(), auth.user_id(), path.into_inner(), Action::Delete).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "post": PostView::from(post) })))
}

pub async fn post_delete(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let auth = login_required(&req, auth)?;
    blog::delete_post(data.repo.as_ref(), auth.user_id(), path.into_inner()).await?;
    Ok(redirect("/"))
}

pub async fn post_like(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let auth = login_required(&req, auth)?;
    let post = blog::toggle_post_like(data.repo.as_ref(), auth.user_id(), path.into_inner()).await?;
    Ok(back_or(&req, detail_url(post.id)))
}

// ---------------- comments ----------------------------------------

pub async fn comment_create_form(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    login_required(&req, auth)?;
    let post = data.repo.get_post(path.into_inner()).await?;
    Ok(FormPage::blank(CommentForm::default()).for_post(post.id).ok())
}

pub async fn comment_create(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    form: web::Form<CommentForm>,
) -> Result<HttpResponse, ApiError> {
    let auth = login_required(&req, auth)?;
    let post = data.repo.get_post(path.into_inner()).await?;
    let form = form.into_inner();
    let content = match form.clone().clean() {
        Ok(c) => c,
        Err(errors) => return Ok(FormPage::rejected(form, errors).for_post(post.id).invalid()),
    };
    blog::add_comment(data.repo.as_ref(), auth.user_id(), post.id, content).await?;
    Ok(redirect(detail_url(post.id)))
}

pub async fn comment_update_form(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let auth = login_required(&req, auth)?;
    let comment = blog::owned_comment(data.repo.as_ref(), auth.user_id(), path.into_inner(), Action::Edit).await?;
    Ok(FormPage::blank(CommentForm { content: comment.content }).for_post(comment.post).ok())
}

pub async fn comment_update(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    form: web::Form<CommentForm>,
) -> Result<HttpResponse, ApiError> {
    let auth = login_required(&req, auth)?;
    let id = path.into_inner();
    let existing = blog::owned_comment(data.repo.as_ref(), auth.user_id(), id, Action::Edit).await?;
    let form = form.into_inner();
    let content = match form.clone().clean() {
        Ok(c) => c,
        Err(errors) => return Ok(FormPage::rejected(form, errors).for_post(existing.post).invalid()),
    };
    let comment = blog::update_comment(data.repo.as_ref(), auth.user_id(), id, content).await?;
    Ok(redirect(detail_url(comment.post)))
}

pub async fn comment_delete_confirm(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let auth = login_required(&req, auth)?;
    let comment = blog::owned_comment(data.repo.as_ref(), auth.user_id(), path.into_inner(), Action::Delete).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "comment": CommentView::from(comment) })))
}

pub async fn comment_delete(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let auth = login_required(&req, auth)?;
    let post = blog::delete_comment(data.repo.as_ref(), auth.user_id(), path.into_inner()).await?;
    Ok(redirect(detail_url(post)))
}

pub async fn comment_like(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let auth = login_required(&req, auth)?;
    let comment = blog::toggle_comment_like(data.repo.as_ref(), auth.user_id(), path.into_inner()).await?;
    Ok(back_or(&req, detail_url(comment.post)))
}

// ---------------- accounts ----------------------------------------

pub async fn signup_form() -> HttpResponse {
    FormPage::blank(SignupForm::default()).ok()
}

pub async fn signup(data: web::Data<AppState>, form: web::Form<SignupForm>) -> Result<HttpResponse, ApiError> {
    let form = form.into_inner();
    let cleaned = match form.clone().clean() {
        Ok(s) => s,
        Err(errors) => return Ok(FormPage::rejected(form, errors).invalid()),
    };
    let password_hash = auth::hash_password(&cleaned.password).map_err(|e| {
        tracing::error!("signup hashing failed: {e}");
        ApiError::Internal
    })?;
    let new = NewUser { username: cleaned.username, email: cleaned.email, password_hash };
    match data.repo.create_user(new).await {
        Ok(user) => {
            info!(user_id = user.id, "account created");
            Ok(redirect("/login/"))
        }
        Err(RepoError::Conflict) => {
            let errors = FieldErrors::single("username", "A user with that username already exists.");
            Ok(FormPage::rejected(form, errors).invalid())
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Serialize)]
struct LoginPage {
    form: LoginForm,
    errors: FieldErrors,
    next: String,
}

pub async fn login_form(query: web::Query<NextParam>) -> HttpResponse {
    HttpResponse::Ok().json(LoginPage {
        form: LoginForm::default(),
        errors: FieldErrors::default(),
        next: safe_next(query.next.as_deref()).to_string(),
    })
}

pub async fn login(
    data: web::Data<AppState>,
    query: web::Query<NextParam>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, ApiError> {
    let mut form = form.into_inner();
    let posted_next = form.next.take().filter(|n| !n.is_empty());
    let next = safe_next(posted_next.as_deref().or(query.next.as_deref())).to_string();
    let mut errors = FieldErrors::default();
    if form.username.trim().is_empty() { errors.add("username", REQUIRED); }
    if form.password.is_empty() { errors.add("password", REQUIRED); }
    if errors.is_empty() {
        match data.repo.find_credentials(form.username.trim()).await {
            Ok((user, hash)) => match auth::verify_password(&form.password, &hash) {
                Ok(true) => {
                    let token = auth::create_jwt(&data.config, &user).map_err(|e| {
                        tracing::error!("token issue failed: {e}");
                        ApiError::Internal
                    })?;
                    info!(user_id = user.id, "login");
                    return Ok(HttpResponse::Found()
                        .insert_header((header::LOCATION, next))
                        .cookie(auth::session_cookie(&data.config, token))
                        .finish());
                }
                Ok(false) => {}
                Err(e) => warn!(user_id = user.id, "stored password hash unreadable: {e}"),
            },
            Err(RepoError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }
        errors.add(
            NON_FIELD,
            "Please enter a correct username and password. Note that both fields may be case-sensitive.",
        );
    }
    Ok(HttpResponse::UnprocessableEntity().json(LoginPage { form, errors, next }))
}

pub async fn logout() -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, "/"))
        .cookie(auth::removal_cookie())
        .finish()
}

async fn profile_page(data: &AppState, user: User, form: Option<ProfileForm>, errors: FieldErrors) -> Result<ProfilePage, ApiError> {
    let posts = data.repo.list_posts_by_author(user.id).await?;
    let comments = data.repo.list_comments_by_author(user.id).await?;
    let form = form.unwrap_or_else(|| ProfileForm { username: user.username.clone(), email: user.email.clone() });
    Ok(ProfilePage {
        user,
        posts: posts.into_iter().map(PostView::from).collect(),
        comments: comments.into_iter().map(CommentView::from).collect(),
        form,
        errors,
    })
}

pub async fn profile(req: HttpRequest, auth: Option<Auth>, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let auth = login_required(&req, auth)?;
    let user = data.repo.get_user(auth.user_id()).await?;
    let page = profile_page(&data, user, None, FieldErrors::default()).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn profile_update(
    req: HttpRequest,
    auth: Option<Auth>,
    data: web::Data<AppState>,
    form: web::Form<ProfileForm>,
) -> Result<HttpResponse, ApiError> {
    let auth = login_required(&req, auth)?;
    let user = data.repo.get_user(auth.user_id()).await?;
    let form = form.into_inner();
    let upd = match form.clone().clean() {
        Ok(u) => u,
        Err(errors) => {
            let page = profile_page(&data, user, Some(form), errors).await?;
            return Ok(HttpResponse::UnprocessableEntity().json(page));
        }
    };
    match data.repo.update_user(user.id, upd).await {
        Ok(updated) => {
            // the session carries the username, so reissue it
            let token = auth::create_jwt(&data.config, &updated).map_err(|e| {
                tracing::error!("token issue failed: {e}");
                ApiError::Internal
            })?;
            Ok(HttpResponse::Found()
                .insert_header((header::LOCATION, "/profile/"))
                .cookie(auth::session_cookie(&data.config, token))
                .finish())
        }
        Err(RepoError::Conflict) => {
            let errors = FieldErrors::single("username", "A user with that username already exists.");
            let page = profile_page(&data, user, Some(form), errors).await?;
            Ok(HttpResponse::UnprocessableEntity().json(page))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_must_stay_on_site() {
        assert_eq!(safe_next(Some("/post/3/")), "/post/3/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
