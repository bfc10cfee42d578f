use crate::models::{Comment, CommentView, Post, PostView, User};
use crate::validate::{CommentForm, NewCommentPayload, NewPostPayload, PostForm, PostPatch};
use utoipa::OpenApi;

/// REST surface only; the browser form routes are not part of the document.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::list_posts,
        crate::routes::create_post,
        crate::routes::get_post,
        crate::routes::replace_post,
        crate::routes::patch_post,
        crate::routes::delete_post,
        crate::routes::list_comments,
        crate::routes::create_comment,
        crate::routes::get_comment,
        crate::routes::replace_comment,
        crate::routes::patch_comment,
        crate::routes::delete_comment,
    ),
    components(schemas(
        User, Post, PostView, Comment, CommentView,
        PostForm, PostPatch, NewPostPayload, CommentForm, NewCommentPayload,
        crate::routes::CommentPatch
    )),
    tags(
        (name = "posts", description = "Post operations"),
        (name = "comments", description = "Comment operations"),
    )
)]
pub struct ApiDoc;
