#![cfg(feature = "inmem-store")]

use actix_web::{test, web, App};
use blog::{auth::create_jwt, config, models::{NewUser, User}, AppState, Config, SecurityHeaders};
use blog::repo::{inmem::InMemRepo, UserRepo};
use serde_json::{json, Value};
use std::sync::Arc;

fn cfg(enforce: bool) -> Config {
    Config {
        jwt_secret: "test-secret-must-be-32-bytes-long!!".into(),
        api_enforce_ownership: enforce,
        ..Config::default()
    }
}

async fn user(r: &InMemRepo, name: &str) -> User {
    r.create_user(NewUser { username: name.into(), email: None, password_hash: "x".into() })
        .await
        .unwrap()
}

fn bearer(cfg: &Config, u: &User) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", create_jwt(cfg, u).unwrap()))
}

macro_rules! app {
    ($repo:expr, $cfg:expr) => {
        test::init_service(
            App::new()
                .wrap(SecurityHeaders::default())
                .app_data(web::Data::new(AppState { repo: Arc::new($repo.clone()), config: Arc::new($cfg.clone()) }))
                .configure(config),
        )
        .await
    };
}

#[actix_web::test]
async fn test_post_and_comment_flow_routes() {
    let repo = InMemRepo::ephemeral();
    let alice = user(&repo, "alice").await;
    let bob = user(&repo, "bob").await;
    let app = app!(repo, cfg(false));

    // list posts empty
    let req = test::TestRequest::get().uri("/api/posts/").to_request();
    let v: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(v.as_array().unwrap().len(), 0);

    // create post
    let req = test::TestRequest::post()
        .uri("/api/posts/")
        .set_json(json!({"author": alice.id, "title": "Hello", "content": "World", "category": "tech"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let post: Value = test::read_body_json(resp).await;
    let pid = post["id"].as_i64().unwrap();
    assert_eq!(post["author"], alice.id);
    assert_eq!(post["total_likes"], 0);
    assert_eq!(post["likes"], json!([]));

    // fetch it
    let req = test::TestRequest::get().uri(&format!("/api/posts/{pid}/")).to_request();
    let got: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(got["title"], "Hello");

    // full replace
    let req = test::TestRequest::put()
        .uri(&format!("/api/posts/{pid}/"))
        .set_json(json!({"title": "Hello again", "content": "Still here"}))
        .to_request();
    let replaced: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(replaced["title"], "Hello again");
    assert_eq!(replaced["category"], Value::Null);
    assert_eq!(replaced["author"], alice.id);

    // partial update keeps other fields
    let req = test::TestRequest::patch()
        .uri(&format!("/api/posts/{pid}/"))
        .set_json(json!({"category": "news"}))
        .to_request();
    let patched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(patched["title"], "Hello again");
    assert_eq!(patched["category"], "news");

    // explicit null clears a nullable field, absent keys are left alone
    let req = test::TestRequest::patch()
        .uri(&format!("/api/posts/{pid}/"))
        .set_json(json!({"category": null}))
        .to_request();
    let cleared: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(cleared["category"], Value::Null);
    assert_eq!(cleared["title"], "Hello again");

    // comment on it
    let req = test::TestRequest::post()
        .uri("/api/comments/")
        .set_json(json!({"post": pid, "author": bob.id, "content": "Nice"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let comment: Value = test::read_body_json(resp).await;
    let cid = comment["id"].as_i64().unwrap();
    assert_eq!(comment["post"], pid);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/comments/{cid}/"))
        .set_json(json!({"content": "Very nice"}))
        .to_request();
    let edited: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(edited["content"], "Very nice");

    let req = test::TestRequest::get().uri("/api/comments/").to_request();
    let all: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    // deleting the post removes the comment too
    let req = test::TestRequest::delete().uri(&format!("/api/posts/{pid}/")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);
    let req = test::TestRequest::get().uri(&format!("/api/comments/{cid}/")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
    let req = test::TestRequest::get().uri(&format!("/api/posts/{pid}/")).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn test_invalid_payloads() {
    let repo = InMemRepo::ephemeral();
    let alice = user(&repo, "alice").await;
    let app = app!(repo, cfg(false));

    // blank title and an over-long category
    let req = test::TestRequest::post()
        .uri("/api/posts/")
        .set_json(json!({"author": alice.id, "title": " ", "content": "x", "category": "c".repeat(101)}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 422);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "validation failed");
    assert_eq!(body["fields"]["title"][0], "This field is required.");
    assert!(body["fields"]["category"].is_array());
    assert!(body["fields"].get("content").is_none());

    // the length limit applies to the trimmed title
    let req = test::TestRequest::post()
        .uri("/api/posts/")
        .set_json(json!({"author": alice.id, "title": format!("{} ", "t".repeat(200)), "content": "x"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["title"].as_str().unwrap().len(), 200);

    // unknown author
    let req = test::TestRequest::post()
        .uri("/api/posts/")
        .set_json(json!({"author": 999, "title": "t", "content": "c"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // missing author
    let req = test::TestRequest::post()
        .uri("/api/posts/")
        .set_json(json!({"title": "t", "content": "c"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // comment on a missing post
    let req = test::TestRequest::post()
        .uri("/api/comments/")
        .set_json(json!({"post": 999, "author": alice.id, "content": "hi"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    // blank comment
    let req = test::TestRequest::post()
        .uri("/api/comments/")
        .set_json(json!({"post": 999, "author": alice.id, "content": ""}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 422);

    let req = test::TestRequest::put()
        .uri("/api/posts/999/")
        .set_json(json!({"title": "t", "content": "c"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn test_enforced_ownership() {
    let cfg = cfg(true);
    let repo = InMemRepo::ephemeral();
    let alice = user(&repo, "alice").await;
    let bob = user(&repo, "bob").await;
    let app = app!(repo, cfg);

    // anonymous writes are refused, reads are not
    let req = test::TestRequest::post()
        .uri("/api/posts/")
        .set_json(json!({"title": "t", "content": "c"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);
    let req = test::TestRequest::get().uri("/api/posts/").to_request();
    assert!(test::call_service(&app, req).await.status().is_success());

    // the token decides the author, whatever the body says
    let req = test::TestRequest::post()
        .uri("/api/posts/")
        .insert_header(bearer(&cfg, &alice))
        .set_json(json!({"author": bob.id, "title": "Mine", "content": "c"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let post: Value = test::read_body_json(resp).await;
    assert_eq!(post["author"], alice.id);
    let pid = post["id"].as_i64().unwrap();

    // bob may not touch it
    let req = test::TestRequest::put()
        .uri(&format!("/api/posts/{pid}/"))
        .insert_header(bearer(&cfg, &bob))
        .set_json(json!({"title": "Hijacked", "content": "c"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "You are not allowed to edit this post.");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/posts/{pid}/"))
        .insert_header(bearer(&cfg, &bob))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    // identity and ownership are settled before the body is validated
    let invalid = json!({"title": "", "content": ""});
    let req = test::TestRequest::put()
        .uri(&format!("/api/posts/{pid}/"))
        .set_json(&invalid)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 401);
    let req = test::TestRequest::put()
        .uri(&format!("/api/posts/{pid}/"))
        .insert_header(bearer(&cfg, &bob))
        .set_json(&invalid)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);
    let req = test::TestRequest::patch()
        .uri(&format!("/api/posts/{pid}/"))
        .insert_header(bearer(&cfg, &bob))
        .set_json(json!({"title": ""}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);
    let req = test::TestRequest::put()
        .uri(&format!("/api/posts/{pid}/"))
        .insert_header(bearer(&cfg, &alice))
        .set_json(&invalid)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 422);

    // bob comments, alice cannot delete his comment
    let req = test::TestRequest::post()
        .uri("/api/comments/")
        .insert_header(bearer(&cfg, &bob))
        .set_json(json!({"post": pid, "content": "hello"}))
        .to_request();
    let comment: Value = test::call_and_read_body_json(&app, req).await;
    let cid = comment["id"].as_i64().unwrap();
    assert_eq!(comment["author"], bob.id);
    let req = test::TestRequest::delete()
        .uri(&format!("/api/comments/{cid}/"))
        .insert_header(bearer(&cfg, &alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);
    let req = test::TestRequest::put()
        .uri(&format!("/api/comments/{cid}/"))
        .insert_header(bearer(&cfg, &alice))
        .set_json(json!({"content": ""}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    // the author can
    let req = test::TestRequest::delete()
        .uri(&format!("/api/posts/{pid}/"))
        .insert_header(bearer(&cfg, &alice))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 204);
}
