#![cfg(feature = "inmem-store")]

use actix_web::{cookie::Cookie, dev::Payload, test, web, FromRequest};
use blog::{
    auth::{create_jwt, decode_jwt, Auth, SESSION_COOKIE},
    models::User,
    repo::inmem::InMemRepo,
    AppState, Config,
};
use std::sync::Arc;

const SECRET: &str = "test-secret-must-be-32-bytes-long!!";

fn cfg() -> Config {
    Config { jwt_secret: SECRET.into(), ..Config::default() }
}

fn state() -> web::Data<AppState> {
    web::Data::new(AppState { repo: Arc::new(InMemRepo::ephemeral()), config: Arc::new(cfg()) })
}

fn user(id: i64, name: &str) -> User {
    User { id, username: name.into(), email: None, date_joined: chrono::Utc::now() }
}

#[actix_web::test]
async fn jwt_roundtrip_ok() {
    let token = create_jwt(&cfg(), &user(42, "tester")).expect("token");
    // The Auth extractor is the public way to validate, so use it here.
    let req = test::TestRequest::default()
        .app_data(state())
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_http_request();
    let mut pl = Payload::None;
    let auth = Auth::from_request(&req, &mut pl).await.expect("extract");
    assert_eq!(auth.user_id(), 42);
    assert_eq!(auth.0.username, "tester");
}

#[actix_web::test]
async fn session_cookie_is_accepted() {
    let token = create_jwt(&cfg(), &user(7, "cookie")).unwrap();
    let req = test::TestRequest::default()
        .app_data(state())
        .cookie(Cookie::new(SESSION_COOKIE, token))
        .to_http_request();
    let mut pl = Payload::None;
    let auth = Auth::from_request(&req, &mut pl).await.expect("extract");
    assert_eq!(auth.user_id(), 7);
}

#[actix_web::test]
async fn extractor_rejects_invalid_token() {
    let req = test::TestRequest::default()
        .app_data(state())
        .insert_header(("Authorization", "Bearer notatoken"))
        .to_http_request();
    let mut pl = Payload::None;
    assert!(Auth::from_request(&req, &mut pl).await.is_err());
}

#[actix_web::test]
async fn extractor_rejects_missing_credentials() {
    let req = test::TestRequest::default().app_data(state()).to_http_request();
    let mut pl = Payload::None;
    assert!(Auth::from_request(&req, &mut pl).await.is_err());
    // optional extraction simply yields nothing
    let mut pl = Payload::None;
    assert!(Option::<Auth>::from_request(&req, &mut pl).await.unwrap().is_none());
}

#[actix_web::test]
async fn token_signed_with_other_secret_is_rejected() {
    let other = Config { jwt_secret: "another-secret-that-is-32-bytes-long".into(), ..Config::default() };
    let token = create_jwt(&other, &user(1, "x")).unwrap();
    assert!(decode_jwt(SECRET, &token).is_err());
    assert!(decode_jwt(&other.jwt_secret, &token).is_ok());
}

#[actix_web::test]
async fn expired_token_is_rejected() {
    let stale = Config { session_ttl_hours: -2, ..cfg() };
    let token = create_jwt(&stale, &user(1, "x")).unwrap();
    assert!(decode_jwt(SECRET, &token).is_err());
}
