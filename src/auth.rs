use actix_web::cookie::{Cookie, SameSite};
use actix_web::{dev::Payload, web, Error, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

use crate::config::Config;
use crate::models::{Id, User};
use crate::routes::AppState;

pub const SESSION_COOKIE: &str = "blog_session";

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("password hashing: {0}")]
    Hashing(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, decimal.
    pub sub: String,
    pub username: String,
    pub exp: usize,
}

/// Validate a JWT and return its claims.
pub fn decode_jwt(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Create a session token for a user.
pub fn create_jwt(cfg: &Config, user: &User) -> Result<String, AuthError> {
    let expiration = (chrono::Utc::now() + chrono::Duration::hours(cfg.session_ttl_hours))
        .timestamp()
        .max(0) as usize;
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        exp: expiration,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
    )?)
}

/// Extractor yielding the authenticated identity, from a bearer token or the session cookie.
#[derive(Debug, Clone)]
pub struct Auth(pub Claims);

impl Auth {
    pub fn user_id(&self) -> Id {
        // sub is only ever minted from an Id; an unparsable one fails extraction
        self.0.sub.parse().unwrap_or_default()
    }
}

impl FromRequest for Auth {
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            tracing::error!("Auth extractor used without AppState");
            return ready(Err(actix_web::error::ErrorInternalServerError("misconfigured")));
        };
        let token = match BearerAuth::from_request(req, pl).into_inner() {
            Ok(bearer) => Some(bearer.token().to_string()),
            Err(_) => req.cookie(SESSION_COOKIE).map(|c| c.value().to_string()),
        };
        let Some(token) = token else {
            return ready(Err(actix_web::error::ErrorUnauthorized("Authorization required")));
        };
        match decode_jwt(&state.config.jwt_secret, &token) {
            Ok(claims) if claims.sub.parse::<Id>().is_ok() => ready(Ok(Auth(claims))),
            Ok(_) | Err(_) => {
                tracing::debug!("rejected session token");
                ready(Err(actix_web::error::ErrorUnauthorized("Invalid token")))
            }
        }
    }
}

pub fn session_cookie(cfg: &Config, token: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(cfg.secure_cookies)
        .same_site(SameSite::Lax)
        .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut c = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    c.make_removal();
    c
}

/// Argon2id PHC string with a random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("correct-horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct-horse", &hash).unwrap());
        assert!(!verify_password("battery-staple", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }
}
