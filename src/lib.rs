pub mod auth;
pub mod blog;
pub mod config;
pub mod error;
pub mod models;
pub mod openapi;
pub mod pages;
pub mod repo;
pub mod routes;
pub mod search;
pub mod security;
pub mod validate;

// Re-export commonly used items for tests / external users
pub use config::Config;
pub use routes::{config, AppState};
pub use security::SecurityHeaders;
