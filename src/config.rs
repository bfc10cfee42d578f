use std::path::PathBuf;

use anyhow::{bail, Context};

/// Shortest accepted HS256 signing secret.
pub const MIN_SECRET_LEN: usize = 32;

/// Accepted `BLOG_SESSION_TTL_HOURS`: one hour up to a year.
pub const SESSION_TTL_HOURS: std::ops::RangeInclusive<i64> = 1..=24 * 365;

/// Runtime settings gathered from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind: String,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub secure_cookies: bool,
    pub data_dir: PathBuf,
    pub database_url: Option<String>,
    pub frontend_url: Option<String>,
    pub enable_hsts: bool,
    /// When set, the REST resources apply the same ownership rules as the web forms.
    pub api_enforce_ownership: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".into(),
            jwt_secret: String::new(),
            session_ttl_hours: 24,
            secure_cookies: false,
            data_dir: PathBuf::from("data"),
            database_url: None,
            frontend_url: None,
            enable_hsts: false,
            api_enforce_ownership: false,
        }
    }
}

fn flag_env(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            bail!("JWT_SECRET must be at least {MIN_SECRET_LEN} characters long");
        }
        let session_ttl_hours = match std::env::var("BLOG_SESSION_TTL_HOURS") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("BLOG_SESSION_TTL_HOURS is not a number: {v}"))?,
            Err(_) => defaults.session_ttl_hours,
        };
        if !SESSION_TTL_HOURS.contains(&session_ttl_hours) {
            bail!(
                "BLOG_SESSION_TTL_HOURS must be between {} and {}, got {session_ttl_hours}",
                SESSION_TTL_HOURS.start(),
                SESSION_TTL_HOURS.end()
            );
        }
        Ok(Self {
            bind: std::env::var("BLOG_BIND").unwrap_or(defaults.bind),
            jwt_secret,
            session_ttl_hours,
            secure_cookies: flag_env("BLOG_SECURE_COOKIES"),
            data_dir: std::env::var("BLOG_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            database_url: std::env::var("DATABASE_URL").ok(),
            frontend_url: std::env::var("FRONTEND_URL").ok(),
            enable_hsts: flag_env("ENABLE_HSTS"),
            api_enforce_ownership: flag_env("BLOG_API_ENFORCE_OWNERSHIP"),
        })
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("state.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn short_secret_is_rejected() {
        std::env::set_var("JWT_SECRET", "too-short");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("at least"));
        std::env::remove_var("JWT_SECRET");
    }

    #[test]
    #[serial]
    fn flags_and_defaults() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        std::env::set_var("BLOG_API_ENFORCE_OWNERSHIP", "TRUE");
        std::env::remove_var("BLOG_DATA_DIR");
        std::env::remove_var("BLOG_SESSION_TTL_HOURS");
        let cfg = Config::from_env().unwrap();
        assert!(cfg.api_enforce_ownership);
        assert_eq!(cfg.snapshot_path(), PathBuf::from("data/state.json"));
        assert_eq!(cfg.session_ttl_hours, 24);
        std::env::remove_var("BLOG_API_ENFORCE_OWNERSHIP");
        std::env::remove_var("JWT_SECRET");
    }

    #[test]
    #[serial]
    fn session_ttl_must_be_in_range() {
        std::env::set_var("JWT_SECRET", "0123456789abcdef0123456789abcdef");
        for bad in ["0", "-5", "9223372036854775807"] {
            std::env::set_var("BLOG_SESSION_TTL_HOURS", bad);
            let err = Config::from_env().unwrap_err();
            assert!(err.to_string().contains("BLOG_SESSION_TTL_HOURS"), "{bad}");
        }
        std::env::set_var("BLOG_SESSION_TTL_HOURS", "48");
        assert_eq!(Config::from_env().unwrap().session_ttl_hours, 48);
        std::env::remove_var("BLOG_SESSION_TTL_HOURS");
        std::env::remove_var("JWT_SECRET");
    }
}
