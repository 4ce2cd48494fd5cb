use serde::Deserialize;

use crate::auth::reset::DEFAULT_RESET_TTL_SECS;

pub const MAX_RESET_TTL_SECS: i64 = 60 * 60 * 24 * 7;
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;
pub const MAX_POSTS_PER_PAGE: i64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
    /// Lifetime of password-reset tokens. Signed with the same `secret`.
    pub reset_ttl_secs: i64,
}

/// SMTP relay credentials. When absent, outgoing mail is only logged.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub mail: Option<MailConfig>,
    /// Used to build absolute links in outgoing mail.
    pub base_url: String,
    pub posts_per_page: i64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok();
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "quillboard".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "quillboard-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
            reset_ttl_secs: env_or("RESET_TOKEN_TTL_SECS", DEFAULT_RESET_TTL_SECS),
        };

        let mail = match std::env::var("SMTP_HOST") {
            Ok(host) => Some(MailConfig {
                host,
                port: env_or("SMTP_PORT", 587),
                username: std::env::var("SMTP_USERNAME")?,
                password: std::env::var("SMTP_PASSWORD")?,
                from: std::env::var("MAIL_FROM")
                    .unwrap_or_else(|_| "noreply@quillboard.local".into()),
            }),
            Err(_) => None,
        };

        let cfg = Self {
            database_url,
            jwt,
            mail,
            base_url: std::env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            posts_per_page: env_or("POSTS_PER_PAGE", 3),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects lifetimes and page sizes that would break token signing or listing.
    pub fn validate(&self) -> anyhow::Result<()> {
        let jwt = &self.jwt;
        if !(1..=MAX_RESET_TTL_SECS).contains(&jwt.reset_ttl_secs) {
            anyhow::bail!("RESET_TOKEN_TTL_SECS must be between 1 and {MAX_RESET_TTL_SECS}");
        }
        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&jwt.ttl_minutes) {
            anyhow::bail!("JWT_TTL_MINUTES must be between 1 and {MAX_TOKEN_TTL_MINUTES}");
        }
        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&jwt.refresh_ttl_minutes) {
            anyhow::bail!("JWT_REFRESH_TTL_MINUTES must be between 1 and {MAX_TOKEN_TTL_MINUTES}");
        }
        if !(1..=MAX_POSTS_PER_PAGE).contains(&self.posts_per_page) {
            anyhow::bail!("POSTS_PER_PAGE must be between 1 and {MAX_POSTS_PER_PAGE}");
        }
        Ok(())
    }

    /// Config used by tests and `AppState::fake`.
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
                reset_ttl_secs: DEFAULT_RESET_TTL_SECS,
            },
            mail: None,
            base_url: "http://localhost:8080".into(),
            posts_per_page: 3,
        }
    }
}
