//! Stateless password-reset tokens.
//!
//! A token is a JWT of kind `reset` carrying the user id and its own expiry,
//! signed with the process-wide secret. Nothing is stored server side.

use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::jwt::{JwtKeys, TokenKind};
use crate::state::AppState;

pub const DEFAULT_RESET_TTL_SECS: i64 = 1800;

#[derive(Clone)]
pub struct ResetTokens {
    keys: JwtKeys,
    ttl_secs: i64,
}

impl FromRef<AppState> for ResetTokens {
    fn from_ref(state: &AppState) -> Self {
        ResetTokens::new(JwtKeys::from_ref(state), state.config.jwt.reset_ttl_secs)
    }
}

impl ResetTokens {
    pub fn new(keys: JwtKeys, ttl_secs: i64) -> Self {
        Self { keys, ttl_secs }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn issue(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.issue_with_ttl(user_id, self.ttl_secs)
    }

    pub fn issue_with_ttl(&self, user_id: Uuid, ttl_secs: i64) -> anyhow::Result<String> {
        self.issue_at(user_id, ttl_secs, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        user_id: Uuid,
        ttl_secs: i64,
        now: OffsetDateTime,
    ) -> anyhow::Result<String> {
        self.keys.sign_at(user_id, TokenKind::Reset, ttl_secs, now)
    }

    /// Returns the embedded user id, or `None` for any failure.
    pub fn verify(&self, token: &str) -> Option<Uuid> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Same as [`verify`](Self::verify) with an explicit clock. A token is
    /// still valid at exactly `iat + ttl`.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Option<Uuid> {
        let claims = match self.keys.verify_signature(token) {
            Ok(c) => c,
            Err(_) => {
                debug!("reset token rejected");
                return None;
            }
        };
        if claims.kind != TokenKind::Reset || now.unix_timestamp() > claims.exp {
            debug!("reset token rejected");
            return None;
        }
        Some(claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use time::Duration;

    fn tokens_with_secret(secret: &str) -> ResetTokens {
        let mut cfg = AppConfig::for_tests().jwt;
        cfg.secret = secret.into();
        ResetTokens::new(JwtKeys::new(&cfg), DEFAULT_RESET_TTL_SECS)
    }

    #[test]
    fn fresh_token_verifies_to_its_user() {
        let tokens = tokens_with_secret("s3cret");
        let user_id = Uuid::new_v4();
        let token = tokens.issue(user_id).unwrap();
        assert_eq!(tokens.verify(&token), Some(user_id));
    }

    #[test]
    fn token_expires_after_ttl() {
        let tokens = tokens_with_secret("s3cret");
        let user_id = Uuid::new_v4();
        let issued = OffsetDateTime::now_utc();
        let token = tokens.issue_at(user_id, 1, issued).unwrap();

        assert_eq!(tokens.verify_at(&token, issued), Some(user_id));
        assert_eq!(tokens.verify_at(&token, issued + Duration::seconds(1)), Some(user_id));
        assert_eq!(tokens.verify_at(&token, issued + Duration::seconds(2)), None);
    }

    #[test]
    fn default_window_is_thirty_minutes() {
        let tokens = tokens_with_secret("s3cret");
        let user_id = Uuid::new_v4();
        let issued = OffsetDateTime::now_utc();
        let token = tokens
            .issue_at(user_id, tokens.ttl_secs(), issued)
            .unwrap();
        assert_eq!(
            tokens.verify_at(&token, issued + Duration::seconds(1800)),
            Some(user_id)
        );
        assert_eq!(tokens.verify_at(&token, issued + Duration::seconds(1801)), None);
    }

    #[test]
    fn other_secret_never_verifies() {
        let ours = tokens_with_secret("ours");
        let theirs = tokens_with_secret("theirs");
        let issued = OffsetDateTime::now_utc();
        let token = theirs.issue_at(Uuid::new_v4(), 3600, issued).unwrap();
        assert_eq!(ours.verify_at(&token, issued), None);
        assert_eq!(ours.verify_at(&token, issued - Duration::hours(1)), None);
    }

    #[test]
    fn session_tokens_are_not_reset_tokens() {
        let mut cfg = AppConfig::for_tests().jwt;
        cfg.secret = "shared".into();
        let keys = JwtKeys::new(&cfg);
        let tokens = ResetTokens::new(keys.clone(), DEFAULT_RESET_TTL_SECS);
        let access = keys.sign_access(Uuid::new_v4()).unwrap();
        let refresh = keys.sign_refresh(Uuid::new_v4()).unwrap();
        assert_eq!(tokens.verify(&access), None);
        assert_eq!(tokens.verify(&refresh), None);
    }

    #[test]
    fn garbage_is_rejected_quietly() {
        let tokens = tokens_with_secret("s3cret");
        assert_eq!(tokens.verify(""), None);
        assert_eq!(tokens.verify("not.a.jwt"), None);
        let mut token = tokens.issue(Uuid::new_v4()).unwrap();
        token.push('x');
        assert_eq!(tokens.verify(&token), None);
    }
}
