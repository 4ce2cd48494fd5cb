use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        password::{hash_password, verify_password},
        repo::UserRepo,
        repo_types::{NewUser, User},
        reset::ResetTokens,
    },
    error::{AppError, AppResult},
    mail::{self, Mailer, OutgoingMail},
};

pub const USERNAME_MIN: usize = 2;
pub const USERNAME_MAX: usize = 20;
pub const EMAIL_MAX: usize = 120;
pub const PASSWORD_MIN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_username(username: &str) -> AppResult<()> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(AppError::Validation(format!(
            "Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"
        )));
    }
    Ok(())
}

fn validate_email(email: &str) -> AppResult<()> {
    if email.chars().count() > EMAIL_MAX || !is_valid_email(email) {
        return Err(AppError::Validation("Invalid email".into()));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < PASSWORD_MIN {
        return Err(AppError::Validation("Password too short".into()));
    }
    Ok(())
}

/// Creates an account. The password is hashed before anything is stored.
pub async fn register(
    users: &dyn UserRepo,
    username: &str,
    email: &str,
    password: &str,
) -> AppResult<User> {
    let username = username.trim();
    let email = normalize_email(email);
    validate_username(username)?;
    validate_email(&email)?;
    validate_password(password)?;

    if users.find_by_username(username).await?.is_some() {
        warn!(%username, "username already taken");
        return Err(AppError::DuplicateCredential(
            "That username is taken. Please choose a different one".into(),
        ));
    }
    if users.find_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::DuplicateCredential("Email already registered".into()));
    }

    let password_hash = hash_password(password)?;
    let user = users
        .create(NewUser {
            username: username.to_string(),
            email,
            password_hash,
        })
        .await?;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Returns the user only if the email exists and the password matches.
/// Unknown email and wrong password are indistinguishable to the caller.
pub async fn authenticate(
    users: &dyn UserRepo,
    email: &str,
    password: &str,
) -> AppResult<Option<User>> {
    let email = normalize_email(email);
    let Some(user) = users.find_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Ok(None);
    };

    let ok = match verify_password(password, &user.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, user_id = %user.id, "stored password hash unreadable");
            false
        }
    };
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Ok(None);
    }
    Ok(Some(user))
}

/// Changes username and email. Both stay globally unique: a value held by
/// another account is rejected.
pub async fn update_profile(
    users: &dyn UserRepo,
    user_id: Uuid,
    username: &str,
    email: &str,
) -> AppResult<User> {
    let username = username.trim();
    let email = normalize_email(email);
    validate_username(username)?;
    validate_email(&email)?;

    if let Some(other) = users.find_by_username(username).await? {
        if other.id != user_id {
            return Err(AppError::DuplicateCredential(
                "That username is taken. Please choose a different one".into(),
            ));
        }
    }
    if let Some(other) = users.find_by_email(&email).await? {
        if other.id != user_id {
            return Err(AppError::DuplicateCredential("Email already registered".into()));
        }
    }

    let user = users.update_profile(user_id, username, &email).await?;
    info!(user_id = %user.id, "profile updated");
    Ok(user)
}

pub async fn reset_password(
    users: &dyn UserRepo,
    user_id: Uuid,
    new_password: &str,
) -> AppResult<()> {
    validate_password(new_password)?;
    let hash = hash_password(new_password)?;
    users.update_password(user_id, &hash).await?;
    info!(%user_id, "password reset");
    Ok(())
}

/// Resolves a reset token to its user. Every failure, including a user
/// that no longer exists or a store error, comes back as `None`.
pub async fn verify_reset_token(
    users: &dyn UserRepo,
    tokens: &ResetTokens,
    token: &str,
) -> Option<User> {
    let user_id = tokens.verify(token)?;
    match users.find_by_id(user_id).await {
        Ok(user) => user,
        Err(e) => {
            error!(error = %e, %user_id, "reset token user lookup failed");
            None
        }
    }
}

pub fn reset_email(user: &User, token: &str, base_url: &str) -> OutgoingMail {
    let link = format!(
        "{}/auth/reset-password/{}",
        base_url.trim_end_matches('/'),
        token
    );
    OutgoingMail {
        recipient: user.email.clone(),
        subject: "Password Reset Request".into(),
        body: format!(
            "To reset your password, visit the following link:\n{link}\n\n\
             If you did not make this request, simply ignore this email and no changes will be made.\n"
        ),
    }
}

/// Issues a token for `user` and queues the reset mail. Delivery is not awaited.
pub fn send_reset_email(
    mailer: Arc<dyn Mailer>,
    tokens: &ResetTokens,
    base_url: &str,
    user: &User,
) -> AppResult<()> {
    let token = tokens.issue(user.id)?;
    mail::dispatch(mailer, reset_email(user, &token, base_url));
    info!(user_id = %user.id, "password reset mail queued");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtKeys;
    use crate::config::AppConfig;
    use crate::memory::MemoryStore;

    async fn alice(store: &MemoryStore) -> User {
        register(store, "alice", "alice@example.com", "oldpass123")
            .await
            .expect("register alice")
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.d"));
    }

    #[tokio::test]
    async fn register_hashes_and_normalizes() {
        let store = MemoryStore::default();
        let user = register(&store, " bob ", " Bob@Example.COM ", "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(user.username, "bob");
        assert_eq!(user.email, "bob@example.com");
        assert_eq!(user.image_file, "default.jpg");
        assert_ne!(user.password_hash, "hunter2hunter2");
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email_and_keeps_first() {
        let store = MemoryStore::default();
        let first = alice(&store).await;
        let err = register(&store, "alice2", "alice@example.com", "another-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateCredential(_)));

        let again = store.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(again, first);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_username() {
        let store = MemoryStore::default();
        alice(&store).await;
        let err = register(&store, "alice", "other@example.com", "another-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateCredential(_)));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let store = MemoryStore::default();
        for (u, e, p) in [
            ("a", "ok@example.com", "longenough"),
            ("this-name-is-way-too-long", "ok@example.com", "longenough"),
            ("carol", "not-an-email", "longenough"),
            ("carol", "ok@example.com", "short"),
        ] {
            let err = register(&store, u, e, p).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{u} {e} {p}");
        }
    }

    #[tokio::test]
    async fn authenticate_outcomes() {
        let store = MemoryStore::default();
        let user = alice(&store).await;

        let ok = authenticate(&store, "ALICE@example.com", "oldpass123").await.unwrap();
        assert_eq!(ok.map(|u| u.id), Some(user.id));

        let wrong = authenticate(&store, "alice@example.com", "nope-nope").await.unwrap();
        let unknown = authenticate(&store, "nobody@example.com", "oldpass123").await.unwrap();
        assert!(wrong.is_none());
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn reset_password_swaps_credentials() {
        let store = MemoryStore::default();
        let user = alice(&store).await;

        reset_password(&store, user.id, "newpass123").await.unwrap();

        let new = authenticate(&store, &user.email, "newpass123").await.unwrap();
        assert_eq!(new.map(|u| u.id), Some(user.id));
        let old = authenticate(&store, &user.email, "oldpass123").await.unwrap();
        assert!(old.is_none());
    }

    #[tokio::test]
    async fn update_profile_keeps_uniqueness() {
        let store = MemoryStore::default();
        let a = alice(&store).await;
        let b = register(&store, "bob", "bob@example.com", "bobspassword")
            .await
            .unwrap();

        let err = update_profile(&store, b.id, "alice", "bob@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateCredential(_)));
        let err = update_profile(&store, b.id, "bob", "alice@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateCredential(_)));

        // Keeping one's own values is fine.
        let same = update_profile(&store, a.id, "alice", "alice@example.com")
            .await
            .unwrap();
        assert_eq!(same.id, a.id);

        let renamed = update_profile(&store, b.id, "robert", "robert@example.com")
            .await
            .unwrap();
        assert_eq!(renamed.username, "robert");
        assert_eq!(renamed.email, "robert@example.com");
    }

    #[tokio::test]
    async fn reset_token_resolves_user() {
        let store = MemoryStore::default();
        let user = alice(&store).await;
        let tokens = ResetTokens::new(JwtKeys::new(&AppConfig::for_tests().jwt), 1800);

        let token = tokens.issue(user.id).unwrap();
        let found = verify_reset_token(&store, &tokens, &token).await;
        assert_eq!(found.map(|u| u.id), Some(user.id));

        let orphan = tokens.issue(Uuid::new_v4()).unwrap();
        assert!(verify_reset_token(&store, &tokens, &orphan).await.is_none());
        assert!(verify_reset_token(&store, &tokens, "garbage").await.is_none());
    }

    #[tokio::test]
    async fn reset_email_carries_a_working_link() {
        let store = MemoryStore::default();
        let user = alice(&store).await;
        let tokens = ResetTokens::new(JwtKeys::new(&AppConfig::for_tests().jwt), 1800);
        let token = tokens.issue(user.id).unwrap();

        let mail = reset_email(&user, &token, "https://blog.example.com/");
        assert_eq!(mail.recipient, "alice@example.com");
        assert_eq!(mail.subject, "Password Reset Request");
        assert!(mail
            .body
            .contains(&format!("https://blog.example.com/auth/reset-password/{token}")));
    }
}
