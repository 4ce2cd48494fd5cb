use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::error::AppError;

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;
    info!("database ready");
    Ok(db)
}

/// Turns unique-constraint violations on `users` into `DuplicateCredential`.
pub(crate) fn map_write_error(e: sqlx::Error, what: &'static str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let message = match db_err.constraint() {
                Some("users_username_key") => {
                    "That username is taken. Please choose a different one"
                }
                Some("users_email_key") => "Email already registered",
                other => {
                    warn!(constraint = ?other, "unexpected unique violation");
                    "Duplicate value"
                }
            };
            return AppError::DuplicateCredential(message.into());
        }
        if db_err.is_foreign_key_violation() {
            return AppError::NotFound("User");
        }
    }
    AppError::Internal(anyhow::Error::new(e).context(what))
}
