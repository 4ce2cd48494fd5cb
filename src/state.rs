use std::sync::Arc;

use tracing::warn;

use crate::auth::repo::{PgUserRepo, UserRepo};
use crate::config::AppConfig;
use crate::mail::{self, Mailer, RecordingMailer};
use crate::memory::MemoryStore;
use crate::posts::repo::{PgPostRepo, PostRepo};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepo>,
    pub posts: Arc<dyn PostRepo>,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let mailer = mail::from_config(config.mail.as_ref())?;

        let users: Arc<dyn UserRepo>;
        let posts: Arc<dyn PostRepo>;
        match &config.database_url {
            Some(url) => {
                let db = crate::db::connect(url).await?;
                users = Arc::new(PgUserRepo::new(db.clone()));
                posts = Arc::new(PgPostRepo::new(db));
            }
            None => {
                warn!("DATABASE_URL not set; using the in-memory store, data will not persist");
                let store = Arc::new(MemoryStore::default());
                users = store.clone();
                posts = store;
            }
        }

        Ok(Self::from_parts(users, posts, config, mailer))
    }

    pub fn from_parts(
        users: Arc<dyn UserRepo>,
        posts: Arc<dyn PostRepo>,
        config: Arc<AppConfig>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            users,
            posts,
            config,
            mailer,
        }
    }

    /// In-memory state with test config. The returned mailer records every message.
    pub fn fake() -> (Self, Arc<RecordingMailer>) {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let state = Self::from_parts(
            store.clone(),
            store,
            Arc::new(AppConfig::for_tests()),
            mailer.clone(),
        );
        (state, mailer)
    }
}
