use std::sync::Arc;

use crate::auth::repo::CredentialStore;
use crate::config::AppConfig;
use crate::db::{self, PgStore};
use crate::mailer::{LogMailer, Mailer};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let pool = db::connect(&config.database_url).await?;
        let store = PgStore::new(pool);
        if let Err(e) = store.migrate().await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        let show_body = std::env::var("MAIL_LOG_BODY")
            .map(|v| v == "true")
            .unwrap_or(false);

        Ok(Self {
            store: Arc::new(store),
            config,
            mailer: Arc::new(LogMailer::new(show_body)),
        })
    }

    pub fn from_parts(
        store: Arc<dyn CredentialStore>,
        config: Arc<AppConfig>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            store,
            config,
            mailer,
        }
    }
}

/// State wired to in-memory collaborators, with handles kept for assertions.
#[cfg(test)]
pub struct FakeState {
    pub state: AppState,
    pub store: Arc<crate::auth::memory::MemoryStore>,
    pub mailer: crate::mailer::testing::RecordingMailer,
}

#[cfg(test)]
impl AppState {
    pub fn fake() -> FakeState {
        Self::fake_with(AppConfig::for_tests(), Default::default())
    }

    pub fn fake_with(
        config: AppConfig,
        mailer: crate::mailer::testing::RecordingMailer,
    ) -> FakeState {
        let store = Arc::new(crate::auth::memory::MemoryStore::seeded());
        let state = Self::from_parts(store.clone(), Arc::new(config), Arc::new(mailer.clone()));
        FakeState {
            state,
            store,
            mailer,
        }
    }
}
