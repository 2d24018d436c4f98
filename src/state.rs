use std::sync::Arc;

use crate::backend::http::HttpBackend;
use crate::backend::BackendClient;
use crate::config::AppConfig;
use crate::session::SessionStore;

/// Shared handles every domain service works against: the backend boundary,
/// configuration and the session holder. Cheap to clone; the session is
/// passed explicitly rather than held in a global.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn BackendClient>,
    pub config: Arc<AppConfig>,
    pub session: SessionStore,
}

impl AppState {
    /// Wire the real HTTP backend from environment configuration.
    pub fn init() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = Arc::new(AppConfig::from_env()?);
        let session = SessionStore::new();
        let backend =
            Arc::new(HttpBackend::new(config.clone(), session.clone())?) as Arc<dyn BackendClient>;
        Ok(Self {
            backend,
            config,
            session,
        })
    }

    pub fn from_parts(
        backend: Arc<dyn BackendClient>,
        config: Arc<AppConfig>,
        session: SessionStore,
    ) -> Self {
        Self {
            backend,
            config,
            session,
        }
    }

    /// State over an in-memory backend, plus a handle for seeding and
    /// inspecting it.
    #[cfg(test)]
    pub(crate) fn fake() -> (Self, Arc<crate::backend::fake::FakeBackend>) {
        use crate::backend::fake::FakeBackend;

        let config = Arc::new(AppConfig {
            backend_url: "https://fake.backend".into(),
            anon_key: "anon-test-key".into(),
            avatar_bucket: "avatars".into(),
            http_timeout_secs: 5,
        });
        let session = SessionStore::new();
        let fake = Arc::new(FakeBackend::new(session.clone()));
        let state = Self::from_parts(fake.clone(), config, session);
        (state, fake)
    }

    /// Fake state with `email` already signed up and signed in.
    #[cfg(test)]
    pub(crate) async fn fake_signed_in(
        email: &str,
    ) -> (Self, Arc<crate::backend::fake::FakeBackend>) {
        let (state, fake) = Self::fake();
        let session = state
            .backend
            .sign_up(email, "Passw0rd123")
            .await
            .expect("sign up test user");
        state.session.set(session);
        (state, fake)
    }
}
