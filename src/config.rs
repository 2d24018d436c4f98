use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Base URL of the hosted backend, e.g. `https://project.example.co`.
    pub backend_url: String,
    /// Publishable API key sent with every request.
    pub anon_key: String,
    pub avatar_bucket: String,
    /// Per-request timeout; the only timeout the client applies.
    pub http_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend_url = std::env::var("BACKEND_URL")?
            .trim_end_matches('/')
            .to_string();
        let anon_key = std::env::var("BACKEND_ANON_KEY")?;
        let avatar_bucket =
            std::env::var("AVATAR_BUCKET").unwrap_or_else(|_| "avatars".into());
        let http_timeout_secs = std::env::var("BACKEND_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);
        Ok(Self {
            backend_url,
            anon_key,
            avatar_bucket,
            http_timeout_secs,
        })
    }
}
