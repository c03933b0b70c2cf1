use anyhow::Context;
use serde::{Deserialize, de::DeserializeOwned};

/// The env vars consulted when building the detail-lookup transport.
#[derive(Debug, Default, Deserialize)]
pub struct TransportConfig {
    /// Routes traffic through a proxy (e.g. mitmproxy) and relaxes
    /// certificate validation so the proxy can intercept HTTPS.
    pub http_proxy: Option<String>,
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config =
            envy::from_env::<Self>().context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}
