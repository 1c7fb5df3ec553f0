use url::Url;
use uuid::Uuid;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendConfig {
    Rest {
        base_url: Url,
        api_key: String,
        access_token: Option<String>,
    },
    Postgres {
        database_url: String,
        user_id: Option<Uuid>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub backend: BackendConfig,
    pub demo_mode: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let backend = match var("DASHBOARD_BACKEND").as_deref().unwrap_or("rest") {
            "rest" => {
                let raw_url = var("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
                let api_key =
                    var("SUPABASE_ANON_KEY").ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;
                BackendConfig::Rest {
                    base_url: base_url(&raw_url)?,
                    api_key,
                    access_token: var("SUPABASE_ACCESS_TOKEN"),
                }
            }
            "postgres" => BackendConfig::Postgres {
                database_url: var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
                user_id: var("DASHBOARD_USER_ID")
                    .map(|raw| parse_user_id("DASHBOARD_USER_ID", &raw))
                    .transpose()?,
            },
            other => {
                return Err(ConfigError::Invalid {
                    key: "DASHBOARD_BACKEND",
                    reason: format!("expected rest or postgres, got {other}"),
                })
            }
        };

        let demo_mode = var("DASHBOARD_DEMO_MODE")
            .map(|raw| matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        Ok(Self { backend, demo_mode })
    }
}

pub fn parse_user_id(key: &'static str, raw: &str) -> Result<Uuid, ConfigError> {
    Uuid::parse_str(raw.trim()).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

/// Joined paths must land under the base, so it always ends with `/`.
fn base_url(raw: &str) -> Result<Url, ConfigError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|e| ConfigError::Invalid {
        key: "SUPABASE_URL",
        reason: e.to_string(),
    })
}
