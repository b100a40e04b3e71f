use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Startup-time configuration failures. These never surface per request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub supabase: SupabaseConfig,
    pub metadata: MetadataConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Hosted backend endpoints and credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    /// Server-only elevated credential. Never sent to clients.
    #[serde(skip_serializing)]
    pub service_role_key: String,
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &self.anon_key)
            .field("service_role_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    pub base_url: String,
    pub app_name: String,
    pub app_version: String,
    pub contact: String,
    pub min_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub permissive_cors: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let required = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let supabase = SupabaseConfig {
            url: parse_base_url("SUPABASE_URL", &required("SUPABASE_URL")?)?,
            anon_key: required("SUPABASE_ANON_KEY")?,
            service_role_key: required("SUPABASE_SERVICE_ROLE_KEY")?,
        };
        let contact = required("MUSICBRAINZ_CONTACT")?;

        let config = match environment {
            Environment::Production => Self::production(supabase, contact),
            Environment::Staging => Self::staging(supabase, contact),
            Environment::Development => Self::development(supabase, contact),
        };

        config.with_overrides(&lookup)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("PORT") {
            self.server.port = v.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                reason: format!("'{}' is not a port number", v),
            })?;
        }

        if let Some(v) = lookup("MUSICBRAINZ_BASE_URL") {
            self.metadata.base_url = parse_base_url("MUSICBRAINZ_BASE_URL", &v)?;
        }
        if let Some(v) = lookup("MUSICBRAINZ_MIN_INTERVAL_MS") {
            self.metadata.min_interval_ms = v.parse().map_err(|_| ConfigError::Invalid {
                name: "MUSICBRAINZ_MIN_INTERVAL_MS",
                reason: format!("'{}' is not a number of milliseconds", v),
            })?;
        }

        if let Some(v) = lookup("CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            self.security.permissive_cors = false;
        }

        Ok(self)
    }

    fn development(supabase: SupabaseConfig, contact: String) -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            supabase,
            metadata: MetadataConfig::musicbrainz(contact),
            security: SecurityConfig {
                permissive_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
        }
    }

    fn staging(supabase: SupabaseConfig, contact: String) -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            supabase,
            metadata: MetadataConfig::musicbrainz(contact),
            security: SecurityConfig {
                permissive_cors: false,
                cors_origins: vec!["https://staging.beesides.app".to_string()],
            },
        }
    }

    fn production(supabase: SupabaseConfig, contact: String) -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            supabase,
            metadata: MetadataConfig::musicbrainz(contact),
            security: SecurityConfig {
                permissive_cors: false,
                cors_origins: vec!["https://beesides.app".to_string()],
            },
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

impl MetadataConfig {
    fn musicbrainz(contact: String) -> Self {
        Self {
            base_url: "https://musicbrainz.org/ws/2".to_string(),
            app_name: "Beesides-WebApp".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            contact,
            // MusicBrainz allows one request per second per client
            min_interval_ms: 1000,
        }
    }

    /// Identifying client signature sent with every provider call.
    pub fn user_agent(&self) -> String {
        format!("{}/{} ( {} )", self.app_name, self.app_version, self.contact)
    }
}

fn parse_base_url(name: &'static str, value: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(value).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(value.trim_end_matches('/').to_string())
}
