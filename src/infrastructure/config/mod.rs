use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{LLMConfig, LLMProvider};
use crate::domain::schema::MergeMode;
use crate::infrastructure::security::keyring::KeyringManager;

pub const KEYRING_SERVICE: &str = "CompileAI";
pub const ENV_PREFIX: &str = "COMPILEAI_";
pub const CONFIG_PATH_ENV: &str = "COMPILEAI_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "compileai.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    /// Upper bound on a JSON upload body
    #[validate(range(min = 1024))]
    pub max_payload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            max_payload_bytes: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UnifyConfig {
    /// Rows per file shown to the model next to the headers
    #[validate(range(max = 50))]
    pub sample_rows: usize,
}

impl Default for UnifyConfig {
    fn default() -> Self {
        Self { sample_rows: 3 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    pub default_mode: MergeMode,
    pub include_source: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub llm: LLMConfig,
    #[validate(nested)]
    pub unify: UnifyConfig,
    pub export: ExportConfig,
}

impl AppConfig {
    /// Defaults, then `compileai.toml` (or `$COMPILEAI_CONFIG`), then
    /// `COMPILEAI_*` variables with `__` separating nested keys.
    pub fn load() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "Failed to read .env file");
            }
        }

        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        Self::from_figment(
            Figment::from(Serialized::defaults(AppConfig::default()))
                .merge(Toml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        config
            .validate()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        Ok(config)
    }
}

/// Resolves provider API keys: explicit config first, then the OS keyring
pub struct ConfigService {
    keyring: KeyringManager,
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            keyring: KeyringManager::new(KEYRING_SERVICE),
        }
    }

    pub fn save_api_key(&self, provider: LLMProvider, key: &str) -> Result<()> {
        self.keyring.set_secret(provider.key_name(), key)
    }

    pub fn get_api_key(&self, provider: LLMProvider) -> Result<Option<String>> {
        self.keyring.get_secret(provider.key_name())
    }

    pub fn delete_api_key(&self, provider: LLMProvider) -> Result<()> {
        self.keyring.delete_secret(provider.key_name())
    }

    /// Fill `config.api_key` from the keyring when it is not set.
    /// Keyring failures are logged and leave the key empty.
    pub fn resolve_api_key(&self, config: &mut LLMConfig) {
        let has_key = config
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        if has_key || !config.provider.requires_api_key() {
            return;
        }

        match self.get_api_key(config.provider) {
            Ok(Some(key)) => config.api_key = Some(key),
            Ok(None) => {
                tracing::debug!(provider = ?config.provider, "No API key in keyring")
            }
            Err(e) => tracing::warn!(error = %e, "Keyring lookup failed"),
        }
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}
