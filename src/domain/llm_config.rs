use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum LLMProvider {
    #[serde(alias = "local")]
    Local,
    #[serde(alias = "openai")]
    OpenAI,
    #[serde(alias = "openrouter")]
    OpenRouter,
    #[serde(alias = "gemini", alias = "google")]
    Gemini,
}

impl LLMProvider {
    /// Keyring entry name and CLI spelling.
    pub fn key_name(&self) -> &'static str {
        match self {
            LLMProvider::Local => "local",
            LLMProvider::OpenAI => "openai",
            LLMProvider::OpenRouter => "openrouter",
            LLMProvider::Gemini => "gemini",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LLMProvider::Local)
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(LLMProvider::Local),
            "openai" => Ok(LLMProvider::OpenAI),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "gemini" | "google" => Ok(LLMProvider::Gemini),
            other => Err(format!("Unknown provider: {}", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    #[validate(length(min = 1))]
    pub base_url: String,
    #[validate(length(min = 1))]
    pub model: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: Option<f32>,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Local,
            base_url: "http://localhost:1234/v1".to_string(),
            model: "local-model".to_string(),
            api_key: None,
            max_tokens: Some(2048),
            temperature: Some(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("OpenAI".parse::<LLMProvider>(), Ok(LLMProvider::OpenAI));
        assert_eq!("google".parse::<LLMProvider>(), Ok(LLMProvider::Gemini));
        assert!("bedrock".parse::<LLMProvider>().is_err());
    }

    #[test]
    fn test_api_key_is_never_serialized() {
        let config = LLMConfig {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(LLMConfig::default().validate().is_ok());
    }

    #[test]
    fn test_provider_deserializes_lowercase_aliases() {
        let provider: LLMProvider = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(provider, LLMProvider::OpenAI);
        let provider: LLMProvider = serde_json::from_str("\"google\"").unwrap();
        assert_eq!(provider, LLMProvider::Gemini);
        let provider: LLMProvider = serde_json::from_str("\"OpenRouter\"").unwrap();
        assert_eq!(provider, LLMProvider::OpenRouter);
    }
}
