//! Process configuration
//!
//! Read from the environment (and `.env` when present). Credentials and
//! model selection live here, never in core logic.

use crate::error::AnalysisError;
use crate::Result;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Groq,
    Gemini,
}

impl LlmProvider {
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Groq => "llama-3.3-70b-versatile",
            LlmProvider::Gemini => "gemini-2.0-flash",
        }
    }

    fn api_key_var(&self) -> &'static str {
        match self {
            LlmProvider::Groq => "GROQ_API_KEY",
            LlmProvider::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(LlmProvider::Groq),
            "gemini" | "google" => Ok(LlmProvider::Gemini),
            other => Err(AnalysisError::ConfigError(format!(
                "LLM_PROVIDER must be 'groq' or 'gemini', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub model: String,
    pub temperature: f32,
    pub api_key: String,
    pub max_retries: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmSettings,
    /// Overrides every role's calls-per-minute cap when set
    pub max_rpm_override: Option<u32>,
    pub port: u16,
    pub data_dir: PathBuf,
}

impl AppConfig {
    /// Load `.env` then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get("LLM_PROVIDER") {
            Some(value) => value.parse()?,
            None => LlmProvider::Groq,
        };

        let api_key = get(provider.api_key_var()).ok_or_else(|| {
            AnalysisError::ConfigError(format!("{} is not set", provider.api_key_var()))
        })?;

        let model = get("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string());
        let temperature = parse_var(&get, "LLM_TEMPERATURE")?.unwrap_or(0.3);
        let max_retries = parse_var(&get, "LLM_MAX_RETRIES")?.unwrap_or(3);
        let timeout_secs: u64 = parse_var(&get, "LLM_TIMEOUT_SECS")?.unwrap_or(60);

        let max_rpm_override: Option<u32> = parse_var(&get, "AGENT_MAX_RPM")?;
        if max_rpm_override == Some(0) {
            return Err(AnalysisError::ConfigError(
                "AGENT_MAX_RPM must be at least 1".to_string(),
            ));
        }

        let port = match parse_var(&get, "PORT")? {
            Some(port) => port,
            None => parse_var(&get, "API_PORT")?.unwrap_or(DEFAULT_PORT),
        };

        let data_dir = get("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        Ok(Self {
            llm: LlmSettings {
                provider,
                model,
                temperature,
                api_key,
                max_retries,
                timeout: Duration::from_secs(timeout_secs),
            },
            max_rpm_override,
            port,
            data_dir,
        })
    }
}

fn parse_var<T, G>(get: &G, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                AnalysisError::ConfigError(format!("{} has invalid value '{}': {}", key, raw, e))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_use_groq() {
        let config = AppConfig::from_lookup(lookup(&[("GROQ_API_KEY", "gsk_test")])).unwrap();

        assert_eq!(config.llm.provider, LlmProvider::Groq);
        assert_eq!(config.llm.model, "llama-3.3-70b-versatile");
        assert!((config.llm.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.llm.max_retries, 3);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert!(config.max_rpm_override.is_none());
    }

    #[test]
    fn test_gemini_requires_its_own_key() {
        let result = AppConfig::from_lookup(lookup(&[
            ("LLM_PROVIDER", "gemini"),
            ("GROQ_API_KEY", "gsk_test"),
        ]));
        assert!(matches!(result, Err(AnalysisError::ConfigError(msg)) if msg.contains("GEMINI_API_KEY")));
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = AppConfig::from_lookup(lookup(&[
            ("LLM_PROVIDER", "gemini"),
            ("GEMINI_API_KEY", "key"),
            ("LLM_MODEL", "gemini-1.5-pro"),
            ("LLM_TEMPERATURE", "0.1"),
            ("AGENT_MAX_RPM", "30"),
            ("API_PORT", "9090"),
            ("DATA_DIR", "/tmp/uploads"),
        ]))
        .unwrap();

        assert_eq!(config.llm.model, "gemini-1.5-pro");
        assert_eq!(config.max_rpm_override, Some(30));
        assert_eq!(config.port, 9090);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/uploads"));
    }

    #[test]
    fn test_invalid_numbers_name_the_variable() {
        let result = AppConfig::from_lookup(lookup(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("LLM_TEMPERATURE", "warm"),
        ]));
        assert!(matches!(result, Err(AnalysisError::ConfigError(msg)) if msg.contains("LLM_TEMPERATURE")));

        let zero_rpm = AppConfig::from_lookup(lookup(&[
            ("GROQ_API_KEY", "gsk_test"),
            ("AGENT_MAX_RPM", "0"),
        ]));
        tokio_test::assert_err!(zero_rpm);
    }
}
