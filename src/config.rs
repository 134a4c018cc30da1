use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use once_cell::sync::Lazy;
use tracing::warn;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyProfile {
    Permissive,
    Standard,
}

impl SafetyProfile {
    pub fn threshold(self) -> &'static str {
        match self {
            SafetyProfile::Permissive => "OFF",
            SafetyProfile::Standard => "BLOCK_MEDIUM_AND_ABOVE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: PathBuf,
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    pub gemini_image_model: String,
    pub gemini_request_timeout: Duration,
    pub gemini_safety_settings: SafetyProfile,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn normalize_api_base(value: String) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return DEFAULT_GEMINI_API_BASE.to_string();
    }
    trimmed.to_string()
}

fn normalize_model_name(value: String) -> String {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix("models/").unwrap_or(trimmed);
    if trimmed.is_empty() {
        return DEFAULT_GEMINI_IMAGE_MODEL.to_string();
    }
    trimmed.to_string()
}

fn parse_safety_profile(value: &str) -> SafetyProfile {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return SafetyProfile::Permissive;
    }

    match trimmed.to_lowercase().as_str() {
        "permissive" | "off" | "none" => SafetyProfile::Permissive,
        "standard" => SafetyProfile::Standard,
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}'; defaulting to permissive.",
                value
            );
            SafetyProfile::Permissive
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let gemini_api_key = env::var("GEMINI_API_KEY").unwrap_or_default();
        if gemini_api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("GEMINI_API_KEY is required"));
        }

        Ok(Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            log_dir: PathBuf::from(env_string("LOG_DIR", "logs")),
            gemini_api_key: gemini_api_key.trim().to_string(),
            gemini_api_base: normalize_api_base(env_string(
                "GEMINI_API_BASE",
                DEFAULT_GEMINI_API_BASE,
            )),
            gemini_image_model: normalize_model_name(env_string(
                "GEMINI_IMAGE_MODEL",
                DEFAULT_GEMINI_IMAGE_MODEL,
            )),
            gemini_request_timeout: Duration::from_secs(
                env_u64("GEMINI_REQUEST_TIMEOUT_SECONDS", 90).max(1),
            ),
            gemini_safety_settings: parse_safety_profile(&env_string(
                "GEMINI_SAFETY_SETTINGS",
                "permissive",
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safety_profile_accepts_aliases_and_falls_back() {
        assert_eq!(parse_safety_profile("Standard"), SafetyProfile::Standard);
        assert_eq!(parse_safety_profile(" off "), SafetyProfile::Permissive);
        assert_eq!(parse_safety_profile(""), SafetyProfile::Permissive);
        assert_eq!(parse_safety_profile("strict"), SafetyProfile::Permissive);
    }

    #[test]
    fn api_base_drops_trailing_slash() {
        assert_eq!(
            normalize_api_base("http://localhost:8080/v1beta/".to_string()),
            "http://localhost:8080/v1beta"
        );
        assert_eq!(normalize_api_base("  ".to_string()), DEFAULT_GEMINI_API_BASE);
    }

    #[test]
    fn model_name_strips_resource_prefix() {
        assert_eq!(
            normalize_model_name("models/gemini-2.5-flash-image".to_string()),
            "gemini-2.5-flash-image"
        );
        assert_eq!(normalize_model_name(String::new()), DEFAULT_GEMINI_IMAGE_MODEL);
    }
}
