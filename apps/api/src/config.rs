use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::retry::RetryPolicy;

const DEFAULT_SPACE: &str = "osanseviero/mistral-super-fast";
const DEFAULT_API_NAME: &str = "/chat";
const DEFAULT_TTS_ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// Application configuration loaded from environment variables.
/// Every variable has a default; startup fails only on values that do not parse.
#[derive(Debug, Clone)]
pub struct Config {
    /// Hosted Space identifier, resolved to a base URL at startup.
    pub inference_space: String,
    /// Explicit base URL. Skips Space host resolution when set.
    pub inference_host: Option<String>,
    pub inference_api_name: String,
    pub inference_timeout: Duration,
    pub hf_token: Option<String>,
    pub retry: RetryPolicy,
    pub tts_lang: String,
    pub tts_endpoint: String,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let retry = RetryPolicy {
            max_attempts: parse_env("RETRY_MAX_ATTEMPTS", 3)?,
            multiplier: parse_env("RETRY_MULTIPLIER", 1)?,
            min_wait: Duration::from_secs(parse_env("RETRY_MIN_WAIT_SECS", 4)?),
            max_wait: Duration::from_secs(parse_env("RETRY_MAX_WAIT_SECS", 10)?),
        };
        validate_retry(&retry)?;

        Ok(Config {
            inference_space: env_or("INFERENCE_SPACE", DEFAULT_SPACE),
            inference_host: optional_env("INFERENCE_HOST"),
            inference_api_name: env_or("INFERENCE_API_NAME", DEFAULT_API_NAME),
            inference_timeout: Duration::from_secs(parse_env("INFERENCE_TIMEOUT_SECS", 120)?),
            hf_token: optional_env("HF_TOKEN"),
            retry,
            tts_lang: env_or("TTS_LANG", "en"),
            tts_endpoint: env_or("TTS_ENDPOINT", DEFAULT_TTS_ENDPOINT),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            port: parse_env("PORT", 5001)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn validate_retry(policy: &RetryPolicy) -> Result<()> {
    if policy.max_attempts == 0 {
        bail!("RETRY_MAX_ATTEMPTS must be at least 1");
    }
    if policy.min_wait > policy.max_wait {
        bail!("RETRY_MIN_WAIT_SECS must not exceed RETRY_MAX_WAIT_SECS");
    }
    Ok(())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
