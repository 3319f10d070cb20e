use anyhow::{Context as _, anyhow, bail};
use std::time::Duration;

pub const DEFAULT_HF_API_URL: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_HF_MODEL: &str = "gpt2";
pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o-mini";
/// GPT-2's `<|endoftext|>` id, reused as its padding id
pub const GPT2_EOS_TOKEN_ID: u32 = 50256;

#[derive(Debug, Clone, PartialEq)]
pub enum OracleBackend {
    HuggingFace {
        api_url: String,
        model: String,
        api_token: Option<String>,
        eos_token_id: u32,
    },
    OpenRouter {
        api_key: String,
        model: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub port: u16,
    pub log_format: String,
    pub backend: OracleBackend,
    pub oracle_timeout: Duration,
    /// Sessions idle for longer than this are purged
    pub session_ttl: Duration,
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup, environment variables in production.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("PORT must be a port number, got {raw:?}"))?,
            None => 3000,
        };

        let log_format = lookup("LOG_FORMAT").unwrap_or_else(|| "json".to_string());

        let timeout_secs = match lookup("ORACLE_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("ORACLE_TIMEOUT_SECS must be a number, got {raw:?}"))?,
            None => 120,
        };

        let session_ttl_secs = match lookup("SESSION_TTL_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("SESSION_TTL_SECS must be a number, got {raw:?}"))?,
            None => 3600,
        };
        if session_ttl_secs == 0 {
            bail!("SESSION_TTL_SECS must be greater than zero");
        }

        let backend_name = lookup("ORACLE_BACKEND").unwrap_or_else(|| "huggingface".to_string());
        let backend = match backend_name.to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => {
                let eos_token_id = match lookup("EOS_TOKEN_ID") {
                    Some(raw) => raw
                        .parse::<u32>()
                        .with_context(|| format!("EOS_TOKEN_ID must be a number, got {raw:?}"))?,
                    None => GPT2_EOS_TOKEN_ID,
                };
                OracleBackend::HuggingFace {
                    api_url: lookup("HF_API_URL").unwrap_or_else(|| DEFAULT_HF_API_URL.to_string()),
                    model: lookup("HF_MODEL").unwrap_or_else(|| DEFAULT_HF_MODEL.to_string()),
                    api_token: lookup("HF_API_TOKEN").filter(|token| !token.trim().is_empty()),
                    eos_token_id,
                }
            }
            "openrouter" => OracleBackend::OpenRouter {
                api_key: lookup("OPENROUTER_API_KEY")
                    .ok_or_else(|| anyhow!("OPENROUTER_API_KEY not set"))?,
                model: lookup("OPENROUTER_MODEL")
                    .unwrap_or_else(|| DEFAULT_OPENROUTER_MODEL.to_string()),
            },
            other => bail!("Unknown ORACLE_BACKEND {other:?}, expected huggingface or openrouter"),
        };

        Ok(Self {
            port,
            log_format,
            backend,
            oracle_timeout: Duration::from_secs(timeout_secs),
            session_ttl: Duration::from_secs(session_ttl_secs),
        })
    }
}
