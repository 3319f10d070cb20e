pub mod huggingface;
pub mod openrouter;

pub use huggingface::HuggingFaceOracle;
pub use openrouter::OpenRouterOracle;

use consult_flow::GenerationOracle;
use std::sync::Arc;
use tracing::info;

use crate::config::{OracleBackend, ServiceConfig};

/// Build the shared, read-only oracle handle for the configured backend.
pub fn build_oracle(config: &ServiceConfig) -> anyhow::Result<Arc<dyn GenerationOracle>> {
    match &config.backend {
        OracleBackend::HuggingFace {
            api_url,
            model,
            api_token,
            eos_token_id,
        } => {
            info!(model = %model, api_url = %api_url, "Using Hugging Face text-generation oracle");
            let oracle = HuggingFaceOracle::new(
                api_url,
                model,
                api_token.clone(),
                *eos_token_id,
                config.oracle_timeout,
            )?;
            Ok(Arc::new(oracle))
        }
        OracleBackend::OpenRouter { api_key, model } => {
            info!(model = %model, "Using OpenRouter oracle");
            Ok(Arc::new(OpenRouterOracle::new(api_key, model.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_configured_backend() {
        let config = ServiceConfig::from_lookup(|_| None).unwrap();
        assert_eq!(build_oracle(&config).unwrap().name(), "huggingface");

        let config = ServiceConfig::from_lookup(|key| match key {
            "ORACLE_BACKEND" => Some("openrouter".to_string()),
            "OPENROUTER_API_KEY" => Some("sk-test".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(build_oracle(&config).unwrap().name(), "openrouter");
    }
}
