use async_trait::async_trait;
use consult_flow::{
    ConsultError, GenerationConfig, GenerationOracle, strip_control_markers,
    truncate_to_token_budget,
};
use rig::{client::CompletionClient, completion::Prompt, providers::openrouter};
use serde_json::{Value, json};
use tracing::{debug, error};

const COMPLETION_PREAMBLE: &str = "You are a text-completion engine. Continue the text you are given. \
Reply with the continuation only, without repeating the input.";

/// Hosted chat model reached through OpenRouter, used as a plain text continuer.
pub struct OpenRouterOracle {
    client: openrouter::Client,
    model: String,
}

impl OpenRouterOracle {
    pub fn new(api_key: &str, model: impl Into<String>) -> Self {
        Self {
            client: openrouter::Client::new(api_key),
            model: model.into(),
        }
    }
}

/// Provider parameters for everything rig does not expose directly.
pub fn additional_params(config: &GenerationConfig) -> Value {
    json!({
        "n": config.num_return_sequences,
        "repetition_penalty": config.repetition_penalty,
        "no_repeat_ngram_size": config.no_repeat_ngram_size,
        "early_stopping": config.early_stopping
    })
}

#[async_trait]
impl GenerationOracle for OpenRouterOracle {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> consult_flow::Result<String> {
        let input = if config.truncate_input {
            truncate_to_token_budget(prompt, config.max_input_tokens)
        } else if truncate_to_token_budget(prompt, config.max_input_tokens).len() < prompt.len() {
            return Err(ConsultError::OracleError(format!(
                "Prompt exceeds the {} token input limit",
                config.max_input_tokens
            )));
        } else {
            prompt
        };

        let agent = self
            .client
            .agent(&self.model)
            .preamble(COMPLETION_PREAMBLE)
            .max_tokens(config.max_new_tokens as u64)
            .additional_params(additional_params(config))
            .build();

        let completion = agent.prompt(input).await.map_err(|e| {
            error!(model = %self.model, error = %e, "OpenRouter completion failed");
            ConsultError::OracleError(format!("OpenRouter completion failed: {}", e))
        })?;

        debug!(model = %self.model, output_len = completion.len(), "Completion received");
        Ok(strip_control_markers(&format!("{}{}", input, completion)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_decoding_parameters() {
        let params = additional_params(&GenerationConfig::FIXED);
        assert_eq!(params["n"], 1);
        assert_eq!(params["no_repeat_ngram_size"], 3);
        assert_eq!(params["early_stopping"], true);
        let penalty = params["repetition_penalty"].as_f64().unwrap();
        assert!((penalty - 1.2).abs() < 1e-6);
    }
}
