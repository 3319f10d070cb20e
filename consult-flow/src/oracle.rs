use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::Result;

/// Which token the oracle pads with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PadToken {
    /// Alias the padding token to the end-of-sequence token
    EndOfSequence,
}

/// Decoding parameters handed to the generation oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Input context limit, in tokens
    pub max_input_tokens: usize,
    /// Truncate inputs longer than `max_input_tokens` instead of failing
    pub truncate_input: bool,
    pub max_new_tokens: usize,
    pub num_return_sequences: usize,
    pub repetition_penalty: f32,
    /// No n-gram of this size may appear twice in the output
    pub no_repeat_ngram_size: usize,
    pub early_stopping: bool,
    pub pad_token: PadToken,
}

impl GenerationConfig {
    /// The one configuration every role generates with.
    pub const FIXED: GenerationConfig = GenerationConfig {
        max_input_tokens: 1024,
        truncate_input: true,
        max_new_tokens: 300,
        num_return_sequences: 1,
        repetition_penalty: 1.2,
        no_repeat_ngram_size: 3,
        early_stopping: true,
        pad_token: PadToken::EndOfSequence,
    };
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::FIXED
    }
}

/// A pretrained text-completion model: prompt in, continuation out.
///
/// Implementations are read-only after construction and may be shared across
/// concurrent requests behind an `Arc<dyn GenerationOracle>`.
#[async_trait]
pub trait GenerationOracle: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Generate text for `prompt`. The returned text has control markers
    /// stripped and is otherwise unprocessed.
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String>;
}

static CONTROL_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\|[A-Za-z0-9_]+\|>").expect("Invalid regex"));

/// Remove `<|endoftext|>`-style control markers from generated text.
pub fn strip_control_markers(text: &str) -> String {
    CONTROL_MARKER.replace_all(text, "").into_owned()
}

/// Keep at most `max_tokens` whitespace-delimited pieces of `prompt`.
///
/// For backends that cannot truncate server-side. A piece is a rough stand-in
/// for a token; sub-word tokenizers count more. Line structure of the kept
/// prefix is preserved.
pub fn truncate_to_token_budget(prompt: &str, max_tokens: usize) -> &str {
    let mut seen = 0;
    let mut in_piece = false;
    for (idx, ch) in prompt.char_indices() {
        if ch.is_whitespace() {
            in_piece = false;
        } else if !in_piece {
            if seen == max_tokens {
                return prompt[..idx].trim_end();
            }
            seen += 1;
            in_piece = true;
        }
    }
    prompt
}
