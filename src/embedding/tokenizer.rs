//! BERT-style tokenizer using Hugging Face tokenizers library

use crate::Result;
use std::path::Path;
use tokenizers::Tokenizer as HFTokenizer;

/// Tokenized output with input tensors
#[derive(Debug, Clone)]
pub struct TokenizedInput {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub token_type_ids: Vec<i64>,
}

/// BERT-style tokenizer wrapper around Hugging Face tokenizers
#[derive(Clone)]
pub struct Tokenizer {
    tokenizer: HFTokenizer,
}

impl Tokenizer {
    /// Load tokenizer from a tokenizer.json file
    pub fn from_file<P: AsRef<Path>>(tokenizer_path: P) -> Result<Self> {
        let tokenizer = HFTokenizer::from_file(tokenizer_path)
            .map_err(|e| crate::Error::Embedding(format!("Failed to load tokenizer: {}", e)))?;

        Ok(Self { tokenizer })
    }

    /// Encode text to token IDs, truncated and padded to `max_length`
    pub fn encode(&self, text: &str, max_length: usize) -> Result<TokenizedInput> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| crate::Error::Embedding(format!("Tokenization failed: {}", e)))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> = encoding.get_type_ids().iter().map(|&t| t as i64).collect();

        let pad_token_id = self
            .tokenizer
            .get_padding()
            .map(|p| p.pad_id as i64)
            .unwrap_or(0);

        Ok(fit_to_length(
            TokenizedInput {
                input_ids,
                attention_mask,
                token_type_ids,
            },
            max_length,
            pad_token_id,
        ))
    }
}

/// Truncate or pad every tensor to exactly `max_length`
fn fit_to_length(mut input: TokenizedInput, max_length: usize, pad_token_id: i64) -> TokenizedInput {
    input.input_ids.truncate(max_length);
    input.attention_mask.truncate(max_length);
    input.token_type_ids.truncate(max_length);

    let padding_length = max_length.saturating_sub(input.input_ids.len());
    if padding_length > 0 {
        input.input_ids.extend(vec![pad_token_id; padding_length]);
        input.attention_mask.extend(vec![0i64; padding_length]);
        input.token_type_ids.extend(vec![0i64; padding_length]);
    }

    input
}
