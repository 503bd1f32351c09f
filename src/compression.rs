//! Entropy-based prompt pruning for the fast path.
//!
//! Each whitespace token gets an informativeness score: its self-information
//! within the prompt (rare tokens score high) plus the Shannon entropy of its
//! characters. Function words are down-weighted. The top `ratio` share is kept
//! in original order. Tokens containing a forced marker always survive.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::CompressionConfig;

const STOPWORD_PENALTY: f64 = 4.0;

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "of", "to", "in", "on", "for", "with", "by", "at",
    "as", "is", "are", "was", "were", "be", "been", "it", "its", "this", "that", "these",
    "those", "from", "you", "your", "if", "any", "each", "so", "not", "do", "does", "where",
    "which", "what", "who", "into", "may", "can", "will", "their", "there", "they", "them",
];

#[derive(Debug, Error, PartialEq)]
pub enum CompressionError {
    #[error("compression ratio must be in (0, 1], got {0}")]
    InvalidRatio(f32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedPrompt {
    pub text: String,
    pub original_tokens: usize,
    pub kept_tokens: usize,
}

#[derive(Debug, Clone)]
pub struct PromptCompressor {
    ratio: f32,
    force_tokens: Vec<String>,
    min_tokens: usize,
}

impl PromptCompressor {
    pub fn new(
        ratio: f32,
        force_tokens: Vec<String>,
        min_tokens: usize,
    ) -> Result<Self, CompressionError> {
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(CompressionError::InvalidRatio(ratio));
        }
        Ok(Self {
            ratio,
            force_tokens,
            min_tokens,
        })
    }

    pub fn from_config(config: &CompressionConfig) -> Result<Self, CompressionError> {
        Self::new(config.ratio, config.force_tokens.clone(), config.min_tokens)
    }

    /// Same settings with a different retention ratio.
    pub fn with_ratio(&self, ratio: f32) -> Result<Self, CompressionError> {
        Self::new(ratio, self.force_tokens.clone(), self.min_tokens)
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn compress(&self, prompt: &str) -> CompressedPrompt {
        let tokens: Vec<&str> = prompt.split_whitespace().collect();
        let n = tokens.len();

        if self.ratio >= 1.0 || n == 0 {
            return CompressedPrompt {
                text: prompt.to_string(),
                original_tokens: n,
                kept_tokens: n,
            };
        }

        let target = ratio_target(self.ratio, n).max(self.min_tokens).min(n);

        let mut counts: HashMap<String, usize> = HashMap::new();
        for t in &tokens {
            *counts.entry(t.to_lowercase()).or_insert(0) += 1;
        }
        let denom = (n + counts.len()) as f64;

        let mut keep = vec![false; n];
        let mut candidates: Vec<(usize, f64)> = Vec::with_capacity(n);
        for (i, t) in tokens.iter().enumerate() {
            if self.is_forced(t) {
                keep[i] = true;
                continue;
            }
            let count = counts.get(&t.to_lowercase()).copied().unwrap_or(0);
            let self_info = -(((count + 1) as f64) / denom).log2();
            let mut score = self_info + char_entropy(t);
            if is_stopword(t) {
                score /= STOPWORD_PENALTY;
            }
            candidates.push((i, score));
        }

        let forced = n - candidates.len();
        let slots = target.saturating_sub(forced);
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        for (i, _) in candidates.into_iter().take(slots) {
            keep[i] = true;
        }

        let kept: Vec<&str> = tokens
            .iter()
            .zip(&keep)
            .filter_map(|(t, k)| k.then_some(*t))
            .collect();

        debug!(
            original_tokens = n,
            kept_tokens = kept.len(),
            forced,
            ratio = self.ratio,
            "prompt compressed"
        );

        CompressedPrompt {
            text: kept.join(" "),
            original_tokens: n,
            kept_tokens: kept.len(),
        }
    }

    fn is_forced(&self, token: &str) -> bool {
        self.force_tokens
            .iter()
            .any(|f| !f.is_empty() && token.contains(f.as_str()))
    }
}

/// `ceil(ratio * n)`, at least one token. The product carries the f32
/// representation error of `ratio` (0.1f32 is slightly above 0.1), which is
/// shaved off so whole products do not round up.
fn ratio_target(ratio: f32, n: usize) -> usize {
    let exact = f64::from(ratio) * n as f64;
    let shaved = exact - exact * f64::from(f32::EPSILON);
    (shaved.ceil() as usize).max(1)
}

fn is_stopword(token: &str) -> bool {
    let word = token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    STOPWORDS.contains(&word.as_str())
}

/// Shannon entropy (bits) of the token's character distribution.
fn char_entropy(token: &str) -> f64 {
    let mut freq: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for c in token.chars() {
        *freq.entry(c).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }
    freq.values()
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}
