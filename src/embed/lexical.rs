//! Offline embedder built from hashed word and character-trigram features.
//!
//! No model, no network: vectors only capture surface overlap ("App crash"
//! vs "App crashes"), not meaning. Used for offline runs and tests.

use async_trait::async_trait;

use super::{EmbedError, Embedder};

/// Default vector width for [`LexicalEmbedder`].
pub const DEFAULT_LEXICAL_DIMENSIONS: usize = 256;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Deterministic feature-hashing embedder.
#[derive(Debug, Clone)]
pub struct LexicalEmbedder {
    dimensions: usize,
}

impl LexicalEmbedder {
    /// Creates an embedder producing `dimensions`-wide vectors (minimum 1).
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Embeds a single string; L2-normalized, all zeros for empty text.
    #[must_use]
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        let lowered = text.to_lowercase();

        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[self.bucket(word.as_bytes())] += WORD_WEIGHT;

            let padded: Vec<char> = format!(" {word} ").chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                vector[self.bucket(trigram.as_bytes())] += TRIGRAM_WEIGHT;
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }

    #[allow(clippy::cast_possible_truncation)]
    fn bucket(&self, bytes: &[u8]) -> usize {
        (fnv1a(bytes) % self.dimensions as u64) as usize
    }
}

impl Default for LexicalEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_LEXICAL_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for LexicalEmbedder {
    fn name(&self) -> &'static str {
        "lexical"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

/// 64-bit FNV-1a; stable across platforms and releases.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}
