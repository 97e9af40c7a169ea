//! Token estimation for the run's budget accounting.
//!
//! Uses tiktoken-rs for OpenAI-compatible counts, with a ~4 chars/token
//! heuristic when the encoder cannot be constructed. One counter (one
//! encoding scheme) is used uniformly across a run, so estimates are
//! consistent even though they are not exact for any specific model.

use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;

/// Token encoding used for estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// cl100k_base: GPT-4, GPT-3.5-turbo
    #[default]
    Cl100kBase,
    /// o200k_base: GPT-4o
    O200kBase,
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoding::Cl100kBase => write!(f, "cl100k_base"),
            Encoding::O200kBase => write!(f, "o200k_base"),
        }
    }
}

impl std::str::FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cl100k" | "cl100k_base" => Ok(Encoding::Cl100kBase),
            "o200k" | "o200k_base" => Ok(Encoding::O200kBase),
            _ => Err(format!("unknown encoding: {}", s)),
        }
    }
}

static CL100K: OnceLock<Option<CoreBPE>> = OnceLock::new();
static O200K: OnceLock<Option<CoreBPE>> = OnceLock::new();

fn encoder(encoding: Encoding) -> Option<&'static CoreBPE> {
    match encoding {
        Encoding::Cl100kBase => CL100K
            .get_or_init(|| tiktoken_rs::cl100k_base().ok())
            .as_ref(),
        Encoding::O200kBase => O200K
            .get_or_init(|| tiktoken_rs::o200k_base().ok())
            .as_ref(),
    }
}

/// Character-based fallback, roughly four characters per token.
fn approximate(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Token estimator backed by a process-cached encoder.
///
/// Deterministic for identical input; never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCounter {
    encoding: Encoding,
}

impl TokenCounter {
    pub fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }

    /// Estimate the token count of `text`.
    pub fn estimate(&self, text: &str) -> usize {
        match encoder(self.encoding) {
            Some(bpe) => bpe.encode_ordinary(text).len(),
            None => approximate(text),
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(TokenCounter::default().estimate(""), 0);
    }

    #[test]
    fn test_simple_text() {
        let count = TokenCounter::default().estimate("Hello, world!");
        assert!(count > 0 && count < 10);
    }

    #[test]
    fn test_deterministic() {
        let counter = TokenCounter::new(Encoding::Cl100kBase);
        let text = "fn main() { println!(\"hi\"); }";
        assert_eq!(counter.estimate(text), counter.estimate(text));
    }

    #[test]
    fn test_approximation() {
        assert_eq!(approximate(""), 0);
        assert_eq!(approximate("a"), 1);
        assert_eq!(approximate("abcd"), 1);
        assert_eq!(approximate("abcde"), 2);
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("cl100k".parse::<Encoding>().unwrap(), Encoding::Cl100kBase);
        assert_eq!("o200k_base".parse::<Encoding>().unwrap(), Encoding::O200kBase);
        assert!("invalid".parse::<Encoding>().is_err());
    }
}
