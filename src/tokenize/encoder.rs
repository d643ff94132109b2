//! Subword encoder contract and the Hugging Face `tokenizers` adapter.

use log::info;
use std::path::Path;
use tokenizers::Tokenizer;

use crate::error::EncodeError;

#[cfg(feature = "embedded-vocab")]
const EMBEDDED_VOCAB: Option<&[u8]> = Some(include_bytes!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/vocab/tokenizer.json"
)) as &[u8]);

#[cfg(not(feature = "embedded-vocab"))]
const EMBEDDED_VOCAB: Option<&[u8]> = None;

/// Ids of the framing tokens. Defaults are the BERT uncased vocabulary ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpecialTokens {
    pub cls: u32,
    pub sep: u32,
    pub pad: u32,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self {
            cls: 101,
            sep: 102,
            pad: 0,
        }
    }
}

/// Text to ids and back. Read-only after construction, so one instance is shared by all workers.
pub trait Encoder: Send + Sync {
    /// Ids for `text`, without special tokens.
    fn encode(&self, text: &str) -> Result<Vec<u32>, EncodeError>;

    /// Text for `ids`, special tokens stripped.
    fn decode(&self, ids: &[u32]) -> Result<String, EncodeError>;

    fn special_tokens(&self) -> SpecialTokens;
}

/// Encoder backed by a `tokenizer.json` (WordPiece/BERT-style vocabularies).
pub struct HfEncoder {
    tokenizer: Tokenizer,
    special: SpecialTokens,
}

impl HfEncoder {
    /// Load from `tokenizer.json`. Truncation and padding from the file are turned off; the
    /// windower does its own framing.
    pub fn from_file(path: &Path) -> Result<Self, EncodeError> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| EncodeError(format!("load {}: {e}", path.display())))?;
        let encoder = Self::from_tokenizer(tokenizer)?;
        info!(
            "Loaded tokenizer {} (vocab {})",
            path.display(),
            encoder.tokenizer.get_vocab_size(true)
        );
        Ok(encoder)
    }

    /// Load from the bytes of a `tokenizer.json`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncodeError> {
        let tokenizer =
            Tokenizer::from_bytes(bytes).map_err(|e| EncodeError(format!("load vocabulary: {e}")))?;
        Self::from_tokenizer(tokenizer)
    }

    /// Encoder over the vocabulary compiled into the binary (`vocab/tokenizer.json` at build
    /// time, `embedded-vocab` feature). `None` when built without it.
    pub fn embedded() -> Option<Result<Self, EncodeError>> {
        EMBEDDED_VOCAB.map(Self::from_bytes)
    }

    pub fn from_tokenizer(mut tokenizer: Tokenizer) -> Result<Self, EncodeError> {
        tokenizer
            .with_truncation(None)
            .map_err(|e| EncodeError(format!("disable truncation: {e}")))?;
        tokenizer.with_padding(None);

        let lookup = |token: &str| {
            tokenizer
                .token_to_id(token)
                .ok_or_else(|| EncodeError(format!("vocabulary has no {token} token")))
        };
        let special = SpecialTokens {
            cls: lookup("[CLS]")?,
            sep: lookup("[SEP]")?,
            pad: lookup("[PAD]")?,
        };
        Ok(Self { tokenizer, special })
    }
}

impl Encoder for HfEncoder {
    fn encode(&self, text: &str) -> Result<Vec<u32>, EncodeError> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| EncodeError(format!("encode: {e}")))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String, EncodeError> {
        self.tokenizer
            .decode(ids, true)
            .map_err(|e| EncodeError(format!("decode: {e}")))
    }

    fn special_tokens(&self) -> SpecialTokens {
        self.special
    }
}
