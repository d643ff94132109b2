//! Fixed-length token windows: `[CLS] body… [SEP] [PAD]…`, exactly `MAX_LEN` slots each.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::EncodeError;
use crate::tokenize::encoder::{Encoder, SpecialTokens};
use crate::types::TokenWindow;
use crate::utils::config::WindowConsts;

/// Emit cursor over one encoded text.
struct Cursor {
    next: usize,
    total: usize,
}

/// Windows over one input text. The text is encoded once up front; windows are built on demand.
///
/// `next_window` takes a lock around the cursor, so concurrent callers each get distinct windows
/// and every window is delivered exactly once.
pub struct Windower {
    ids: Vec<u32>,
    cursor: Mutex<Cursor>,
    encoder: Arc<dyn Encoder>,
}

impl Windower {
    pub fn new(text: &str, encoder: Arc<dyn Encoder>) -> Result<Self, EncodeError> {
        let ids = encoder.encode(text)?;
        let total = window_count(ids.len());
        Ok(Self {
            ids,
            cursor: Mutex::new(Cursor { next: 0, total }),
            encoder,
        })
    }

    /// Windows this input produces in total.
    pub fn len(&self) -> usize {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner).total
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Real (non-special) token count of the whole input.
    pub fn token_count(&self) -> usize {
        self.ids.len()
    }

    /// Next finalized window, or `None` once all have been delivered (and on every call after).
    ///
    /// A decode failure still consumes the window, so a bad window never stalls the sequence.
    pub fn next_window(&self) -> Result<Option<TokenWindow>, EncodeError> {
        let index = {
            let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
            if cursor.next >= cursor.total {
                return Ok(None);
            }
            cursor.next += 1;
            cursor.next - 1
        };
        let start = (index * WindowConsts::BODY_LEN).min(self.ids.len());
        let end = (start + WindowConsts::BODY_LEN).min(self.ids.len());
        let body = &self.ids[start..end];
        let decoded = self.encoder.decode(body)?;
        Ok(Some(finalize_window(
            body,
            self.encoder.special_tokens(),
            decoded,
        )))
    }

    /// Drain the remaining windows in order.
    pub fn windows(&self) -> impl Iterator<Item = Result<TokenWindow, EncodeError>> + '_ {
        std::iter::from_fn(move || self.next_window().transpose())
    }
}

/// Windows for `n` ids. A window is closed as soon as its body is full and the one open when the
/// ids run out is always emitted, so a multiple of `BODY_LEN` ends with an empty-body window.
pub fn window_count(n: usize) -> usize {
    n / WindowConsts::BODY_LEN + 1
}

/// Frame `body` (at most `BODY_LEN` ids) as `CLS body SEP` and pad to `MAX_LEN`.
pub fn finalize_window(body: &[u32], special: SpecialTokens, decoded_text: String) -> TokenWindow {
    debug_assert!(body.len() <= WindowConsts::BODY_LEN);
    let max = WindowConsts::MAX_LEN;
    let mut tokens = Vec::with_capacity(max);
    tokens.push(special.cls);
    tokens.extend_from_slice(body);
    tokens.push(special.sep);
    let real = tokens.len();
    tokens.resize(max, special.pad);

    let mut attention_mask = vec![1u32; real];
    attention_mask.resize(max, 0);

    TokenWindow {
        tokens,
        segment_ids: vec![0; max],
        attention_mask,
        decoded_text,
    }
}
