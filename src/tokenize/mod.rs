//! Tokenization: subword encoder contract and the fixed-length windower.

pub mod encoder;
pub mod window;

pub use encoder::{Encoder, HfEncoder, SpecialTokens};
pub use window::{Windower, finalize_window, window_count};
