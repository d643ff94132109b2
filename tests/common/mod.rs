//! Shared test helpers: a deterministic byte-level encoder and tree builders.

#![allow(dead_code)]

use softgrep::error::EncodeError;
use softgrep::tokenize::{Encoder, SpecialTokens};
use std::fs;
use std::path::Path;

/// Offset keeping byte ids clear of the special token ids.
pub const BYTE_BASE: u32 = 1000;

/// One id per byte: `BYTE_BASE + byte`.
pub struct ByteEncoder;

impl Encoder for ByteEncoder {
    fn encode(&self, text: &str) -> Result<Vec<u32>, EncodeError> {
        Ok(text.bytes().map(|b| BYTE_BASE + b as u32).collect())
    }

    fn decode(&self, ids: &[u32]) -> Result<String, EncodeError> {
        let bytes: Vec<u8> = ids
            .iter()
            .filter(|&&id| id >= BYTE_BASE)
            .map(|&id| (id - BYTE_BASE) as u8)
            .collect();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn special_tokens(&self) -> SpecialTokens {
        SpecialTokens::default()
    }
}

/// Panics on any text containing `boom`, otherwise behaves like [`ByteEncoder`].
pub struct PanickyEncoder;

impl Encoder for PanickyEncoder {
    fn encode(&self, text: &str) -> Result<Vec<u32>, EncodeError> {
        if text.contains("boom") {
            panic!("encoder exploded");
        }
        ByteEncoder.encode(text)
    }

    fn decode(&self, ids: &[u32]) -> Result<String, EncodeError> {
        ByteEncoder.decode(ids)
    }

    fn special_tokens(&self) -> SpecialTokens {
        SpecialTokens::default()
    }
}

pub fn write(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// A Go file of roughly 100 bytes with one function declaration.
pub const GO_SOURCE: &str = "package main\n\nimport \"fmt\"\n\n// hello greets.\nfunc hello() {\n\tfmt.Println(\"hello, world\")\n}\n";
