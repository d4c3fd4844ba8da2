//! Chunk - the unit of data carried through a funnel
//!
//! A chunk is an immutable byte payload tagged with the encoding the
//! upstream produced it in. The funnel never decodes chunks.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ContractError;

/// Encoding tag attached to every chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Raw bytes, no text interpretation
    #[default]
    Buffer,
    Utf8,
    Ascii,
    Latin1,
    Base64,
    Hex,
    Utf16le,
}

impl Encoding {
    /// Lowercase tag name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buffer => "buffer",
            Self::Utf8 => "utf8",
            Self::Ascii => "ascii",
            Self::Latin1 => "latin1",
            Self::Base64 => "base64",
            Self::Hex => "hex",
            Self::Utf16le => "utf16le",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buffer" | "binary" => Ok(Self::Buffer),
            "utf8" | "utf-8" => Ok(Self::Utf8),
            "ascii" => Ok(Self::Ascii),
            "latin1" => Ok(Self::Latin1),
            "base64" => Ok(Self::Base64),
            "hex" => Ok(Self::Hex),
            "utf16le" | "utf-16le" => Ok(Self::Utf16le),
            other => Err(ContractError::unknown_encoding(other)),
        }
    }
}

/// Immutable data chunk paired with its encoding
///
/// Cloning is cheap: the payload is reference counted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Payload bytes
    pub data: Bytes,

    /// Encoding the upstream attached to the payload
    #[serde(default)]
    pub encoding: Encoding,
}

impl Chunk {
    /// Create a chunk from any byte source
    pub fn new(data: impl Into<Bytes>, encoding: Encoding) -> Self {
        Self {
            data: data.into(),
            encoding,
        }
    }

    /// Create a utf8-tagged chunk from text
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Bytes::from(text.into()), Encoding::Utf8)
    }

    /// Create an untagged binary chunk
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::new(data, Encoding::Buffer)
    }

    /// Payload length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// View the payload as text, if it is valid utf8
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

impl From<&'static str> for Chunk {
    fn from(text: &'static str) -> Self {
        Self::new(Bytes::from_static(text.as_bytes()), Encoding::Utf8)
    }
}

impl From<String> for Chunk {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}
