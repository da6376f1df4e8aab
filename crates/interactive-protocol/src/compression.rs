//! Compression pipeline (§4.B): encode/decode a frame under a named scheme.
//!
//! The scheme itself is just a name on the wire (the `scheme` field of a
//! `setCompression` reply/event); this module is the pure encode/decode side.
//! Holding the *current* scheme and swapping it atomically between frames is
//! the session transport's job (§4.D), not this module's.

use std::fmt;

/// A recognized compression scheme. `None` still round-trips identity bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    None,
    Gzip,
    Lz4,
}

impl Scheme {
    /// Parse a scheme name from the wire. Unknown names fall back to `None`
    /// per §4.B ("unknown scheme names round-trip through untouched as none").
    pub fn from_name(name: &str) -> Scheme {
        match name {
            "gzip" => Scheme::Gzip,
            "lz4" => Scheme::Lz4,
            _ => Scheme::None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Scheme::None => "none",
            Scheme::Gzip => "gzip",
            Scheme::Lz4 => "lz4",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("gzip: {0}")]
    Gzip(#[from] std::io::Error),
    #[error("lz4: {0}")]
    Lz4(String),
}

/// Compress `bytes` under `scheme`.
pub fn encode(scheme: Scheme, bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
    match scheme {
        Scheme::None => Ok(bytes.to_vec()),
        Scheme::Gzip => {
            use std::io::Write;
            let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(bytes)?;
            Ok(encoder.finish()?)
        }
        Scheme::Lz4 => Ok(lz4_flex::block::compress_prepend_size(bytes)),
    }
}

/// Decompress `bytes` that were encoded under `scheme`.
pub fn decode(scheme: Scheme, bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
    match scheme {
        Scheme::None => Ok(bytes.to_vec()),
        Scheme::Gzip => {
            use std::io::Read;
            let mut decoder = flate2::read::GzDecoder::new(bytes);
            let mut out = Vec::new();
            decoder.read_to_end(&mut out)?;
            Ok(out)
        }
        Scheme::Lz4 => lz4_flex::block::decompress_size_prepended(bytes)
            .map_err(|e| CompressionError::Lz4(e.to_string())),
    }
}
