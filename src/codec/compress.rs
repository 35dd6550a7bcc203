//! Reversible text compression for exported recordings.
//!
//! The JSON payload is gzip-compressed and base64-encoded so the result is
//! still plain text.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::{Result, SpyError};

pub fn compress(text: &str) -> Result<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    let bytes = encoder.finish()?;
    Ok(STANDARD.encode(bytes))
}

pub fn decompress(text: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(text.trim())
        .map_err(|e| SpyError::Decode(format!("compressed recording is not base64: {}", e)))?;

    let mut decoder = GzDecoder::new(bytes.as_slice());
    let mut out = String::new();
    decoder
        .read_to_string(&mut out)
        .map_err(|e| SpyError::Decode(format!("failed to decompress recording: {}", e)))?;
    Ok(out)
}
