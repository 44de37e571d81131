//! Compressed text encoding of geometry documents.
//!
//! The geometry is stored as JSON text, zlib-compressed, then Base64-encoded so
//! that it can live in a DynamoDB string attribute. DynamoDB caps items at 400
//! KB, so long payloads get cut into two pieces by [`split_payload`].

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, read::DecoderReader, write::EncoderStringWriter};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use serde_json::Value;
use std::io;

pub const DEFAULT_SPLIT_THRESHOLD: usize = 300_000;

pub fn compress_geometry(geometry: &Value) -> io::Result<String> {
    let b64 = EncoderStringWriter::new(&STANDARD);
    let mut zlib = ZlibEncoder::new(b64, Compression::default());
    serde_json::to_writer(&mut zlib, geometry)?;
    Ok(zlib.finish()?.into_inner())
}

pub fn decompress_geometry(text: &str) -> Result<Value> {
    let b64 = DecoderReader::new(text.as_bytes(), &STANDARD);
    let zlib = ZlibDecoder::new(b64);
    Ok(serde_json::from_reader(zlib)?)
}

/// Split compressed text into a head of at most `threshold` characters and an
/// optional tail. The tail is `None` unless the text is strictly longer than
/// the threshold.
pub fn split_payload(text: String, threshold: usize) -> (String, Option<String>) {
    // Base64 output is all ASCII, but count characters anyway so that this
    // never cuts inside a code point.
    match text.char_indices().nth(threshold) {
        None => (text, None),
        Some((cut, _)) => {
            let mut head = text;
            let tail = head.split_off(cut);
            (head, Some(tail))
        }
    }
}
