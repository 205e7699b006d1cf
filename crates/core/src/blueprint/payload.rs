//! Blueprint payload codec.
//!
//! A payload is a blueprint string: one ASCII digit giving the content
//! format version, followed by standard base64 of zlib-compressed JSON.
//! The digest used for global deduplication is the lowercase hex SHA-256 of
//! the whole string, so two byte-identical strings always collide.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{CatalogError, CatalogResult};

/// Upper bound on the inflated JSON size of a single payload.
pub const MAX_INFLATED_BYTES: u64 = 16 * 1024 * 1024;

/// A validated blueprint string together with its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlueprintPayload {
    raw: String,
    checksum: String,
    format_version: i32,
}

impl BlueprintPayload {
    /// Validate `raw` and compute its digest.
    ///
    /// Fails with `InvalidInput` when the string is empty, lacks the leading
    /// version digit, is not base64, does not inflate, or does not hold a JSON
    /// object or array.
    pub fn parse(raw: impl Into<String>) -> CatalogResult<Self> {
        let raw = raw.into();
        let format_version = format_version(&raw)?;
        inflate(&raw[1..])?;
        let checksum = checksum(&raw);
        Ok(Self {
            raw,
            checksum,
            format_version,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn format_version(&self) -> i32 {
        self.format_version
    }

    /// Decode the JSON document carried by the payload.
    pub fn decode(&self) -> CatalogResult<Value> {
        inflate(&self.raw[1..])
    }

    pub fn into_string(self) -> String {
        self.raw
    }
}

/// Lowercase hex SHA-256 of a payload string.
pub fn checksum(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Encode a JSON document as a blueprint string with the given format digit.
pub fn encode(format_version: u8, document: &Value) -> CatalogResult<String> {
    if format_version > 9 {
        return Err(CatalogError::InvalidInput(format!(
            "format version must be a single digit, got {format_version}"
        )));
    }
    let json = serde_json::to_vec(document)
        .map_err(|e| CatalogError::InvalidInput(format!("unserializable document: {e}")))?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| CatalogError::Storage(format!("zlib encode failed: {e}")))?;
    let compressed = encoder
        .finish()
        .map_err(|e| CatalogError::Storage(format!("zlib encode failed: {e}")))?;
    Ok(format!("{format_version}{}", STANDARD.encode(compressed)))
}

fn format_version(raw: &str) -> CatalogResult<i32> {
    let first = raw
        .chars()
        .next()
        .ok_or_else(|| CatalogError::InvalidInput("blueprint string is empty".to_string()))?;
    first
        .to_digit(10)
        .map(|d| d as i32)
        .ok_or_else(|| {
            CatalogError::InvalidInput("blueprint string must start with a version digit".to_string())
        })
}

fn inflate(body: &str) -> CatalogResult<Value> {
    let compressed = STANDARD
        .decode(body.trim())
        .map_err(|e| CatalogError::InvalidInput(format!("blueprint string is not base64: {e}")))?;

    let mut json = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .take(MAX_INFLATED_BYTES + 1)
        .read_to_end(&mut json)
        .map_err(|e| CatalogError::InvalidInput(format!("blueprint string does not inflate: {e}")))?;
    if json.len() as u64 > MAX_INFLATED_BYTES {
        return Err(CatalogError::InvalidInput(
            "blueprint document is too large".to_string(),
        ));
    }

    let value: Value = serde_json::from_slice(&json)
        .map_err(|e| CatalogError::InvalidInput(format!("blueprint document is not JSON: {e}")))?;
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        _ => Err(CatalogError::InvalidInput(
            "blueprint document must be a JSON object or array".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({"blueprint": {"label": "Smelter Array", "entities": [{"name": "stone-furnace"}]}})
    }

    #[test]
    fn parse_encoded_payload() {
        let raw = encode(0, &sample()).unwrap();
        let payload = BlueprintPayload::parse(raw.clone()).unwrap();
        assert_eq!(payload.format_version(), 0);
        assert_eq!(payload.as_str(), raw);
        assert_eq!(payload.decode().unwrap(), sample());
    }

    #[test]
    fn checksum_is_hex_sha256() {
        assert_eq!(
            checksum("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let raw = encode(0, &sample()).unwrap();
        let payload = BlueprintPayload::parse(raw.clone()).unwrap();
        assert_eq!(payload.checksum(), checksum(&raw));
        assert_eq!(payload.checksum().len(), 64);
    }

    #[test]
    fn different_documents_have_different_digests() {
        let a = BlueprintPayload::parse(encode(0, &json!({"a": 1})).unwrap()).unwrap();
        let b = BlueprintPayload::parse(encode(0, &json!({"a": 2})).unwrap()).unwrap();
        assert_ne!(a.checksum(), b.checksum());
    }

    #[test]
    fn keeps_format_digit() {
        let raw = encode(3, &sample()).unwrap();
        assert!(raw.starts_with('3'));
        assert_eq!(BlueprintPayload::parse(raw).unwrap().format_version(), 3);
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            BlueprintPayload::parse(""),
            Err(CatalogError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_missing_version_digit() {
        let raw = encode(0, &sample()).unwrap();
        assert!(matches!(
            BlueprintPayload::parse(format!("x{}", &raw[1..])),
            Err(CatalogError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_non_base64() {
        assert!(matches!(
            BlueprintPayload::parse("0not*base64!"),
            Err(CatalogError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_uncompressed_body() {
        let raw = format!("0{}", STANDARD.encode(br#"{"a":1}"#));
        assert!(matches!(
            BlueprintPayload::parse(raw),
            Err(CatalogError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_scalar_documents() {
        let raw = encode(0, &json!("just a string")).unwrap();
        assert!(matches!(
            BlueprintPayload::parse(raw),
            Err(CatalogError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_multi_digit_version() {
        assert!(encode(12, &sample()).is_err());
    }
}
