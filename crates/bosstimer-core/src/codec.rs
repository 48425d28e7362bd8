//! Backup blob codec.
//!
//! Exports turn a table collection into a self-describing text blob:
//! a JSON [`ExportPayload`], gzip-compressed when possible, base64-wrapped,
//! and prefixed with a magic tag naming the chosen encoding. Imports reverse
//! the process with strict envelope validation; data-quality defects below
//! the envelope degrade to warnings and dropped tables, never hard failures.

use std::io::{Read as _, Write as _};

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{BossTable, ExportPayload, FORMAT_VERSION, STORAGE_VERSION};
use crate::normalize::{finite_ms, normalize_table};
use crate::util::now_ms;

/// Magic prefix for gzip-compressed backups.
pub const COMPRESSED_PREFIX: &str = "BOSSTIMER_V2GZ:";
/// Magic prefix for uncompressed backups.
pub const PLAIN_PREFIX: &str = "BOSSTIMER_V1:";

/// A successfully decoded backup plus every correction made while reading it.
#[derive(Debug, Clone)]
pub struct DecodedBackup {
    /// The reconstructed payload with only well-formed tables
    pub payload: ExportPayload,
    /// Human-readable notes on dropped tables, clamped counts, and
    /// timezone mismatches
    pub warnings: Vec<String>,
}

/// Encode a table collection into a portable backup blob.
///
/// Compression is best-effort: when gzip fails or produces no output, the
/// blob falls back to the uncompressed prefix instead of erroring.
pub fn encode(tables: &[BossTable], host_timezone: &str) -> Result<String> {
    let payload = ExportPayload {
        version: FORMAT_VERSION,
        storage_version: STORAGE_VERSION.to_string(),
        exported_at: now_ms(),
        timezone: host_timezone.to_string(),
        tables: tables.to_vec(),
    };
    let json = serde_json::to_string(&payload)?;

    match gzip_compress(json.as_bytes()) {
        Ok(compressed) if !compressed.is_empty() => Ok(format!(
            "{COMPRESSED_PREFIX}{}",
            BASE64_STANDARD.encode(compressed)
        )),
        Ok(_) | Err(_) => {
            tracing::debug!("gzip unavailable, writing uncompressed backup");
            Ok(format!(
                "{PLAIN_PREFIX}{}",
                BASE64_STANDARD.encode(json.as_bytes())
            ))
        }
    }
}

/// Decode a backup blob produced by [`encode`] or pasted by hand.
///
/// Input without a recognized magic prefix is treated as raw JSON text.
/// Envelope problems fail with [`Error::InvalidFormat`]; a version other
/// than [`FORMAT_VERSION`] fails with [`Error::UnsupportedVersion`].
pub fn decode(input: &str, host_timezone: &str) -> Result<DecodedBackup> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidFormat("backup text is empty".to_string()));
    }

    let json = if let Some(body) = trimmed.strip_prefix(COMPRESSED_PREFIX) {
        let compressed = decode_base64(body)?;
        let bytes = gzip_decompress(&compressed)
            .map_err(|error| Error::InvalidFormat(format!("gzip decompression failed: {error}")))?;
        into_utf8(bytes)?
    } else if let Some(body) = trimmed.strip_prefix(PLAIN_PREFIX) {
        into_utf8(decode_base64(body)?)?
    } else {
        // No magic prefix: hand-edited or legacy input, treat as raw JSON.
        trimmed.to_string()
    };

    let value: Value = serde_json::from_str(&json)
        .map_err(|error| Error::InvalidFormat(format!("invalid JSON payload: {error}")))?;
    let Some(object) = value.as_object() else {
        return Err(Error::InvalidFormat(
            "backup payload is not an object".to_string(),
        ));
    };

    // JSON does not distinguish 1 from 1.0, so compare numerically.
    #[allow(clippy::float_cmp)]
    let version_matches = object.get("version").and_then(Value::as_f64)
        == Some(f64::from(FORMAT_VERSION));
    if !version_matches {
        let found = object
            .get("version")
            .map_or_else(|| "missing".to_string(), Value::to_string);
        return Err(Error::UnsupportedVersion(found));
    }

    let Some(raw_tables) = object.get("tables").and_then(Value::as_array) else {
        return Err(Error::InvalidFormat(
            "backup payload has no tables array".to_string(),
        ));
    };

    let now = now_ms();
    let mut warnings = Vec::new();

    let timezone = object
        .get("timezone")
        .and_then(Value::as_str)
        .map_or_else(|| host_timezone.to_string(), String::from);
    if timezone != host_timezone {
        warnings.push(format!(
            "Backup was exported in timezone {timezone}; this host uses {host_timezone}"
        ));
    }

    let storage_version = object
        .get("storageVersion")
        .and_then(Value::as_str)
        .map_or_else(|| STORAGE_VERSION.to_string(), String::from);
    let exported_at = object.get("exportedAt").and_then(finite_ms).unwrap_or(now);

    let mut tables = Vec::with_capacity(raw_tables.len());
    for (index, raw) in raw_tables.iter().enumerate() {
        if let Some(table) = normalize_table(raw, index, now, &mut warnings) {
            tables.push(table);
        }
    }

    Ok(DecodedBackup {
        payload: ExportPayload {
            version: FORMAT_VERSION,
            storage_version,
            exported_at,
            timezone,
            tables,
        },
        warnings,
    })
}

fn decode_base64(body: &str) -> Result<Vec<u8>> {
    BASE64_STANDARD
        .decode(body.trim())
        .map_err(|error| Error::InvalidFormat(format!("invalid base64 payload: {error}")))
}

fn into_utf8(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|_| Error::InvalidFormat("backup payload is not valid UTF-8".to_string()))
}

fn gzip_compress(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

fn gzip_decompress(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}
