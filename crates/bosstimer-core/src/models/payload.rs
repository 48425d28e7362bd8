//! Wire-level backup payload model

use serde::{Deserialize, Serialize};

use super::BossTable;

/// The only backup format version this build reads and writes.
pub const FORMAT_VERSION: u32 = 1;

/// Storage schema tag stamped into every export.
pub const STORAGE_VERSION: &str = "bosstimer-storage-v2";

/// A full snapshot of a user's timer tables as written to the backup blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    /// Backup format version, currently always [`FORMAT_VERSION`]
    pub version: u32,
    /// Schema tag of the exporting application's internal storage
    pub storage_version: String,
    /// Export timestamp (Unix ms)
    pub exported_at: i64,
    /// IANA timezone of the exporting host
    pub timezone: String,
    /// The exported tables
    pub tables: Vec<BossTable>,
}
