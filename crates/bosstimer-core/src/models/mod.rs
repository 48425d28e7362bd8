//! Data models for bosstimer

mod conflict;
mod payload;
mod table;

pub use conflict::{ConflictChoice, MergeConflict, MergePreview};
pub use payload::{ExportPayload, FORMAT_VERSION, STORAGE_VERSION};
pub use table::{BossTable, ChannelTimer, MAX_CHANNELS};
