//! bosstimer-core - Core library for bosstimer
//!
//! This crate contains the shared models, the backup blob codec, and the
//! merge engine used by all bosstimer interfaces.

pub mod codec;
pub mod error;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod util;

pub use error::{Error, Result};
pub use models::{
    BossTable, ChannelTimer, ConflictChoice, ExportPayload, MergeConflict, MergePreview,
};
