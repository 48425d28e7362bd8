//! Merge conflict models
//!
//! A [`MergePreview`] is a one-shot, disposable transaction: conflict ids are
//! unique only within the merge call that produced them and must never be
//! persisted or correlated across merges.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{BossTable, ChannelTimer};

/// Which side of a conflict to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConflictChoice {
    /// Keep the local value
    #[default]
    Mine,
    /// Keep the imported value
    Theirs,
}

/// One channel where both collections hold differing non-empty timer data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeConflict {
    /// Conflict identifier, stable only within one preview
    pub id: String,
    /// Boss name of the affected table
    pub boss_name: String,
    /// Id of the affected table in the merged result
    pub table_id: String,
    /// Affected channel number
    pub channel: u32,
    /// The local side's timer
    pub mine: ChannelTimer,
    /// The imported side's timer
    pub theirs: ChannelTimer,
}

/// Transient result of attempting a merge, awaiting conflict resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePreview {
    /// Full merged result, conflicting channels provisionally set to the
    /// local value
    pub merged_tables: Vec<BossTable>,
    /// Conflicts in discovery order
    pub conflicts: Vec<MergeConflict>,
    /// Default resolution for every conflict (always [`ConflictChoice::Mine`])
    pub default_choices: HashMap<String, ConflictChoice>,
}

impl MergePreview {
    /// Whether the merge completed without any conflicts.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_choice_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ConflictChoice::Mine).unwrap(),
            "\"mine\""
        );
        assert_eq!(
            serde_json::to_string(&ConflictChoice::Theirs).unwrap(),
            "\"theirs\""
        );
    }

    #[test]
    fn conflict_choice_defaults_to_mine() {
        assert_eq!(ConflictChoice::default(), ConflictChoice::Mine);
    }
}
