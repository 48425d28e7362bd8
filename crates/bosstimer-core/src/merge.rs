//! Merge engine and conflict resolver.
//!
//! Combines a local table collection with an imported one, matching tables
//! by boss name and channels by number. Only channels where both sides hold
//! differing non-empty timer data become conflicts; everything else merges
//! deterministically. Inputs are never mutated — every call returns freshly
//! built collections.

use std::collections::{HashMap, HashSet};

use crate::models::{
    BossTable, ChannelTimer, ConflictChoice, MergeConflict, MergePreview, MAX_CHANNELS,
};
use crate::util::fresh_id;

/// Merge `imported` into `local`, producing a preview for the caller to
/// confirm.
///
/// Tables with a boss name unknown to `local` are appended wholesale, with
/// their id replaced when it collides with one already in the result. All
/// conflicts are provisionally resolved to the local value.
pub fn merge_tables(local: &[BossTable], imported: &[BossTable]) -> MergePreview {
    let mut merged: Vec<BossTable> = local.to_vec();
    let mut conflicts = Vec::new();
    let mut default_choices = HashMap::new();
    let mut conflict_seq = 0usize;

    for incoming in imported {
        let mut incoming = incoming.clone();
        let Some(position) = merged
            .iter()
            .position(|table| table.boss_name == incoming.boss_name)
        else {
            let used: HashSet<String> = merged.iter().map(|table| table.id.clone()).collect();
            incoming.id = fresh_id(&incoming.id, &used);
            merged.push(incoming);
            continue;
        };

        let table = &mut merged[position];
        let range = table
            .channels_count
            .max(incoming.channels_count)
            .clamp(1, MAX_CHANNELS);
        let mut channels = Vec::with_capacity(range as usize);

        for number in 1..=range {
            let mine = table.channel(number).filter(|timer| timer.has_timer_data());
            let theirs = incoming
                .channel(number)
                .filter(|timer| timer.has_timer_data());

            let resolved = match (mine, theirs) {
                (Some(mine), Some(theirs)) if !mine.same_timers(theirs) => {
                    conflict_seq += 1;
                    let conflict = MergeConflict {
                        id: format!("{}:{number}:{conflict_seq}", table.id),
                        boss_name: table.boss_name.clone(),
                        table_id: table.id.clone(),
                        channel: number,
                        mine: mine.clone(),
                        theirs: theirs.clone(),
                    };
                    default_choices.insert(conflict.id.clone(), ConflictChoice::Mine);
                    let provisional = conflict.mine.clone();
                    conflicts.push(conflict);
                    provisional
                }
                (Some(mine), _) => mine.clone(),
                (None, Some(theirs)) => theirs.clone(),
                (None, None) => ChannelTimer::empty(number),
            };
            channels.push(resolved);
        }

        table.channels_count = range;
        table.channels = channels;
    }

    MergePreview {
        merged_tables: merged,
        conflicts,
        default_choices,
    }
}

/// Apply per-conflict choices to a preview, producing the final collection.
///
/// Unspecified conflicts keep the local value. Lookups that miss — a stale
/// preview passed by the caller — are skipped silently.
pub fn apply_choices(
    preview: &MergePreview,
    choices: &HashMap<String, ConflictChoice>,
) -> Vec<BossTable> {
    let mut resolved = preview.merged_tables.clone();

    for conflict in &preview.conflicts {
        let choice = choices
            .get(&conflict.id)
            .copied()
            .unwrap_or(ConflictChoice::Mine);
        let chosen = match choice {
            ConflictChoice::Mine => &conflict.mine,
            ConflictChoice::Theirs => &conflict.theirs,
        };

        let Some(table) = resolved
            .iter_mut()
            .find(|table| table.id == conflict.table_id)
        else {
            continue;
        };
        let Some(slot) = table.channel_mut(conflict.channel) else {
            continue;
        };
        *slot = chosen.clone();
    }

    resolved
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn table(id: &str, boss_name: &str, channels_count: u32) -> BossTable {
        BossTable {
            id: id.to_string(),
            boss_name: boss_name.to_string(),
            channels_count,
            channels: (1..=channels_count).map(ChannelTimer::empty).collect(),
            created_at: 1_000,
        }
    }

    fn with_kill(mut table: BossTable, channel: u32, killed_at: i64) -> BossTable {
        table.channel_mut(channel).unwrap().killed_at = Some(killed_at);
        table
    }

    #[test]
    fn merging_identical_collections_yields_no_conflicts() {
        let local = vec![with_kill(table("t1", "Chaos Queen", 5), 3, 100)];
        let preview = merge_tables(&local, &local);

        assert!(preview.is_clean());
        assert!(preview.default_choices.is_empty());
        assert_eq!(preview.merged_tables, local);
    }

    #[test]
    fn unknown_boss_is_appended_wholesale() {
        let local = vec![table("t1", "Chaos Queen", 2)];
        let imported = vec![with_kill(table("t2", "Mutant Captain", 4), 1, 50)];

        let preview = merge_tables(&local, &imported);

        assert!(preview.is_clean());
        assert_eq!(preview.merged_tables.len(), 2);
        assert_eq!(preview.merged_tables[1], imported[0]);
    }

    #[test]
    fn appended_table_with_colliding_id_gets_a_fresh_one() {
        let local = vec![table("shared", "Chaos Queen", 2)];
        let imported = vec![table("shared", "Mutant Captain", 2)];

        let preview = merge_tables(&local, &imported);
        let ids: HashSet<&str> = preview
            .merged_tables
            .iter()
            .map(|table| table.id.as_str())
            .collect();

        assert_eq!(preview.merged_tables.len(), 2);
        assert_eq!(ids.len(), 2, "table ids must stay unique");
        assert_eq!(preview.merged_tables[0].id, "shared");
        assert_ne!(preview.merged_tables[1].id, "shared");
    }

    #[test]
    fn duplicate_imported_ids_stay_unique_in_the_result() {
        let local = vec![table("shared", "Chaos Queen", 2)];
        let imported = vec![
            table("shared", "Mutant Captain", 2),
            table("shared", "Pierre", 2),
        ];

        let preview = merge_tables(&local, &imported);
        let ids: HashSet<&str> = preview
            .merged_tables
            .iter()
            .map(|table| table.id.as_str())
            .collect();

        assert_eq!(preview.merged_tables.len(), 3);
        assert_eq!(ids.len(), 3, "every table id must stay unique");
        assert_eq!(preview.merged_tables[0].id, "shared");
    }

    #[test]
    fn one_sided_data_is_adopted_without_conflict() {
        let local = vec![table("t1", "Pierre", 3)];
        let mut imported = vec![table("t9", "Pierre", 3)];
        imported[0].channel_mut(2).unwrap().earliest_respawn_at = Some(500);

        let preview = merge_tables(&local, &imported);

        assert!(preview.is_clean());
        let merged = &preview.merged_tables[0];
        assert_eq!(merged.channel(2).unwrap().earliest_respawn_at, Some(500));
        assert!(!merged.channel(1).unwrap().has_timer_data());
    }

    #[test]
    fn matching_data_on_both_sides_is_kept_without_conflict() {
        let local = vec![with_kill(table("t1", "Pierre", 3), 2, 100)];
        let imported = vec![with_kill(table("t9", "Pierre", 3), 2, 100)];

        let preview = merge_tables(&local, &imported);

        assert!(preview.is_clean());
        assert_eq!(
            preview.merged_tables[0].channel(2).unwrap().killed_at,
            Some(100)
        );
    }

    #[test]
    fn differing_data_becomes_a_conflict_defaulted_to_mine() {
        let local = vec![with_kill(table("t1", "Pierre", 5), 3, 100)];
        let imported = vec![with_kill(table("t9", "Pierre", 5), 3, 200)];

        let preview = merge_tables(&local, &imported);

        assert_eq!(preview.conflicts.len(), 1);
        let conflict = &preview.conflicts[0];
        assert_eq!(conflict.boss_name, "Pierre");
        assert_eq!(conflict.table_id, "t1");
        assert_eq!(conflict.channel, 3);
        assert_eq!(conflict.mine.killed_at, Some(100));
        assert_eq!(conflict.theirs.killed_at, Some(200));
        assert_eq!(
            preview.default_choices.get(&conflict.id),
            Some(&ConflictChoice::Mine)
        );
        // Provisionally resolved to the local value.
        assert_eq!(
            preview.merged_tables[0].channel(3).unwrap().killed_at,
            Some(100)
        );
    }

    #[test]
    fn apply_choices_keeps_mine_by_default_and_honors_theirs() {
        let local = vec![with_kill(table("t1", "Pierre", 5), 3, 100)];
        let imported = vec![with_kill(table("t9", "Pierre", 5), 3, 200)];
        let preview = merge_tables(&local, &imported);
        let conflict_id = preview.conflicts[0].id.clone();

        let kept = apply_choices(&preview, &HashMap::new());
        assert_eq!(kept[0].channel(3).unwrap().killed_at, Some(100));

        let choices = HashMap::from([(conflict_id, ConflictChoice::Theirs)]);
        let swapped = apply_choices(&preview, &choices);
        assert_eq!(swapped[0].channel(3).unwrap().killed_at, Some(200));
    }

    #[test]
    fn apply_choices_skips_stale_conflicts_silently() {
        let local = vec![with_kill(table("t1", "Pierre", 2), 1, 100)];
        let imported = vec![with_kill(table("t9", "Pierre", 2), 1, 200)];
        let mut preview = merge_tables(&local, &imported);

        preview.conflicts[0].table_id = "gone".to_string();
        let resolved = apply_choices(&preview, &HashMap::new());
        assert_eq!(resolved, preview.merged_tables);
    }

    #[test]
    fn merged_range_covers_the_larger_table() {
        let local = vec![table("t1", "Pierre", 2)];
        let imported = vec![with_kill(table("t9", "Pierre", 6), 6, 42)];

        let preview = merge_tables(&local, &imported);
        let merged = &preview.merged_tables[0];

        assert_eq!(merged.channels_count, 6);
        assert_eq!(merged.channels.len(), 6);
        assert_eq!(merged.channel(6).unwrap().killed_at, Some(42));
    }

    #[test]
    fn conflict_ids_are_unique_within_a_preview() {
        let mut local_table = table("t1", "Pierre", 3);
        let mut imported_table = table("t9", "Pierre", 3);
        for channel in 1..=3 {
            local_table.channel_mut(channel).unwrap().killed_at = Some(1);
            imported_table.channel_mut(channel).unwrap().killed_at = Some(2);
        }

        let preview = merge_tables(&[local_table], &[imported_table]);
        let ids: HashSet<&str> = preview
            .conflicts
            .iter()
            .map(|conflict| conflict.id.as_str())
            .collect();

        assert_eq!(preview.conflicts.len(), 3);
        assert_eq!(ids.len(), 3);
        assert_eq!(preview.default_choices.len(), 3);
    }

    #[test]
    fn inputs_are_not_mutated() {
        let local = vec![with_kill(table("t1", "Pierre", 2), 1, 100)];
        let imported = vec![with_kill(table("t9", "Pierre", 2), 1, 200)];
        let local_before = local.clone();
        let imported_before = imported.clone();

        let preview = merge_tables(&local, &imported);
        let _ = apply_choices(&preview, &HashMap::new());

        assert_eq!(local, local_before);
        assert_eq!(imported, imported_before);
    }
}
