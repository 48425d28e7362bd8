//! Untrusted table reconstruction.
//!
//! Imported tables arrive as arbitrary JSON. This module rebuilds each one
//! into a well-formed [`BossTable`] — dense channels, clamped counts, sane
//! defaults — and records a human-readable warning for every table-level
//! correction. Malformed channel entries are dropped silently; only
//! table-level defects warrant warnings.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::models::{BossTable, ChannelTimer, MAX_CHANNELS};

/// Rebuild one raw table, or reject it with a warning.
///
/// `index` is the table's 0-based position in the import batch; warnings cite
/// the 1-based position. `now_ms` is the import timestamp, used for generated
/// ids and as the `created_at` fallback.
pub fn normalize_table(
    raw: &Value,
    index: usize,
    now_ms: i64,
    warnings: &mut Vec<String>,
) -> Option<BossTable> {
    let Some(object) = raw.as_object() else {
        warnings.push(format!("Table #{}: not an object; skipped", index + 1));
        return None;
    };

    let boss_name = object
        .get("bossName")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let Some(boss_name) = boss_name else {
        warnings.push(format!(
            "Table #{}: missing or empty boss name; skipped",
            index + 1
        ));
        return None;
    };

    // Last entry wins on duplicate channel numbers; the map keeps them sorted.
    let mut recovered: BTreeMap<u32, ChannelTimer> = BTreeMap::new();
    if let Some(entries) = object.get("channels").and_then(Value::as_array) {
        for entry in entries {
            if let Some(timer) = parse_channel_entry(entry) {
                recovered.insert(timer.channel, timer);
            }
        }
    }

    let recovered_count = recovered.len();
    let highest_observed = recovered.keys().next_back().copied().unwrap_or(0);

    let explicit_count = object
        .get("channelsCount")
        .and_then(finite_f64)
        .map(|count| count.floor());
    let target = match explicit_count {
        Some(count) => {
            let clamped = clamp_channel_count(count);
            if f64::from(clamped) != count {
                warnings.push(format!(
                    "Table '{boss_name}': channel count {count} clamped to {clamped}"
                ));
            }
            clamped
        }
        None if highest_observed > 0 => highest_observed,
        None => 1,
    };

    // Never truncate below an observed channel number.
    let channels_count = target.max(highest_observed).clamp(1, MAX_CHANNELS);

    if channels_count as usize != recovered_count {
        warnings.push(format!(
            "Table '{boss_name}': rebuilt channel list ({recovered_count} recovered, {channels_count} expected)"
        ));
    }

    let channels = (1..=channels_count)
        .map(|number| {
            recovered
                .remove(&number)
                .unwrap_or_else(|| ChannelTimer::empty(number))
        })
        .collect();

    let id = object
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map_or_else(|| format!("imported-{now_ms}-{index}"), String::from);
    let created_at = object
        .get("createdAt")
        .and_then(finite_ms)
        .unwrap_or(now_ms);

    Some(BossTable {
        id,
        boss_name: boss_name.to_string(),
        channels_count,
        channels,
        created_at,
    })
}

/// Parse one raw channel entry, dropping it when the channel number is
/// missing or non-finite. Timestamps are kept only when finite.
fn parse_channel_entry(entry: &Value) -> Option<ChannelTimer> {
    let object = entry.as_object()?;
    let number = finite_f64(object.get("channel")?)?;

    Some(ChannelTimer {
        channel: floor_channel(number),
        killed_at: object.get("killedAt").and_then(finite_ms),
        earliest_respawn_at: object.get("earliestRespawnAt").and_then(finite_ms),
        latest_respawn_at: object.get("latestRespawnAt").and_then(finite_ms),
    })
}

pub(crate) fn finite_f64(value: &Value) -> Option<f64> {
    value.as_f64().filter(|number| number.is_finite())
}

/// Finite JSON number as an epoch-millisecond timestamp.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn finite_ms(value: &Value) -> Option<i64> {
    finite_f64(value).map(|number| number as i64)
}

/// Floor a raw channel number and raise it to at least 1.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_channel(number: f64) -> u32 {
    number.floor().max(1.0).min(f64::from(u32::MAX)) as u32
}

/// Clamp a floored raw channel count into [1, `MAX_CHANNELS`].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_channel_count(count: f64) -> u32 {
    count.clamp(1.0, f64::from(MAX_CHANNELS)) as u32
}
