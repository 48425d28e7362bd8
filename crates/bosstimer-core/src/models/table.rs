//! Boss table and channel timer models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of channels a boss table may track.
pub const MAX_CHANNELS: u32 = 50;

/// One channel's timer state.
///
/// A channel whose three timestamps are all absent carries no timer and is
/// treated as unset everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelTimer {
    /// Channel number, unique within a table (1-based)
    pub channel: u32,
    /// When the boss was killed (Unix ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub killed_at: Option<i64>,
    /// Earliest possible respawn (Unix ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest_respawn_at: Option<i64>,
    /// Latest possible respawn (Unix ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_respawn_at: Option<i64>,
}

impl ChannelTimer {
    /// Create an unset timer slot for the given channel number.
    #[must_use]
    pub const fn empty(channel: u32) -> Self {
        Self {
            channel,
            killed_at: None,
            earliest_respawn_at: None,
            latest_respawn_at: None,
        }
    }

    /// Whether at least one of the three timestamps is set.
    #[must_use]
    pub const fn has_timer_data(&self) -> bool {
        self.killed_at.is_some()
            || self.earliest_respawn_at.is_some()
            || self.latest_respawn_at.is_some()
    }

    /// Whether both slots carry exactly the same three timestamps.
    ///
    /// The channel number itself is not compared.
    #[must_use]
    pub fn same_timers(&self, other: &Self) -> bool {
        self.killed_at == other.killed_at
            && self.earliest_respawn_at == other.earliest_respawn_at
            && self.latest_respawn_at == other.latest_respawn_at
    }

    /// Reset all three timestamps.
    pub fn clear(&mut self) {
        self.killed_at = None;
        self.earliest_respawn_at = None;
        self.latest_respawn_at = None;
    }
}

/// One boss's timer board: a dense, sorted run of channels 1..=`channels_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BossTable {
    /// Unique identifier within a collection
    pub id: String,
    /// Boss name, the merge key across collections
    pub boss_name: String,
    /// Number of tracked channels, always within [1, `MAX_CHANNELS`]
    pub channels_count: u32,
    /// Channel timers, sorted by channel number with no gaps or duplicates
    pub channels: Vec<ChannelTimer>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl BossTable {
    /// Create a new table with `channels_count` unset channels.
    ///
    /// The count is clamped to [1, `MAX_CHANNELS`].
    #[must_use]
    pub fn new(boss_name: impl Into<String>, channels_count: u32) -> Self {
        let channels_count = channels_count.clamp(1, MAX_CHANNELS);
        Self {
            id: Uuid::now_v7().to_string(),
            boss_name: boss_name.into(),
            channels_count,
            channels: (1..=channels_count).map(ChannelTimer::empty).collect(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Look up a channel slot by its 1-based number.
    #[must_use]
    pub fn channel(&self, number: u32) -> Option<&ChannelTimer> {
        self.channels.iter().find(|timer| timer.channel == number)
    }

    /// Mutable lookup of a channel slot by its 1-based number.
    pub fn channel_mut(&mut self, number: u32) -> Option<&mut ChannelTimer> {
        self.channels
            .iter_mut()
            .find(|timer| timer.channel == number)
    }

    /// Number of channels that currently hold timer data.
    #[must_use]
    pub fn armed_channels(&self) -> usize {
        self.channels
            .iter()
            .filter(|timer| timer.has_timer_data())
            .count()
    }
}
