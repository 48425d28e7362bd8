//! Shared utility functions used across multiple modules.

use std::collections::HashSet;

use uuid::Uuid;

/// Current Unix timestamp in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// IANA timezone name of the host, or `UTC` when detection fails.
pub fn host_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Pick an id that is not present in `used`.
///
/// Returns `preferred` unchanged when it is non-empty and free; otherwise
/// draws fresh UUIDv7 candidates until one misses the set. Collision-freedom
/// is only required within the caller's scope (one merge or import), never
/// globally.
pub fn fresh_id(preferred: &str, used: &HashSet<String>) -> String {
    if !preferred.is_empty() && !used.contains(preferred) {
        return preferred.to_string();
    }

    loop {
        let candidate = Uuid::now_v7().to_string();
        if !used.contains(&candidate) {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_id_keeps_unused_preferred() {
        let used = HashSet::from(["a".to_string()]);
        assert_eq!(fresh_id("b", &used), "b");
    }

    #[test]
    fn fresh_id_replaces_taken_preferred() {
        let used = HashSet::from(["a".to_string()]);
        let id = fresh_id("a", &used);
        assert_ne!(id, "a");
        assert!(!used.contains(&id));
    }

    #[test]
    fn fresh_id_replaces_empty_preferred() {
        let used = HashSet::new();
        assert!(!fresh_id("", &used).is_empty());
    }

    #[test]
    fn now_ms_is_positive() {
        assert!(now_ms() > 0);
    }

    #[test]
    fn host_timezone_is_never_empty() {
        assert!(!host_timezone().is_empty());
    }
}
