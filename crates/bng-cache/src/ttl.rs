//! Deadline tracking for key expiration.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Tracks absolute expiry deadlines for keys that carry a TTL.
///
/// Keys without a deadline never expire.
#[derive(Debug, Default)]
pub struct TtlTracker {
    deadlines: HashMap<String, Instant>,
}

impl TtlTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear the TTL for a key, starting now.
    pub fn set(&mut self, key: &str, ttl: Option<Duration>) {
        match ttl {
            Some(ttl) => {
                self.deadlines.insert(key.to_string(), Instant::now() + ttl);
            }
            None => {
                self.deadlines.remove(key);
            }
        }
    }

    /// Check if a key has passed its deadline.
    pub fn is_expired(&self, key: &str) -> bool {
        self.deadlines
            .get(key)
            .is_some_and(|deadline| Instant::now() >= *deadline)
    }

    /// Time left before the key expires, `None` if it has no TTL.
    pub fn remaining(&self, key: &str) -> Option<Duration> {
        self.deadlines
            .get(key)
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Stop tracking a key.
    pub fn remove(&mut self, key: &str) {
        self.deadlines.remove(key);
    }

    /// Remove all expired entries and return their keys.
    pub fn drain_expired(&mut self) -> Vec<String> {
        let now = Instant::now();
        let expired: Vec<String> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| now >= **deadline)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.deadlines.remove(key);
        }
        expired
    }

    /// Number of keys carrying a TTL.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_no_ttl_never_expires() {
        let mut tracker = TtlTracker::new();
        tracker.set("k", None);

        assert!(!tracker.is_expired("k"));
        assert_eq!(tracker.remaining("k"), None);
        assert!(tracker.drain_expired().is_empty());
    }

    #[test]
    fn test_expiration() {
        let mut tracker = TtlTracker::new();
        tracker.set("k", Some(Duration::from_millis(10)));

        thread::sleep(Duration::from_millis(20));

        assert!(tracker.is_expired("k"));
        assert_eq!(tracker.drain_expired(), vec!["k".to_string()]);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_set_none_clears_deadline() {
        let mut tracker = TtlTracker::new();
        tracker.set("k", Some(Duration::from_millis(10)));
        tracker.set("k", None);

        thread::sleep(Duration::from_millis(20));

        assert!(!tracker.is_expired("k"));
        assert_eq!(tracker.len(), 0);
    }

    #[test]
    fn test_remaining_counts_down() {
        let mut tracker = TtlTracker::new();
        tracker.set("k", Some(Duration::from_secs(60)));

        let remaining = tracker.remaining("k").unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(59));
    }
}
