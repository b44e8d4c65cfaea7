//! Bounded, time-expiring cache of finished battle reports.
//!
//! Keyed by the report's source URL so repeated requests for the same battle
//! are only computed once while the entry is fresh.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use log::debug;

use crate::analysis::BattleReport;
use crate::config::CacheConfig;

struct CacheEntry {
    report: BattleReport,
    inserted_at: Instant,
}

pub struct ReportCache {
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order, oldest first
    order: VecDeque<String>,
    max_entries: usize,
    ttl: Duration,
}

impl ReportCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl)
    }

    /// Fresh report for `key`, dropping it if it has expired
    pub fn get(&mut self, key: &str) -> Option<&BattleReport> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&mut self, key: impl Into<String>, report: BattleReport) {
        self.insert_at(key.into(), report, Instant::now());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get_at(&mut self, key: &str, now: Instant) -> Option<&BattleReport> {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| now.saturating_duration_since(entry.inserted_at) >= self.ttl);
        if expired {
            debug!("Cached report for {} expired", key);
            self.remove(key);
        }
        self.entries.get(key).map(|entry| &entry.report)
    }

    fn insert_at(&mut self, key: String, report: BattleReport, now: Instant) {
        if self.entries.contains_key(&key) {
            self.remove(&key);
        }
        while self.entries.len() >= self.max_entries {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                report,
                inserted_at: now,
            },
        );
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Outcome, ReportColor, Team};

    fn report(url: &str) -> BattleReport {
        let team = Team::no_opponent().summary();
        BattleReport {
            url: url.to_string(),
            system_name: "Jita".to_string(),
            timestamp: "Combined Report".to_string(),
            total_isk: 0.0,
            total_kills: 0,
            total_pilots: 0,
            attackers: team.clone(),
            defenders: team,
            winner: Outcome::Neutral,
            color: ReportColor::Grey,
        }
    }

    #[test]
    fn test_hit_and_miss() {
        let mut cache = ReportCache::new(10, Duration::from_secs(60));
        assert!(cache.get("a").is_none());

        cache.insert("a", report("a"));
        assert_eq!(cache.get("a").map(|r| r.url.as_str()), Some("a"));
        assert!(cache.get("b").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_entries_expire() {
        let mut cache = ReportCache::new(10, Duration::from_secs(60));
        let start = Instant::now();
        cache.insert_at("a".to_string(), report("a"), start);

        assert!(cache.get_at("a", start + Duration::from_secs(59)).is_some());
        assert!(cache.get_at("a", start + Duration::from_secs(60)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut cache = ReportCache::new(2, Duration::from_secs(60));
        cache.insert("a", report("a"));
        cache.insert("b", report("b"));
        cache.insert("c", report("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_reinsert_refreshes_position() {
        let mut cache = ReportCache::new(2, Duration::from_secs(60));
        cache.insert("a", report("a"));
        cache.insert("b", report("b"));
        cache.insert("a", report("a"));
        cache.insert("c", report("c"));

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_from_config() {
        let cache = ReportCache::from_config(&CacheConfig::default());
        assert_eq!(cache.max_entries, 1000);
        assert_eq!(cache.ttl, Duration::from_secs(3600));
    }
}
