//! Process-local suggestion cache keyed by preference fingerprint.

use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::metrics::CACHE_SIZE;
use crate::models::{CandidateMeal, Difficulty, MealPeriod, PreferenceSet};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Time source for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// Cache entry with timestamp
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub meal: CandidateMeal,
    pub badges: Vec<String>,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.ttl
    }
}

pub struct MealCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl MealCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn with_system_clock(ttl: Duration) -> Self {
        Self::new(ttl, Arc::new(SystemClock))
    }

    /// Look up a fingerprint. Expired entries read as absent and are dropped.
    pub fn get(&self, fingerprint: &str) -> Option<CacheEntry> {
        let now = self.clock.now();
        let hit = self
            .entries
            .get(fingerprint)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value().clone());

        if hit.is_none() && self.entries.remove_if(fingerprint, |_, e| e.is_expired(now)).is_some() {
            CACHE_SIZE.set(self.entries.len() as f64);
        }
        hit
    }

    /// Insert or replace the entry for a fingerprint, restarting its TTL.
    pub fn put(&self, fingerprint: &str, meal: CandidateMeal, badges: Vec<String>) {
        self.entries.insert(
            fingerprint.to_string(),
            CacheEntry {
                meal,
                badges,
                created_at: self.clock.now(),
                ttl: self.ttl,
            },
        );
        CACHE_SIZE.set(self.entries.len() as f64);
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            CACHE_SIZE.set(self.entries.len() as f64);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Serialize)]
struct FingerprintFields<'a> {
    dietary_restrictions: &'a BTreeSet<String>,
    cuisine_preferences: &'a BTreeSet<String>,
    max_cooking_time: u32,
    difficulty: Option<Difficulty>,
    excluded_ingredients: &'a BTreeSet<String>,
    serving_size: u32,
    meal_period: Option<MealPeriod>,
}

// Create a cache key (hash of the cacheable preference fields)
// Recently shown meal ids are left out, they differ on every request.
pub fn fingerprint(prefs: &PreferenceSet) -> String {
    let fields = FingerprintFields {
        dietary_restrictions: &prefs.dietary_restrictions,
        cuisine_preferences: &prefs.cuisine_preferences,
        max_cooking_time: prefs.max_cooking_time,
        difficulty: prefs.difficulty,
        excluded_ingredients: &prefs.excluded_ingredients,
        serving_size: prefs.serving_size,
        meal_period: prefs.meal_period,
    };
    let canonical = serde_json::to_string(&fields).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}
