//! Context cache: memoizes extraction results per project.
//!
//! An entry is served only while its fingerprint still matches the caller's
//! freshly computed one, its TTL has not elapsed and its format version is
//! current. A failed check deletes the entry and counts as a miss. Expiry is
//! lazy: nothing sweeps the map in the background.
//!
//! Capacity is bounded. Inserting a new project at capacity evicts the
//! entry with the oldest `created_at`, regardless of how recently it was
//! read. Entries created at the same instant leave in insertion order.
//!
//! The map and counters sit behind one mutex that is held only for map
//! access. Extraction in [`ContextCache::get_or_extract`] runs outside the
//! lock, so unrelated projects never serialize on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use storyloom_config::CacheConfig;
use storyloom_core::project::OperationContext;
use tracing::debug;

use crate::chunk::{CONTEXT_FORMAT_VERSION, ProjectContext};
use crate::clock::{Clock, SystemClock};

/// Coarse fingerprint of the inputs that shape a project's context.
///
/// Fields, in order: last-modified millis, chapter count, character count,
/// location count, culture count, magic-system flag, technology flag. Any
/// change to one of them invalidates the cached context; edits that touch
/// none of them (renaming a character, say) do not.
pub fn fingerprint(op: &OperationContext) -> String {
    let project = &op.project;
    format!(
        "{}:{}:{}:{}:{}:{}:{}",
        project.updated_at.timestamp_millis(),
        project.chapters.len(),
        op.characters.len(),
        op.locations.len(),
        op.cultures.len(),
        project.world.has_magic_system(),
        project.world.has_technology_level(),
    )
}

/// Capacity and lifetime limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub max_entries: usize,
    pub ttl: std::time::Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 50,
            ttl: std::time::Duration::from_secs(300),
        }
    }
}

impl From<&CacheConfig> for CacheSettings {
    fn from(config: &CacheConfig) -> Self {
        Self {
            max_entries: config.max_entries,
            ttl: config.ttl(),
        }
    }
}

/// One cached extraction.
#[derive(Debug, Clone)]
pub struct ContextCacheEntry {
    pub project_id: String,
    pub context: Arc<ProjectContext>,
    pub hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Insertion order, breaks `created_at` ties on eviction
    seq: u64,
}

impl ContextCacheEntry {
    fn is_fresh(&self, hash: &str, now: DateTime<Utc>) -> Result<(), &'static str> {
        if self.hash != hash {
            return Err("hash mismatch");
        }
        if now >= self.expires_at {
            return Err("expired");
        }
        if self.context.version() != CONTEXT_FORMAT_VERSION {
            return Err("format version");
        }
        Ok(())
    }
}

/// Point-in-time view of the cache for operator panels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    /// `hits / (hits + misses)`, 0.0 before the first lookup
    pub hit_rate: f64,
    pub hits: u64,
    pub misses: u64,
    pub entries: Vec<CacheEntryStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntryStats {
    pub project_id: String,
    pub age_ms: i64,
    pub tokens: usize,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, ContextCacheEntry>,
    hits: u64,
    misses: u64,
    next_seq: u64,
}

/// Per-project cache of extracted contexts.
///
/// Construct one at startup and share it (`Arc<ContextCache>`) with every
/// caller.
pub struct ContextCache {
    state: Mutex<CacheState>,
    max_entries: usize,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl ContextCache {
    pub fn new(settings: CacheSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
        let ttl = chrono::Duration::from_std(settings.ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            state: Mutex::new(CacheState::default()),
            max_entries: settings.max_entries.max(1),
            ttl,
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a project's context. Stale entries are removed as a side
    /// effect.
    pub fn get(&self, project_id: &str, hash: &str) -> Option<Arc<ProjectContext>> {
        let now = self.clock.now();
        let mut state = self.lock();

        let verdict = state
            .entries
            .get(project_id)
            .map(|entry| entry.is_fresh(hash, now).map(|()| Arc::clone(&entry.context)));

        match verdict {
            Some(Ok(context)) => {
                state.hits += 1;
                debug!(project_id, "Context cache hit");
                Some(context)
            }
            Some(Err(reason)) => {
                state.entries.remove(project_id);
                state.misses += 1;
                debug!(project_id, reason, "Context cache entry discarded");
                None
            }
            None => {
                state.misses += 1;
                debug!(project_id, "Context cache miss");
                None
            }
        }
    }

    /// Store a context under `hash`, replacing any previous entry for the
    /// project.
    pub fn set(
        &self,
        project_id: &str,
        context: ProjectContext,
        hash: &str,
    ) -> Arc<ProjectContext> {
        let context = Arc::new(context);
        let created_at = self.clock.now();
        let expires_at = created_at
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut state = self.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        let entry = ContextCacheEntry {
            project_id: project_id.to_string(),
            context: Arc::clone(&context),
            hash: hash.to_string(),
            created_at,
            expires_at,
            seq,
        };

        if !state.entries.contains_key(project_id) && state.entries.len() >= self.max_entries {
            let oldest = state
                .entries
                .values()
                .min_by_key(|e| (e.created_at, e.seq))
                .map(|e| e.project_id.clone());
            if let Some(evicted) = oldest {
                state.entries.remove(&evicted);
                debug!(project_id = %evicted, "Evicted oldest context cache entry");
            }
        }
        state.entries.insert(project_id.to_string(), entry);
        context
    }

    /// Return the cached context for `op`, extracting and storing it on a
    /// miss.
    pub fn get_or_extract<F>(&self, op: &OperationContext, extract: F) -> Arc<ProjectContext>
    where
        F: FnOnce(&OperationContext) -> ProjectContext,
    {
        let hash = fingerprint(op);
        if let Some(context) = self.get(op.project_id(), &hash) {
            return context;
        }
        let context = extract(op);
        self.set(op.project_id(), context, &hash)
    }

    /// Drop a project's entry. Returns whether one existed.
    pub fn invalidate(&self, project_id: &str) -> bool {
        let removed = self.lock().entries.remove(project_id).is_some();
        if removed {
            debug!(project_id, "Invalidated context cache entry");
        }
        removed
    }

    /// Remove every entry and reset the hit/miss counters.
    pub fn clear(&self) {
        *self.lock() = CacheState::default();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let state = self.lock();

        let lookups = state.hits + state.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            state.hits as f64 / lookups as f64
        };

        let mut entries: Vec<CacheEntryStats> = state
            .entries
            .values()
            .map(|e| CacheEntryStats {
                project_id: e.project_id.clone(),
                age_ms: (now - e.created_at).num_milliseconds(),
                tokens: e.context.total_tokens(),
            })
            .collect();
        entries.sort_by(|a, b| a.project_id.cmp(&b.project_id));

        CacheStats {
            size: state.entries.len(),
            max_size: self.max_entries,
            hit_rate,
            hits: state.hits,
            misses: state.misses,
            entries,
        }
    }
}

impl Default for ContextCache {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}

impl std::fmt::Debug for ContextCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextCache")
            .field("len", &self.len())
            .field("max_entries", &self.max_entries)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
