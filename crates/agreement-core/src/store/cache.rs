//! Time-limited cache in front of a vocabulary store.
//!
//! The vocabularies change rarely but are needed for every statistics
//! request, so the service layer keeps them for a short TTL.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::errors::AgreementResult;
use crate::store::VocabularyStore;

const CATEGORIES_KEY: &str = "categories";
const RELATIONSHIP_NAMES_KEY: &str = "relationship_names";

struct CacheEntry {
    value: Vec<String>,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

pub struct VocabularyCache<S> {
    inner: S,
    ttl: Duration,
    cache: Mutex<IndexMap<&'static str, CacheEntry>>,
}

impl<S: VocabularyStore> VocabularyCache<S> {
    pub fn new(inner: S, ttl_seconds: f64) -> Self {
        Self {
            inner,
            // Floor at 100ms; values too large for a Duration never expire.
            ttl: Duration::try_from_secs_f64(ttl_seconds.max(0.1)).unwrap_or(Duration::MAX),
            cache: Mutex::new(IndexMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop every cached vocabulary.
    pub fn invalidate(&self) {
        self.cache.lock().clear();
    }

    fn get_or_load(
        &self,
        key: &'static str,
        load: impl FnOnce(&S) -> AgreementResult<Vec<String>>,
    ) -> AgreementResult<Vec<String>> {
        {
            let mut cache = self.cache.lock();
            let fresh = cache
                .get(key)
                .filter(|entry| entry.expires_at.map_or(true, |at| at > Instant::now()))
                .map(|entry| entry.value.clone());
            if let Some(value) = fresh {
                return Ok(value);
            }
            cache.shift_remove(key);
        }

        debug!("Vocabulary cache miss for {key}");
        let value = load(&self.inner)?;
        self.cache.lock().insert(
            key,
            CacheEntry {
                value: value.clone(),
                expires_at: Instant::now().checked_add(self.ttl),
            },
        );
        Ok(value)
    }

    pub fn stats(&self) -> HashMap<String, i64> {
        let cache = self.cache.lock();
        let mut result = HashMap::new();
        result.insert("entries".to_string(), cache.len() as i64);
        result.insert(
            "ttl_ms".to_string(),
            i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX),
        );
        result
    }
}

impl<S: VocabularyStore> VocabularyStore for VocabularyCache<S> {
    fn get_all_categories(&self) -> AgreementResult<Vec<String>> {
        self.get_or_load(CATEGORIES_KEY, |store| store.get_all_categories())
    }

    fn get_all_relationship_names(&self) -> AgreementResult<Vec<String>> {
        self.get_or_load(RELATIONSHIP_NAMES_KEY, |store| store.get_all_relationship_names())
    }
}
