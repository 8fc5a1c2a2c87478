use crate::parse::RecordBinding;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A raw statement after record macro expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStatement {
    pub expanded: String,
    pub bindings: Vec<RecordBinding>,
}

/// Cache of compiled statements keyed by their raw text.
///
/// Entries are never evicted.
#[derive(Debug, Default)]
pub struct StatementCache {
    cache: Mutex<HashMap<String, Arc<CompiledStatement>>>,
}

impl StatementCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, raw: &str) -> Option<Arc<CompiledStatement>> {
        self.cache.lock().get(raw).cloned()
    }

    /// Stores `compiled` under `raw` unless an entry already exists.
    pub fn insert(&self, raw: &str, compiled: Arc<CompiledStatement>) {
        let mut cache = self.cache.lock();
        if !cache.contains_key(raw) {
            log::debug!("caching expansion of {raw:?}");
            cache.insert(raw.to_owned(), compiled);
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
