use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError, RwLock},
    time::SystemTime,
};

use compact_str::CompactString;
use tracing::debug;

use crate::{
    error::{EngineError, StoreError},
    store::Fingerprint,
    template::CompiledTemplate,
};

struct CacheEntry {
    fingerprint: Fingerprint,
    template: Arc<CompiledTemplate>,
    created_at: SystemTime,
}

/// Process-lifetime cache of compiled templates keyed by template identity.
///
/// Entries are replaced when the source fingerprint changes and evicted only
/// by an explicit [`clear`](Self::clear). Reads never block each other;
/// compile-and-insert is serialized per key so two callers never compile the
/// same stale source concurrently. Compile failures are never cached and
/// leave the previous good entry untouched.
#[derive(Default)]
pub struct TemplateCache {
    entries: RwLock<HashMap<CompactString, CacheEntry>>,
    compile_locks: Mutex<HashMap<CompactString, Arc<Mutex<()>>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached tree for `identity` if its fingerprint still
    /// matches, otherwise call `load`, compile the current source and store
    /// the result.
    pub fn get_or_compile(
        &self,
        identity: &str,
        fingerprint: &Fingerprint,
        load: impl FnOnce() -> Result<String, StoreError>,
    ) -> Result<Arc<CompiledTemplate>, EngineError> {
        if let Some(template) = self.lookup(identity, fingerprint) {
            return Ok(template);
        }

        let key_lock = {
            let mut locks = self
                .compile_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(identity.into()).or_default())
        };
        let _compiling = key_lock.lock().unwrap_or_else(PoisonError::into_inner);

        // A concurrent caller may have compiled while we waited on the key
        // lock.
        if let Some(template) = self.lookup(identity, fingerprint) {
            return Ok(template);
        }

        let source = load()?;
        let template = Arc::new(
            CompiledTemplate::parse(&source).map_err(|err| err.with_name(identity))?,
        );

        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                identity.into(),
                CacheEntry {
                    fingerprint: fingerprint.clone(),
                    template: Arc::clone(&template),
                    created_at: SystemTime::now(),
                },
            );
        debug!("compiled template `{identity}` ({fingerprint})");

        Ok(template)
    }

    fn lookup(&self, identity: &str, fingerprint: &Fingerprint) -> Option<Arc<CompiledTemplate>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(identity)?;
        (entry.fingerprint == *fingerprint).then(|| Arc::clone(&entry.template))
    }

    /// Evict one entry, or the whole cache.
    pub fn clear(&self, identity: Option<&str>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match identity {
            Some(name) => {
                entries.remove(name);
            }
            None => entries.clear(),
        }
    }

    /// The fingerprint the cached entry was compiled from, if any.
    pub fn fingerprint(&self, identity: &str) -> Option<Fingerprint> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(identity).map(|e| e.fingerprint.clone())
    }

    /// When the cached entry was compiled, if any.
    pub fn created_at(&self, identity: &str) -> Option<SystemTime> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(identity).map(|e| e.created_at)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
