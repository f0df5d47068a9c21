use crate::error::StoreError;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// How many times `update` re-reads a document that keeps changing before it
/// gives up with `VersionConflict`.
const MAX_UPDATE_ATTEMPTS: usize = 16;

/// A document together with its write counter.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<V> {
    pub version: u64,
    pub value: V,
}

/// A named collection of documents keyed by string id.
///
/// Backed by `DashMap` for high-concurrency access. Single-document operations
/// are atomic; anything spanning several documents is not.
pub struct Collection<V> {
    name: &'static str,
    docs: DashMap<String, Versioned<V>>,
}

impl<V> Collection<V>
where
    V: Clone + Send + Sync,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            docs: DashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.docs.get(key).map(|doc| doc.value.clone())
    }

    pub fn get_versioned(&self, key: &str) -> Option<Versioned<V>> {
        self.docs.get(key).map(|doc| doc.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.docs.contains_key(key)
    }

    /// Creates the document, failing if the id is taken.
    pub fn insert_new(&self, key: impl Into<String>, value: V) -> Result<(), StoreError> {
        match self.docs.entry(key.into()) {
            Entry::Occupied(entry) => Err(StoreError::AlreadyExists {
                collection: self.name,
                key: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(Versioned { version: 1, value });
                Ok(())
            }
        }
    }

    /// Unconditional upsert. Returns the new version.
    pub fn put(&self, key: impl Into<String>, value: V) -> u64 {
        match self.docs.entry(key.into()) {
            Entry::Occupied(mut entry) => {
                let doc = entry.get_mut();
                doc.version += 1;
                doc.value = value;
                doc.version
            }
            Entry::Vacant(entry) => {
                entry.insert(Versioned { version: 1, value });
                1
            }
        }
    }

    /// Writes `value` only if the stored version is still `expected_version`.
    pub fn compare_and_set(
        &self,
        key: &str,
        expected_version: u64,
        value: V,
    ) -> Result<u64, StoreError> {
        match self.docs.get_mut(key) {
            Some(mut doc) if doc.version == expected_version => {
                doc.version += 1;
                doc.value = value;
                Ok(doc.version)
            }
            Some(_) => Err(StoreError::VersionConflict {
                collection: self.name,
                key: key.to_string(),
                attempts: 1,
            }),
            None => Err(StoreError::NotFound {
                collection: self.name,
                key: key.to_string(),
            }),
        }
    }

    /// Optimistic read-modify-write.
    ///
    /// `f` runs against a private copy of the document. If it returns `Err`
    /// nothing is written. If another writer bumped the version in the
    /// meantime the copy is discarded and `f` runs again on fresh data, so `f`
    /// must not have side effects outside the document.
    pub fn update<T, E, F>(&self, key: &str, mut f: F) -> Result<T, E>
    where
        F: FnMut(&mut V) -> Result<T, E>,
        E: From<StoreError>,
    {
        for attempt in 0..MAX_UPDATE_ATTEMPTS {
            let current = self.get_versioned(key).ok_or_else(|| StoreError::NotFound {
                collection: self.name,
                key: key.to_string(),
            })?;

            let mut value = current.value;
            let output = f(&mut value)?;

            match self.compare_and_set(key, current.version, value) {
                Ok(_) => return Ok(output),
                Err(StoreError::VersionConflict { .. }) => {
                    tracing::debug!(
                        "Version conflict on {}/{} (attempt {}), retrying",
                        self.name,
                        key,
                        attempt + 1
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::VersionConflict {
            collection: self.name,
            key: key.to_string(),
            attempts: MAX_UPDATE_ATTEMPTS,
        }
        .into())
    }

    /// Like `update`, but creates the document from `default` first if absent.
    pub fn upsert_with<T, E, D, F>(&self, key: &str, default: D, f: F) -> Result<T, E>
    where
        D: FnOnce() -> V,
        F: FnMut(&mut V) -> Result<T, E>,
        E: From<StoreError>,
    {
        if !self.docs.contains_key(key) {
            // Losing this race to another creator is fine, we update theirs.
            let _ = self.insert_new(key, default());
        }
        self.update(key, f)
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.docs.remove(key).map(|(_, doc)| doc.value)
    }

    /// Removes the document only if `predicate` holds for its current value.
    pub fn remove_if<P>(&self, key: &str, predicate: P) -> Option<V>
    where
        P: FnOnce(&V) -> bool,
    {
        self.docs
            .remove_if(key, |_, doc| predicate(&doc.value))
            .map(|(_, doc)| doc.value)
    }

    /// Snapshot of every document matching `predicate`.
    ///
    /// `predicate` must not touch this collection.
    pub fn find<P>(&self, predicate: P) -> Vec<V>
    where
        P: Fn(&V) -> bool,
    {
        self.docs
            .iter()
            .filter(|entry| predicate(&entry.value().value))
            .map(|entry| entry.value().value.clone())
            .collect()
    }

    pub fn find_entries<P>(&self, predicate: P) -> Vec<(String, V)>
    where
        P: Fn(&V) -> bool,
    {
        self.docs
            .iter()
            .filter(|entry| predicate(&entry.value().value))
            .map(|entry| (entry.key().clone(), entry.value().value.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}
