//! Durable per-dataset cache
//!
//! In-memory map from item id to the dataset's value, mirrored to one
//! pretty-printed JSON document. A key's presence means "resolved" (even with an
//! empty value); absence means "not yet attempted". Entries are only ever added
//! or overwritten, never removed.

use bgcull_common::collection::ItemId;
use bgcull_common::fs::write_atomic;
use bgcull_common::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Cache contents keyed by item id (serialized as string keys)
pub type CacheMap<V> = BTreeMap<ItemId, V>;

pub struct CacheStore<V> {
    path: PathBuf,
    entries: CacheMap<V>,
    loaded: bool,
}

impl<V> CacheStore<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    /// Store backed by `path`; nothing is read until first use
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            entries: BTreeMap::new(),
            loaded: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Populate from disk once per store lifetime
    ///
    /// A missing file starts an empty cache. An unreadable or unparseable file
    /// is logged and also starts an empty cache; it will be replaced on the next
    /// flush.
    pub fn load(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;

        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cache document yet, starting empty");
                return;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cache document unreadable, starting empty");
                return;
            }
        };

        match serde_json::from_str::<CacheMap<V>>(&content) {
            Ok(stored) => {
                info!(path = %self.path.display(), entries = stored.len(), "Loaded cache document");
                self.entries = stored;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cache document corrupt, starting empty");
            }
        }
    }

    /// Live cache contents, loading from disk on first use
    pub fn get(&mut self) -> &CacheMap<V> {
        self.load();
        &self.entries
    }

    pub fn len(&mut self) -> usize {
        self.get().len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.get().is_empty()
    }

    /// Overwrite each key of `partial` into the store
    pub fn merge<I>(&mut self, partial: I)
    where
        I: IntoIterator<Item = (ItemId, V)>,
    {
        self.load();
        self.entries.extend(partial);
    }

    /// Serialize the whole store to disk (write-temp-then-rename)
    pub fn flush(&mut self) -> Result<()> {
        self.load();
        let json = serde_json::to_string_pretty(&self.entries)?;
        write_atomic(&self.path, json.as_bytes())?;
        debug!(path = %self.path.display(), entries = self.entries.len(), "Flushed cache document");
        Ok(())
    }
}
