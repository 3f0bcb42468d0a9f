//! Entry arena and per-bucket chains.
//!
//! Entries live in a single `SlotMap`; each bucket is a `Chain` holding the
//! head and tail handles of a doubly-linked list threaded through the arena
//! via `prev`/`next`. Generational handles mean a stale link can never resolve
//! to a different entry.

use crate::error::TableError;
use slotmap::{DefaultKey, SlotMap};

#[derive(Debug)]
pub(crate) struct Entry<V> {
    key: Box<[u8]>,
    value: V,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

impl<V> Entry<V> {
    pub(crate) fn key(&self) -> &[u8] {
        &self.key
    }

    pub(crate) fn into_value(self) -> V {
        self.value
    }
}

/// One bucket: an ordered chain of entries whose keys share a bucket index.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Chain {
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
    len: usize,
}

impl Chain {
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

/// Copies `key` into a freshly allocated box, reporting allocation failure
/// instead of aborting.
pub(crate) fn copy_key(key: &[u8]) -> Result<Box<[u8]>, TableError> {
    let mut owned = Vec::new();
    owned
        .try_reserve_exact(key.len())
        .map_err(|_| TableError::AllocationFailed)?;
    owned.extend_from_slice(key);
    Ok(owned.into_boxed_slice())
}

#[derive(Debug)]
pub(crate) struct Arena<V> {
    slots: SlotMap<DefaultKey, Entry<V>>,
}

impl<V> Arena<V> {
    pub(crate) fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Makes room for one more entry so the next `append` does not allocate.
    pub(crate) fn reserve_one(&mut self) -> Result<(), TableError> {
        self.slots
            .try_reserve(1)
            .map_err(|_| TableError::AllocationFailed)
    }

    /// Scans `chain` from its head for an entry whose key equals `key`
    /// byte-for-byte. The first match wins.
    pub(crate) fn find(&self, chain: &Chain, key: &[u8]) -> Option<DefaultKey> {
        let mut cursor = chain.head;
        while let Some(k) = cursor {
            let entry = self.slots.get(k)?;
            if &*entry.key == key {
                return Some(k);
            }
            cursor = entry.next;
        }
        None
    }

    pub(crate) fn value(&self, k: DefaultKey) -> Option<&V> {
        self.slots.get(k).map(|e| &e.value)
    }

    pub(crate) fn value_mut(&mut self, k: DefaultKey) -> Option<&mut V> {
        self.slots.get_mut(k).map(|e| &mut e.value)
    }

    /// Appends a new entry at the tail of `chain`.
    pub(crate) fn append(&mut self, chain: &mut Chain, key: Box<[u8]>, value: V) -> DefaultKey {
        let k = self.slots.insert(Entry {
            key,
            value,
            prev: chain.tail,
            next: None,
        });
        match chain.tail.and_then(|t| self.slots.get_mut(t)) {
            Some(tail) => tail.next = Some(k),
            None => chain.head = Some(k),
        }
        chain.tail = Some(k);
        chain.len += 1;
        k
    }

    /// Unlinks `k` from `chain` and releases its slot, returning the entry.
    ///
    /// `k` must belong to `chain`.
    pub(crate) fn unlink(&mut self, chain: &mut Chain, k: DefaultKey) -> Option<Entry<V>> {
        let entry = self.slots.remove(k)?;
        match (entry.prev, entry.next) {
            // Sole entry: the bucket becomes empty.
            (None, None) => {
                debug_assert_eq!(chain.head, Some(k));
                chain.head = None;
                chain.tail = None;
            }
            // Head of a longer chain: the successor becomes the head.
            (None, Some(next)) => {
                debug_assert_eq!(chain.head, Some(k));
                chain.head = Some(next);
                if let Some(n) = self.slots.get_mut(next) {
                    n.prev = None;
                }
            }
            // Tail: the predecessor becomes the tail.
            (Some(prev), None) => {
                debug_assert_eq!(chain.tail, Some(k));
                chain.tail = Some(prev);
                if let Some(p) = self.slots.get_mut(prev) {
                    p.next = None;
                }
            }
            // Interior: splice predecessor and successor together.
            (Some(prev), Some(next)) => {
                if let Some(p) = self.slots.get_mut(prev) {
                    p.next = Some(next);
                }
                if let Some(n) = self.slots.get_mut(next) {
                    n.prev = Some(prev);
                }
            }
        }
        chain.len -= 1;
        Some(entry)
    }

    /// Checks structural consistency of `chains` against the arena:
    /// acyclic chains, mutually consistent links, head/tail/len bookkeeping,
    /// every entry in the bucket its key hashes to, every arena slot reachable
    /// exactly once, and keys unique across the whole table.
    #[cfg(test)]
    pub(crate) fn validate<F>(&self, chains: &[Chain], index_of: F) -> Result<(), String>
    where
        F: Fn(&[u8]) -> usize,
    {
        let mut reachable = 0usize;
        for (i, chain) in chains.iter().enumerate() {
            let mut prev = None;
            let mut cursor = chain.head;
            let mut count = 0usize;
            while let Some(k) = cursor {
                if count >= self.slots.len() {
                    return Err(format!("bucket {i}: cycle detected"));
                }
                let e = self
                    .slots
                    .get(k)
                    .ok_or_else(|| format!("bucket {i}: dangling link"))?;
                if e.prev != prev {
                    return Err(format!(
                        "bucket {i}: back-link mismatch at \"{}\"",
                        e.key.escape_ascii()
                    ));
                }
                if index_of(e.key()) != i {
                    return Err(format!(
                        "bucket {i}: key \"{}\" hashes elsewhere",
                        e.key.escape_ascii()
                    ));
                }
                prev = Some(k);
                cursor = e.next;
                count += 1;
            }
            if chain.tail != prev {
                return Err(format!("bucket {i}: tail does not match last entry"));
            }
            if chain.len != count {
                return Err(format!("bucket {i}: len {} but {count} reachable", chain.len));
            }
            reachable += count;
        }
        if reachable != self.slots.len() {
            return Err(format!(
                "{} entries reachable but {} allocated",
                reachable,
                self.slots.len()
            ));
        }
        let mut keys = std::collections::HashSet::new();
        for e in self.slots.values() {
            if !keys.insert(e.key()) {
                return Err(format!("duplicate key \"{}\"", e.key.escape_ascii()));
            }
        }
        Ok(())
    }
}
