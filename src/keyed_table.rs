//! KeyedTable: fixed-capacity, separately chained map from byte-string keys
//! to caller-owned values.

use crate::chain::{copy_key, Arena, Chain};
use crate::error::TableError;
use crate::hash::bucket_index;
use core::fmt;
use core::num::NonZeroU16;
use log::{debug, trace, warn};

/// Lifecycle state reported by [`KeyedTable::status`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TableStatus {
    /// `initialize` has not been called yet.
    Uninitialized,
    /// The last call to `initialize` failed; the table may be initialized again.
    InitFailed,
    /// The bucket array is allocated and every operation is available.
    Ready,
}

/// Successful outcome of [`KeyedTable::add_or_update`].
#[derive(Debug, Eq, PartialEq)]
pub enum Upsert<V> {
    /// A new entry was appended to its bucket.
    Added,
    /// An entry with the same key already existed; its value was replaced and
    /// the displaced value is handed back.
    Updated { previous: V },
}

impl<V> Upsert<V> {
    /// True when a new entry was created.
    pub fn is_added(&self) -> bool {
        matches!(self, Upsert::Added)
    }

    /// True when an existing entry's value was replaced.
    pub fn is_updated(&self) -> bool {
        matches!(self, Upsert::Updated { .. })
    }

    /// The displaced value, if this was an update.
    pub fn previous(self) -> Option<V> {
        match self {
            Upsert::Added => None,
            Upsert::Updated { previous } => Some(previous),
        }
    }
}

/// Failed [`KeyedTable::add_or_update`]: the reason plus the value that was
/// not stored, returned so the caller keeps ownership of it.
pub struct Rejected<V> {
    /// Why the value was not stored.
    pub error: TableError,
    /// The value passed to `add_or_update`, untouched.
    pub value: V,
}

impl<V> Rejected<V> {
    /// Gives the rejected value back to the caller.
    pub fn into_value(self) -> V {
        self.value
    }
}

impl<V> fmt::Debug for Rejected<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<V> From<Rejected<V>> for TableError {
    fn from(r: Rejected<V>) -> Self {
        r.error
    }
}

struct Buckets<V> {
    capacity: NonZeroU16,
    chains: Vec<Chain>,
    arena: Arena<V>,
}

impl<V> Buckets<V> {
    fn slot(&self, key: &[u8]) -> usize {
        usize::from(bucket_index(key, self.capacity))
    }
}

enum State<V> {
    Uninitialized,
    InitFailed,
    Ready(Buckets<V>),
}

/// A fixed number of buckets, each a chain of `(key, value)` entries.
///
/// Keys are copied into the table; values are held as given and only ever
/// leave the table by being returned to the caller (on update, `remove` or
/// `delete`). The table must be initialized before use; until then every
/// operation reports failure.
pub struct KeyedTable<V> {
    state: State<V>,
}

impl<V> Default for KeyedTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for KeyedTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedTable")
            .field("status", &self.status())
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

impl<V> KeyedTable<V> {
    /// Creates an uninitialized table. Call [`initialize`](Self::initialize)
    /// before use.
    pub const fn new() -> Self {
        Self {
            state: State::Uninitialized,
        }
    }

    /// Creates and initializes a table with `capacity` buckets.
    pub fn with_capacity(capacity: u16) -> Result<Self, TableError> {
        let mut table = Self::new();
        table.initialize(capacity)?;
        Ok(table)
    }

    /// Allocates `capacity` empty buckets.
    ///
    /// Fails with `ZeroCapacity` or `AllocationFailed`, leaving the table in
    /// [`TableStatus::InitFailed`] (a later call may succeed). Calling this on
    /// a ready table fails with `AlreadyInitialized` and changes nothing.
    pub fn initialize(&mut self, capacity: u16) -> Result<(), TableError> {
        if self.is_ready() {
            warn!("keyed table already initialized; ignoring capacity {capacity}");
            return Err(TableError::AlreadyInitialized);
        }
        let Some(capacity) = NonZeroU16::new(capacity) else {
            warn!("keyed table initialization failed: zero capacity");
            self.state = State::InitFailed;
            return Err(TableError::ZeroCapacity);
        };
        // Reserve buckets before building the arena; only this step may fail.
        let mut chains: Vec<Chain> = Vec::new();
        if chains.try_reserve_exact(usize::from(capacity.get())).is_err() {
            warn!("keyed table initialization failed: cannot allocate {capacity} buckets");
            self.state = State::InitFailed;
            return Err(TableError::AllocationFailed);
        }
        chains.resize(usize::from(capacity.get()), Chain::default());
        self.state = State::Ready(Buckets {
            capacity,
            chains,
            arena: Arena::new(),
        });
        debug!("keyed table initialized with {capacity} buckets");
        Ok(())
    }

    /// Current lifecycle state.
    pub fn status(&self) -> TableStatus {
        match self.state {
            State::Uninitialized => TableStatus::Uninitialized,
            State::InitFailed => TableStatus::InitFailed,
            State::Ready(_) => TableStatus::Ready,
        }
    }

    /// True once `initialize` has succeeded.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// Number of buckets, or `None` before successful initialization.
    pub fn capacity(&self) -> Option<u16> {
        self.ready().map(|b| b.capacity.get())
    }

    /// Number of stored entries; zero before initialization.
    pub fn len(&self) -> usize {
        self.ready().map_or(0, |b| b.arena.len())
    }

    /// True when no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bucket index `key` maps to, in `[0, capacity)`.
    pub fn index<K>(&self, key: &K) -> Option<u16>
    where
        K: AsRef<[u8]> + ?Sized,
    {
        self.ready().map(|b| bucket_index(key, b.capacity))
    }

    /// Number of entries chained in bucket `index`.
    pub fn bucket_len(&self, index: u16) -> Option<usize> {
        self.ready()?
            .chains
            .get(usize::from(index))
            .map(Chain::len)
    }

    /// Stores `value` under `key`.
    ///
    /// If `key` is already present its value is replaced in place and the old
    /// value is returned in [`Upsert::Updated`]; otherwise a new entry is
    /// appended to the end of the key's bucket. On failure the table is
    /// unchanged and `value` comes back inside [`Rejected`]: `NotInitialized`
    /// before initialization, `AllocationFailed` when the arena slot or the
    /// key copy cannot be allocated.
    pub fn add_or_update<K>(&mut self, key: &K, value: V) -> Result<Upsert<V>, Rejected<V>>
    where
        K: AsRef<[u8]> + ?Sized,
    {
        let key = key.as_ref();
        let Some(b) = self.ready_mut() else {
            return Err(Rejected {
                error: TableError::NotInitialized,
                value,
            });
        };
        let slot = b.slot(key);
        if let Some(current) = b
            .arena
            .find(&b.chains[slot], key)
            .and_then(|k| b.arena.value_mut(k))
        {
            let previous = core::mem::replace(current, value);
            trace!("updated \"{}\" in bucket {slot}", key.escape_ascii());
            return Ok(Upsert::Updated { previous });
        }
        let owned = match b.arena.reserve_one().and_then(|()| copy_key(key)) {
            Ok(owned) => owned,
            Err(error) => {
                warn!("cannot allocate entry for \"{}\": {error}", key.escape_ascii());
                return Err(Rejected { error, value });
            }
        };
        b.arena.append(&mut b.chains[slot], owned, value);
        trace!("added \"{}\" to bucket {slot}", key.escape_ascii());
        Ok(Upsert::Added)
    }

    /// The value stored under `key`, left in place.
    pub fn get<K>(&self, key: &K) -> Option<&V>
    where
        K: AsRef<[u8]> + ?Sized,
    {
        let key = key.as_ref();
        let b = self.ready()?;
        let k = b.arena.find(&b.chains[b.slot(key)], key)?;
        b.arena.value(k)
    }

    /// Mutable access to the value stored under `key`.
    pub fn get_mut<K>(&mut self, key: &K) -> Option<&mut V>
    where
        K: AsRef<[u8]> + ?Sized,
    {
        let key = key.as_ref();
        let b = self.ready_mut()?;
        let k = b.arena.find(&b.chains[b.slot(key)], key)?;
        b.arena.value_mut(k)
    }

    /// True when an entry for `key` exists.
    pub fn contains_key<K>(&self, key: &K) -> bool
    where
        K: AsRef<[u8]> + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Unlinks the entry for `key` and returns its value. The key copy is
    /// released; the value is handed back untouched.
    pub fn remove<K>(&mut self, key: &K) -> Option<V>
    where
        K: AsRef<[u8]> + ?Sized,
    {
        let key = key.as_ref();
        let b = self.ready_mut()?;
        let slot = b.slot(key);
        let k = b.arena.find(&b.chains[slot], key)?;
        let entry = b.arena.unlink(&mut b.chains[slot], k)?;
        trace!("removed \"{}\" from bucket {slot}", entry.key().escape_ascii());
        Some(entry.into_value())
    }

    /// Like [`remove`](Self::remove), but distinguishes an uninitialized table
    /// (`NotInitialized`) from a missing key (`KeyNotFound`).
    pub fn delete<K>(&mut self, key: &K) -> Result<V, TableError>
    where
        K: AsRef<[u8]> + ?Sized,
    {
        if !self.is_ready() {
            return Err(TableError::NotInitialized);
        }
        self.remove(key).ok_or(TableError::KeyNotFound)
    }

    fn ready(&self) -> Option<&Buckets<V>> {
        match &self.state {
            State::Ready(b) => Some(b),
            _ => None,
        }
    }

    fn ready_mut(&mut self) -> Option<&mut Buckets<V>> {
        match &mut self.state {
            State::Ready(b) => Some(b),
            _ => None,
        }
    }

    /// Structural check of every chain; `Ok` for a non-ready table.
    #[cfg(test)]
    pub(crate) fn check_chains(&self) -> Result<(), String> {
        match self.ready() {
            Some(b) => b.arena.validate(&b.chains, |k| b.slot(k)),
            None => Ok(()),
        }
    }
}
