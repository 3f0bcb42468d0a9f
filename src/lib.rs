//! keyed-table: a fixed-capacity, separately chained table mapping byte-string
//! keys to caller-owned values.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a small, predictable associative container whose bucket count is
//!   chosen once and never changes.
//! - Layers:
//!   - `hash`: the 16-bit `h * 31 + byte` string hash and its reduction to a
//!     bucket index.
//!   - `chain`: a slotmap arena of entries plus per-bucket doubly-linked
//!     chains threaded through it with generational handles.
//!   - `KeyedTable<V>`: lifecycle (explicit initialization) and the public
//!     add/update/get/remove/delete API.
//!
//! Constraints
//! - Single-threaded: mutation needs `&mut KeyedTable`; sharing across threads
//!   is the caller's business.
//! - Capacity is a `u16` fixed at initialization; there is no rehashing.
//! - Keys are arbitrary byte strings (`K: AsRef<[u8]>`, so `&str`, `String`,
//!   `&[u8]` and `Vec<u8>` all work); they need not be UTF-8. Keys are unique
//!   across the whole table and compared byte-exactly.
//! - Every chain traversal advances one link per step and ends at the tail.
//!
//! Lifecycle
//! - `KeyedTable::new` yields an uninitialized table; `initialize(capacity)`
//!   must succeed before anything else does. Until then mutating operations
//!   return `TableError::NotInitialized` and lookups return `None`.
//! - A failed initialization (zero capacity, allocation failure) may be
//!   retried. A second initialization of a ready table is rejected with
//!   `TableError::AlreadyInitialized`; existing entries are untouched.
//!
//! Value ownership
//! - The table copies keys but never copies, inspects or disposes of values
//!   on its own. A value leaves the table only by being handed back:
//!   `Upsert::Updated { previous }` on overwrite, `remove`/`delete` on
//!   removal, and `Rejected::value` when an insert fails.
//!
//! Hash folding
//! - The accumulator wraps in `i16` and is folded with `unsigned_abs`, so the
//!   most negative accumulator (`i16::MIN`) hashes to `32768`.
//!
//! Notes and non-goals
//! - No iteration over keys; `bucket_len` exposes chain lengths only.
//! - No resizing; pick a capacity large enough to keep chains short.
//! - Allocation failures are reported as `TableError::AllocationFailed`:
//!   the bucket array, the arena slot for a new entry and the key copy are all
//!   reserved fallibly before anything is linked, so a failed insert leaves
//!   the table unchanged. The arena's initial sentinel slot, allocated once by
//!   `initialize` after the bucket array, is the only infallible allocation.

mod chain;
mod error;
pub mod hash;
mod keyed_table;
mod keyed_table_proptest;

// Public surface
pub use error::TableError;
pub use keyed_table::{KeyedTable, Rejected, TableStatus, Upsert};
