//! ord-hashmap: A single-threaded hash map that iterates in insertion
//! order, tolerates removal during traversal, and can compare keys by
//! identity instead of value.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: the associative engine behind a dynamic language's dictionary
//!   type, built in safe, verifiable layers so each piece can be reasoned
//!   about independently.
//! - Layers:
//!   - RawTable<K, V>: hash-agnostic storage. A flat entries array keyed
//!     by insertion position (tombstones stay in place until the next
//!     rebuild) plus an open-addressing bins array mapping hash buckets
//!     to positions. Takes precomputed hashes and equality closures only.
//!   - MapKey / KeyMode: the key contract. Every key type carries both a
//!     value equality (`Eq`/`Hash`) and an identity equality
//!     (`identity_eq`/`identity_hash`, address-based for `Rc`, `Arc`, and
//!     `&T`); the table-wide mode selects which pair is in force.
//!   - OrdHashMap<K, V, S>: public API. Owns the `BuildHasher`, the key
//!     mode, and the traversal guard; implements the std-map surface plus
//!     visitors and cursors.
//!   - Walk / Cursor: traversal. Borrowing iterators for the common case;
//!     a detached, deletion-tolerant cursor for walking while removing.
//!
//! Constraints
//! - Single-threaded: the traversal guard is an `Rc<Cell<usize>>`, so the
//!   map is `!Send`/`!Sync`.
//! - Insertion order is the iteration order: first insertion fixes a key's
//!   position, overwrite keeps it, remove-then-reinsert moves it to the
//!   back.
//! - Small maps (capacity 8 and below) allocate no bins and look keys up
//!   by scanning; the first growth past that crosses permanently to open
//!   addressing.
//! - Probes terminate structurally: bins are twice the entry capacity and
//!   the probe recurrence visits every bin once per period, so a probe
//!   always meets an `Empty` bin within one pass.
//!
//! Traversal policy
//! - Borrowing iterators need no machinery; the borrow checker already
//!   forbids mutation while they live.
//! - A `Cursor` borrows nothing and takes the map on every call. While
//!   any cursor lives, operations that would reallocate or reshuffle
//!   (new-key insert, rehash, mode switch) fail with `MutationError`;
//!   removal and overwrite stay legal. Cursors survive reshuffles anyway:
//!   every reallocation bumps a table generation, and a cursor whose
//!   snapshot went stale restarts from the head instead of reading
//!   through a stale position.
//! - `has_next` commits: the peeked pair is captured, and the following
//!   `next` returns it even if the entry was removed in between. The
//!   capture clones the pair; for handle keys like `Rc<T>` that is a
//!   refcount bump, which is also what keeps the pair alive.
//!
//! Hasher and rehashing invariants
//! - Each entry stores its key's `u64` hash under the current mode, and
//!   growth re-places bins from stored hashes; user hashing runs only on
//!   lookup-shaped operations and on explicit `rehash`/`set_key_mode`.
//! - An explicit rehash re-derives hashes and equality under the current
//!   mode and collapses entries that newly compare equal; the earliest
//!   occurrence keeps its position and value.
//!
//! Notes and non-goals
//! - No internal locking; callers serialize writers. The one sanctioned
//!   interleaving is removal during cursor traversal.
//! - No key-sorted order, no range queries, no persistence.
//! - Keys are immutable post-insert; there is no `key_mut`. Callers whose
//!   keys mutate behind the map call `rehash()` afterwards, mirroring how
//!   the backed language repairs a dictionary whose keys changed.
//! - `Clone` is a structural copy with its own traversal state; cursors
//!   on the original do not constrain the copy.

mod cursor;
mod iter;
mod key;
mod ord_hash_map;
mod ord_hash_map_proptest;
mod raw;

// Public surface
pub use cursor::Cursor;
pub use iter::{IntoIter, Iter, IterMut, Keys, Values};
pub use key::{KeyMode, MapKey};
pub use ord_hash_map::{ConcurrentModification, MutationError, OrdHashMap};
