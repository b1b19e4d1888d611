//! OrdHashMap: the public insertion-ordered map over the raw table.
//!
//! This layer owns the hashing policy (a `BuildHasher` plus the table-wide
//! `KeyMode`) and the traversal guard, and translates the borrowed-key API
//! surface into the hash/equality closures the raw layer works with. Every
//! key's hash is computed here exactly once per operation; the raw layer
//! stores it and never calls back into user code on growth.

use std::borrow::Borrow;
use std::cell::Cell;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hasher};
use std::rc::Rc;

use thiserror::Error;

use crate::cursor::{Cursor, Walk};
use crate::iter::{IntoIter, Iter, IterMut, Keys, Values};
use crate::key::{KeyMode, MapKey};
use crate::raw::RawTable;

/// A structural mutation was attempted while cursors are registered.
///
/// Cursors survive entry removal but not array reallocation, so the
/// operations that may reallocate or reshuffle are refused outright while
/// any cursor is live. The failed operation has not touched the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MutationError {
    /// A new key cannot be added during iteration. Overwriting an existing
    /// key's value is fine.
    #[error("can't add a new key into the map during iteration")]
    InsertDuringIteration,
    /// The table cannot be rebuilt during iteration.
    #[error("can't rehash the map during iteration")]
    RehashDuringIteration,
}

/// A count-checked visit saw fewer live entries than the caller promised.
///
/// Returned by [`OrdHashMap::visit_exact`] when the table was mutated
/// between taking the count and finishing the visit, e.g. by a visitor
/// callback reaching the map through a side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error(
    "detected invalid map contents due to unsynchronized modification: \
     expected {expected} entries, visited {visited}"
)]
pub struct ConcurrentModification {
    pub expected: usize,
    pub visited: usize,
}

/// A hash map that iterates in insertion order.
///
/// Ordering rules: first insertion of a key fixes its position; overwriting
/// the value keeps the position; removing and re-inserting a key moves it
/// to the back. Lookup, insertion, and removal are amortized O(1).
///
/// Keys compare by value equality by default. [`set_key_mode`] switches the
/// whole table to identity comparison (and back), rehashing every entry;
/// see [`MapKey`] for what identity means per key type.
///
/// Traversal comes in two strengths. The borrowing iterators ([`iter`] and
/// friends) are plain Rust iterators. A [`cursor`] additionally tolerates
/// entry removal while it is walking, at the price of blocking new-key
/// insertion and rehashing for as long as it lives.
///
/// The map is single-threaded (`!Send`/`!Sync`).
///
/// [`set_key_mode`]: OrdHashMap::set_key_mode
/// [`iter`]: OrdHashMap::iter
/// [`cursor`]: OrdHashMap::cursor
pub struct OrdHashMap<K, V, S = RandomState> {
    raw: RawTable<K, V>,
    hasher: S,
    mode: KeyMode,
    // Count of live cursors. Shared with each Cursor, which also uses the
    // allocation's address to prove it belongs to this map.
    traversals: Rc<Cell<usize>>,
}

fn hash_one<S, Q>(hasher: &S, mode: KeyMode, key: &Q) -> u64
where
    S: BuildHasher,
    Q: MapKey + ?Sized,
{
    let mut state = hasher.build_hasher();
    match mode {
        KeyMode::Value => key.hash(&mut state),
        KeyMode::Identity => key.identity_hash(&mut state),
    }
    state.finish()
}

fn keys_eq<K, Q>(mode: KeyMode, stored: &K, probe: &Q) -> bool
where
    K: Borrow<Q>,
    Q: MapKey + ?Sized,
{
    match mode {
        KeyMode::Value => stored.borrow() == probe,
        KeyMode::Identity => stored.borrow().identity_eq(probe),
    }
}

impl<K, V> OrdHashMap<K, V>
where
    K: MapKey,
{
    /// An empty map with value-mode keys and a randomly seeded hasher.
    /// Allocates nothing until the first insertion.
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    /// An empty map with room for `capacity` entries before the first
    /// growth.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K, V, S> Default for OrdHashMap<K, V, S>
where
    K: MapKey,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

// Crate-internal accessors the cursor machinery drives the map through.
impl<K, V, S> OrdHashMap<K, V, S> {
    pub(crate) fn raw(&self) -> &RawTable<K, V> {
        &self.raw
    }

    pub(crate) fn traversals(&self) -> &Rc<Cell<usize>> {
        &self.traversals
    }
}

impl<K, V, S> OrdHashMap<K, V, S>
where
    K: MapKey,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            raw: RawTable::new(),
            hasher,
            mode: KeyMode::Value,
            traversals: Rc::new(Cell::new(0)),
        }
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            raw: RawTable::with_capacity(capacity),
            hasher,
            mode: KeyMode::Value,
            traversals: Rc::new(Cell::new(0)),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.len() == 0
    }

    /// Entry capacity before the next growth. Growth counts positions used,
    /// not live entries, so a churned map can grow below full `len`.
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// The current key comparison mode.
    pub fn key_mode(&self) -> KeyMode {
        self.mode
    }

    /// Insert a pair. An existing key keeps its iteration position and gets
    /// its value overwritten (returned as `Some`); a new key is appended at
    /// the back.
    ///
    /// Overwriting is legal while cursors are live. Adding a new key is
    /// not: it fails with [`MutationError::InsertDuringIteration`] before
    /// writing anything.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, MutationError> {
        let hash = hash_one(&self.hasher, self.mode, &key);
        let mode = self.mode;
        if let Some(index) = self.raw.find(hash, |stored| keys_eq(mode, stored, &key)) {
            return Ok(self.raw.replace_value(index, value));
        }
        if self.traversals.get() > 0 {
            return Err(MutationError::InsertDuringIteration);
        }
        self.raw.append(hash, key, value);
        Ok(None)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: MapKey + ?Sized,
    {
        self.get_key_value(key).map(|(_, value)| value)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: MapKey + ?Sized,
    {
        let hash = hash_one(&self.hasher, self.mode, key);
        let mode = self.mode;
        let index = self.raw.find(hash, |stored| keys_eq(mode, stored, key))?;
        self.raw.pair_at(index)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: MapKey + ?Sized,
    {
        let hash = hash_one(&self.hasher, self.mode, key);
        let mode = self.mode;
        let index = self.raw.find(hash, |stored| keys_eq(mode, stored, key))?;
        self.raw.pair_mut_at(index).map(|(_, value)| value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: MapKey + ?Sized,
    {
        self.get_key_value(key).is_some()
    }

    /// Remove a key, returning its value. Legal while cursors are live;
    /// committed-but-unconsumed cursor entries are still yielded.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: MapKey + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: MapKey + ?Sized,
    {
        let hash = hash_one(&self.hasher, self.mode, key);
        let mode = self.mode;
        self.raw.remove(hash, |stored| keys_eq(mode, stored, key))
    }

    /// Remove and return the entry at the front of the insertion order.
    pub fn shift(&mut self) -> Option<(K, V)> {
        let start = self.raw.start();
        self.raw.remove_at(start)
    }

    /// The entry at the front of the insertion order.
    pub fn first(&self) -> Option<(&K, &V)> {
        self.raw.pair_at(self.raw.start())
    }

    /// The entry at the back of the insertion order.
    pub fn last(&self) -> Option<(&K, &V)> {
        let end = self.raw.end();
        end.checked_sub(1).and_then(|index| self.raw.pair_at(index))
    }

    /// Keep only the entries for which `f` returns true, in insertion
    /// order. Surviving entries keep their positions.
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        let (start, end) = (self.raw.start(), self.raw.end());
        for index in start..end {
            let keep = match self.raw.pair_mut_at(index) {
                Some((key, value)) => f(key, value),
                None => continue,
            };
            if !keep {
                let _ = self.raw.remove_at(index);
            }
        }
    }

    /// Remove every entry. Allocation and storage mode are kept; live
    /// cursors restart against the now-empty table.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Rebuild the table by recomputing every key's hash under the current
    /// mode. Keys whose externally-visible state changed since insertion
    /// become findable again; entries that now compare equal to an earlier
    /// entry are dropped (the earlier one keeps its position and value).
    ///
    /// Fails with [`MutationError::RehashDuringIteration`] while cursors
    /// are live.
    pub fn rehash(&mut self) -> Result<(), MutationError> {
        if self.traversals.get() > 0 {
            return Err(MutationError::RehashDuringIteration);
        }
        let hasher = &self.hasher;
        let mode = self.mode;
        self.raw.rehash(
            |key| hash_one(hasher, mode, key),
            |a, b| keys_eq(mode, a, b),
        );
        Ok(())
    }

    /// Switch the key comparison mode for the whole table, rehashing every
    /// entry. A no-op when the mode is unchanged. Entries that collide
    /// under the new mode collapse to the earliest one.
    pub fn set_key_mode(&mut self, mode: KeyMode) -> Result<(), MutationError> {
        if mode == self.mode {
            return Ok(());
        }
        if self.traversals.get() > 0 {
            return Err(MutationError::RehashDuringIteration);
        }
        self.mode = mode;
        self.rehash()
    }

    /// Call `f(key, value, ordinal)` for each live entry in insertion
    /// order. Never fails: it visits whatever is live.
    pub fn visit_all(&self, mut f: impl FnMut(&K, &V, usize)) {
        let mut walk = Walk::new(&self.raw);
        let mut ordinal = 0;
        while let Some(index) = walk.advance(&self.raw) {
            if let Some((key, value)) = self.raw.pair_at(index) {
                f(key, value, ordinal);
                ordinal += 1;
            }
        }
    }

    /// Count-checked visit for snapshot consumers: visits at most
    /// `expected` entries and fails if fewer were live. Serialization
    /// writes a count prefix and then calls `visit_exact(len, ..)` so the
    /// prefix is guaranteed to match what follows.
    pub fn visit_exact(
        &self,
        expected: usize,
        mut f: impl FnMut(&K, &V, usize),
    ) -> Result<(), ConcurrentModification> {
        let mut walk = Walk::new(&self.raw);
        let mut visited = 0;
        while visited < expected {
            let Some(index) = walk.advance(&self.raw) else {
                break;
            };
            if let Some((key, value)) = self.raw.pair_at(index) {
                f(key, value, visited);
                visited += 1;
            }
        }
        if visited < expected {
            return Err(ConcurrentModification { expected, visited });
        }
        Ok(())
    }

    /// A deletion-tolerant external cursor positioned before the first
    /// entry. While it (or any other cursor) lives, new-key insertion and
    /// rehashing fail; see [`Cursor`] for the traversal contract.
    pub fn cursor(&self) -> Cursor<K, V> {
        Cursor::register(self)
    }

    /// Iterate over `(&K, &V)` in insertion order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.raw.range_slots(), self.raw.len())
    }

    /// Iterate over `(&K, &mut V)` in insertion order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let live = self.raw.len();
        IterMut::new(self.raw.range_slots_mut(), live)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }
}

impl<K, V, S> Clone for OrdHashMap<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    /// Structural copy: same entries, order, capacity, and mode. The copy
    /// has its own traversal counter, so cursors on the original do not
    /// constrain it.
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            hasher: self.hasher.clone(),
            mode: self.mode,
            traversals: Rc::new(Cell::new(0)),
        }
    }
}

impl<K, V, S> fmt::Debug for OrdHashMap<K, V, S>
where
    K: MapKey + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for OrdHashMap<K, V, S>
where
    K: MapKey,
    S: BuildHasher,
{
    /// Panics if a new key arrives while cursors are live; use
    /// [`OrdHashMap::insert`] where that needs handling.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            if let Err(err) = self.insert(key, value) {
                panic!("{err}");
            }
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for OrdHashMap<K, V, S>
where
    K: MapKey,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

impl<K, V, S> IntoIterator for OrdHashMap<K, V, S>
where
    K: MapKey,
    S: BuildHasher,
{
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        let live = self.raw.len();
        IntoIter::new(self.raw.into_entries(), live)
    }
}

impl<'a, K, V, S> IntoIterator for &'a OrdHashMap<K, V, S>
where
    K: MapKey,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut OrdHashMap<K, V, S>
where
    K: MapKey,
    S: BuildHasher,
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

#[cfg(test)]
impl<K, V, S> OrdHashMap<K, V, S>
where
    K: MapKey,
    S: BuildHasher,
{
    /// Test oracle: raw invariants plus the map-level ones (iteration
    /// agrees with len, every iterated key is findable).
    pub(crate) fn check_consistency(&self) {
        self.raw.assert_invariants();
        let mut seen = 0;
        for (key, value) in self.iter() {
            let found = self.get(key);
            assert!(found.is_some(), "iterated key resolves through get");
            assert!(std::ptr::eq(found.unwrap(), value));
            seen += 1;
        }
        assert_eq!(seen, self.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn filled(pairs: &[(u32, &str)]) -> OrdHashMap<u32, String> {
        let mut map = OrdHashMap::new();
        for &(key, value) in pairs {
            assert_eq!(map.insert(key, value.to_string()), Ok(None));
        }
        map.check_consistency();
        map
    }

    #[test]
    fn new_map_is_empty_and_unallocated() {
        let map: OrdHashMap<u32, u32> = OrdHashMap::new();
        assert_eq!(map.len(), 0);
        assert!(map.is_empty());
        assert_eq!(map.capacity(), 0);
        assert_eq!(map.key_mode(), KeyMode::Value);
        assert_eq!(map.get(&1), None);
        assert_eq!(map.first(), None);
        assert_eq!(map.last(), None);
    }

    #[test]
    fn insert_get_remove_round() {
        let mut map = filled(&[(1, "one"), (2, "two")]);
        assert_eq!(map.get(&1).map(String::as_str), Some("one"));
        assert_eq!(map.get_key_value(&2), Some((&2, &"two".to_string())));
        assert!(map.contains_key(&2));
        assert_eq!(map.remove(&1), Some("one".to_string()));
        assert_eq!(map.remove(&1), None);
        assert_eq!(map.len(), 1);
        map.check_consistency();
    }

    #[test]
    fn overwrite_keeps_position_and_returns_old() {
        let mut map = filled(&[(1, "a"), (2, "b"), (3, "c")]);
        assert_eq!(map.insert(2, "B".to_string()), Ok(Some("b".to_string())));
        let keys: Vec<u32> = map.keys().copied().collect();
        assert_eq!(keys, vec![1, 2, 3], "overwrite does not reorder");
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn reinsertion_after_removal_moves_to_the_back() {
        let mut map = filled(&[(1, "a"), (2, "b"), (3, "c")]);
        assert_eq!(map.remove(&2), Some("b".to_string()));
        assert_eq!(map.insert(2, "b2".to_string()), Ok(None));
        let keys: Vec<u32> = map.keys().copied().collect();
        assert_eq!(keys, vec![1, 3, 2]);
        map.check_consistency();
    }

    #[test]
    fn borrowed_key_lookups() {
        let mut map: OrdHashMap<String, u32> = OrdHashMap::new();
        assert_eq!(map.insert("alpha".to_string(), 1), Ok(None));
        assert_eq!(map.get("alpha"), Some(&1));
        assert!(map.contains_key("alpha"));
        assert_eq!(map.remove("alpha"), Some(1));
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut map = filled(&[(7, "x")]);
        if let Some(value) = map.get_mut(&7) {
            value.push('!');
        }
        assert_eq!(map.get(&7).map(String::as_str), Some("x!"));
    }

    struct FnvState;

    struct FnvHasher(u64);

    impl BuildHasher for FnvState {
        type Hasher = FnvHasher;

        fn build_hasher(&self) -> FnvHasher {
            FnvHasher(0xcbf29ce484222325)
        }
    }

    impl Hasher for FnvHasher {
        fn write(&mut self, bytes: &[u8]) {
            for &byte in bytes {
                self.0 = (self.0 ^ u64::from(byte)).wrapping_mul(0x100000001b3);
            }
        }

        fn finish(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn with_hasher_uses_the_supplied_hasher() {
        let mut map: OrdHashMap<String, u32, FnvState> = OrdHashMap::with_hasher(FnvState);
        for n in 0..32u32 {
            assert_eq!(map.insert(format!("key{n}"), n), Ok(None));
        }
        assert_eq!(map.get("key7"), Some(&7));
        assert_eq!(map.remove("key7"), Some(7));
        map.rehash().unwrap();
        assert_eq!(map.get("key8"), Some(&8));
        assert_eq!(map.len(), 31);
        map.check_consistency();
    }

    #[test]
    fn shift_first_last_follow_insertion_order() {
        let mut map = filled(&[(1, "a"), (2, "b"), (3, "c")]);
        assert_eq!(map.first(), Some((&1, &"a".to_string())));
        assert_eq!(map.last(), Some((&3, &"c".to_string())));
        assert_eq!(map.shift(), Some((1, "a".to_string())));
        assert_eq!(map.first(), Some((&2, &"b".to_string())));
        assert_eq!(map.shift(), Some((2, "b".to_string())));
        assert_eq!(map.shift(), Some((3, "c".to_string())));
        assert_eq!(map.shift(), None);
        map.check_consistency();
    }

    #[test]
    fn retain_keeps_order_of_survivors() {
        let mut map = filled(&[(1, "a"), (2, "b"), (3, "c"), (4, "d")]);
        map.retain(|key, _| key % 2 == 0);
        let keys: Vec<u32> = map.keys().copied().collect();
        assert_eq!(keys, vec![2, 4]);
        map.check_consistency();
    }

    #[test]
    fn clear_empties_but_keeps_capacity() {
        let mut map = filled(&[(1, "a"), (2, "b")]);
        let capacity = map.capacity();
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.capacity(), capacity);
        assert_eq!(map.insert(9, "z".to_string()), Ok(None));
        assert_eq!(map.get(&9).map(String::as_str), Some("z"));
        map.check_consistency();
    }

    #[test]
    fn insert_with_live_cursor_fails_without_side_effects() {
        let mut map = filled(&[(1, "a"), (2, "b")]);
        let mut cursor = map.cursor();
        assert!(cursor.has_next(&map));

        let err = map.insert(3, "c".to_string()).unwrap_err();
        assert_eq!(err, MutationError::InsertDuringIteration);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&3), None);

        // Overwrite is not a structural change and stays legal.
        assert_eq!(
            map.insert(1, "A".to_string()),
            Ok(Some("a".to_string()))
        );

        drop(cursor);
        assert_eq!(map.insert(3, "c".to_string()), Ok(None));
        map.check_consistency();
    }

    #[test]
    fn rehash_and_mode_switch_fail_during_iteration() {
        let mut map = filled(&[(1, "a")]);
        let cursor = map.cursor();
        assert_eq!(map.rehash(), Err(MutationError::RehashDuringIteration));
        assert_eq!(
            map.set_key_mode(KeyMode::Identity),
            Err(MutationError::RehashDuringIteration)
        );
        // Re-asserting the current mode is a no-op, not a rehash.
        assert_eq!(map.set_key_mode(KeyMode::Value), Ok(()));
        drop(cursor);
        assert_eq!(map.rehash(), Ok(()));
        assert_eq!(map.set_key_mode(KeyMode::Identity), Ok(()));
        assert_eq!(map.key_mode(), KeyMode::Identity);
    }

    #[test]
    fn identity_mode_separates_equal_allocations() {
        let a = Rc::new("key".to_string());
        let b = Rc::new("key".to_string());

        let mut map: OrdHashMap<Rc<String>, u32> = OrdHashMap::new();
        assert_eq!(map.insert(Rc::clone(&a), 1), Ok(None));
        assert_eq!(map.insert(Rc::clone(&b), 2), Ok(Some(1)));
        assert_eq!(map.len(), 1, "value mode collapses equal contents");

        map.set_key_mode(KeyMode::Identity).unwrap();
        assert_eq!(map.insert(Rc::clone(&b), 3), Ok(None));
        assert_eq!(map.len(), 2, "identity mode tells allocations apart");
        assert_eq!(map.get(&a), Some(&2));
        assert_eq!(map.get(&b), Some(&3));
        map.check_consistency();
    }

    #[test]
    fn mode_switch_collapses_duplicates_first_wins() {
        let a = Rc::new("dup".to_string());
        let b = Rc::new("dup".to_string());
        let mut map: OrdHashMap<Rc<String>, u32> = OrdHashMap::new();
        map.set_key_mode(KeyMode::Identity).unwrap();
        assert_eq!(map.insert(Rc::clone(&a), 1), Ok(None));
        assert_eq!(map.insert(Rc::clone(&b), 2), Ok(None));
        assert_eq!(map.len(), 2);

        map.set_key_mode(KeyMode::Value).unwrap();
        assert_eq!(map.len(), 1, "equal contents collapse on the way back");
        assert_eq!(map.get(&a), Some(&1), "first occurrence wins");
        map.check_consistency();
    }

    #[test]
    fn visit_all_passes_ordinals() {
        let map = filled(&[(5, "e"), (6, "f"), (7, "g")]);
        let mut seen = Vec::new();
        map.visit_all(|key, value, ordinal| seen.push((*key, value.clone(), ordinal)));
        assert_eq!(
            seen,
            vec![
                (5, "e".to_string(), 0),
                (6, "f".to_string(), 1),
                (7, "g".to_string(), 2)
            ]
        );
    }

    #[test]
    fn visit_exact_matches_len_and_reports_shortfall() {
        let map = filled(&[(1, "a"), (2, "b")]);
        let mut count = 0;
        assert_eq!(map.visit_exact(map.len(), |_, _, _| count += 1), Ok(()));
        assert_eq!(count, 2);

        let err = map.visit_exact(5, |_, _, _| {}).unwrap_err();
        assert_eq!(
            err,
            ConcurrentModification {
                expected: 5,
                visited: 2
            }
        );

        // Fewer than live: visits exactly that many, no error.
        let mut first = Vec::new();
        assert_eq!(map.visit_exact(1, |key, _, _| first.push(*key)), Ok(()));
        assert_eq!(first, vec![1]);
    }

    #[test]
    fn clone_is_independent_of_the_original() {
        let map = filled(&[(1, "a"), (2, "b")]);
        let _cursor = map.cursor();

        let mut copy = map.clone();
        // The copy has its own traversal counter and storage.
        assert_eq!(copy.insert(3, "c".to_string()), Ok(None));
        assert_eq!(copy.remove(&1), Some("a".to_string()));
        assert_eq!(map.len(), 2);
        assert_eq!(copy.len(), 2);
        assert_eq!(map.get(&1).map(String::as_str), Some("a"));
        copy.check_consistency();
    }

    #[test]
    fn error_messages_name_the_violation() {
        assert_eq!(
            MutationError::InsertDuringIteration.to_string(),
            "can't add a new key into the map during iteration"
        );
        assert_eq!(
            MutationError::RehashDuringIteration.to_string(),
            "can't rehash the map during iteration"
        );
        let report = ConcurrentModification {
            expected: 4,
            visited: 1,
        }
        .to_string();
        assert!(report.contains("expected 4 entries, visited 1"));
    }

    #[test]
    fn debug_renders_as_a_map_in_order() {
        let map = filled(&[(2, "b"), (1, "a")]);
        assert_eq!(format!("{map:?}"), r#"{2: "b", 1: "a"}"#);
    }

    #[test]
    fn collection_traits_round_trip_in_order() {
        let map: OrdHashMap<u32, u32> = (0..5u32).map(|k| (k, k * k)).collect();
        let pairs: Vec<(u32, u32)> = (&map).into_iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(pairs, vec![(0, 0), (1, 1), (2, 4), (3, 9), (4, 16)]);

        let mut map = map;
        for (_, value) in &mut map {
            *value += 1;
        }
        let owned: Vec<(u32, u32)> = map.into_iter().collect();
        assert_eq!(owned, vec![(0, 1), (1, 2), (2, 5), (3, 10), (4, 17)]);
    }

    #[test]
    fn extend_appends_in_sequence_order() {
        let mut map: OrdHashMap<u32, u32> = OrdHashMap::new();
        map.extend([(3, 30), (1, 10)]);
        map.extend([(2, 20), (3, 31)]);
        let pairs: Vec<(u32, u32)> = map.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(pairs, vec![(3, 31), (1, 10), (2, 20)]);
    }
}
