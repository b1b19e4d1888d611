//! Mutation-tolerant traversal: the restartable walk and the external
//! cursor.
//!
//! A `Cursor` borrows nothing from its map. Every call takes the map as an
//! argument, so the caller keeps full use of the map between steps and may
//! remove entries mid-traversal. What makes that safe: positions are only
//! reshuffled by operations that bump the table generation, and the walk
//! restarts from the current range start whenever its snapshot goes stale.
//! Removal never bumps the generation, it only tombstones, and tombstones
//! are skipped.

use std::cell::Cell;
use std::hash::BuildHasher;
use std::rc::Rc;

use crate::key::MapKey;
use crate::ord_hash_map::OrdHashMap;
use crate::raw::RawTable;

/// Restartable insertion-order walk over a table's live range.
///
/// Holds the next position to examine and a generation snapshot. A table
/// whose generation moved on (grow, rehash, clear) has invalidated every
/// position, so the walk restarts from the table's current `start`; entries
/// already yielded before the restart may be yielded again from the new
/// layout.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Walk {
    at: usize,
    snapshot: u64,
}

impl Walk {
    pub(crate) fn new<K, V>(raw: &RawTable<K, V>) -> Self {
        Self {
            at: raw.start(),
            snapshot: raw.generation(),
        }
    }

    /// Index of the next live slot, or `None` when the range is used up.
    /// The returned index is consumed: the walk has moved past it.
    pub(crate) fn advance<K, V>(&mut self, raw: &RawTable<K, V>) -> Option<usize> {
        if self.snapshot != raw.generation() {
            self.snapshot = raw.generation();
            self.at = raw.start();
        }
        while self.at < raw.end() {
            let index = self.at;
            self.at += 1;
            if raw.is_live(index) {
                return Some(index);
            }
        }
        None
    }
}

/// The peek state machine. `has_next` commits: once it reports an entry,
/// `next` returns that entry even if it was removed from the map in
/// between.
enum PeekState<K, V> {
    NotPeeked,
    Peeked { key: K, value: V },
    Exhausted,
}

/// An external cursor over a map, created by [`OrdHashMap::cursor`].
///
/// The cursor registers itself with the map's traversal count for as long
/// as it lives; while any cursor is registered the map rejects new-key
/// insertion and rehashing. Removal (and value overwrite) stay legal, and
/// the cursor simply never yields removed entries it has not already
/// committed to.
///
/// Each method takes the map it was created from. Passing a different map
/// panics.
pub struct Cursor<K, V> {
    traversals: Rc<Cell<usize>>,
    walk: Walk,
    state: PeekState<K, V>,
    last: Option<K>,
}

impl<K, V> Cursor<K, V> {
    pub(crate) fn register<S>(map: &OrdHashMap<K, V, S>) -> Self {
        let traversals = map.traversals();
        traversals.set(traversals.get() + 1);
        Self {
            traversals: Rc::clone(traversals),
            walk: Walk::new(map.raw()),
            state: PeekState::NotPeeked,
            last: None,
        }
    }

    fn check_owner<S>(&self, map: &OrdHashMap<K, V, S>) {
        assert!(
            Rc::ptr_eq(&self.traversals, map.traversals()),
            "cursor used with a map it does not belong to"
        );
    }

    /// Whether another entry is available, peeking (and committing to) it
    /// without consuming it.
    pub fn has_next<S>(&mut self, map: &OrdHashMap<K, V, S>) -> bool
    where
        K: Clone,
        V: Clone,
    {
        self.check_owner(map);
        match self.state {
            PeekState::Peeked { .. } => true,
            PeekState::Exhausted => false,
            PeekState::NotPeeked => {
                while let Some(index) = self.walk.advance(map.raw()) {
                    if let Some((key, value)) = map.raw().pair_at(index) {
                        self.state = PeekState::Peeked {
                            key: key.clone(),
                            value: value.clone(),
                        };
                        return true;
                    }
                }
                self.state = PeekState::Exhausted;
                false
            }
        }
    }

    /// The next entry in insertion order, or `None` when the traversal is
    /// finished. Yields the pair a prior `has_next` committed to, if any.
    #[allow(clippy::should_implement_trait)]
    pub fn next<S>(&mut self, map: &OrdHashMap<K, V, S>) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        if !self.has_next(map) {
            return None;
        }
        match std::mem::replace(&mut self.state, PeekState::NotPeeked) {
            PeekState::Peeked { key, value } => {
                self.last = Some(key.clone());
                Some((key, value))
            }
            // has_next returned true, so the state was Peeked.
            _ => None,
        }
    }

    /// Remove the entry most recently returned by `next` from the map,
    /// returning its value. `None` when `next` has not yielded since the
    /// last removal, or when the entry is already gone.
    pub fn remove_current<S>(&mut self, map: &mut OrdHashMap<K, V, S>) -> Option<V>
    where
        K: MapKey,
        S: BuildHasher,
    {
        self.check_owner(map);
        let key = self.last.take()?;
        map.remove(&key)
    }
}

impl<K, V> Drop for Cursor<K, V> {
    fn drop(&mut self) {
        let active = self.traversals.get();
        debug_assert!(active > 0);
        self.traversals.set(active.saturating_sub(1));
    }
}
