//! Storage core: an insertion-ordered entries array indexed by an
//! open-addressing bins array.
//!
//! Entries live in a flat `Vec<Option<Slot>>`; position is insertion order,
//! `None` is a tombstone. Lookups go through `bins` once the table has
//! crossed the linear-scan capacity; each bin is `Empty`, `Deleted`, or the
//! index of a slot. All operations here take a precomputed hash and an
//! equality closure: this layer never hashes or compares keys itself, the
//! same seam the public layer would otherwise get from a raw hash table.

/// Capacity at or below which a table keeps no bins array and resolves
/// lookups by scanning the live range. Also the smallest capacity ever
/// allocated. Growing past it is a one-way crossing: capacity never shrinks.
pub(crate) const LINEAR_SCAN_CAPACITY: usize = 8;

/// One entry: the pair plus the key's hash under the table's current key
/// mode. The cache lets growth re-place bins without touching user code and
/// lets lookups skip equality on hash mismatch.
#[derive(Clone)]
pub(crate) struct Slot<K, V> {
    pub(crate) hash: u64,
    pub(crate) key: K,
    pub(crate) value: V,
}

/// A bucket of the open-addressing index.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Bin {
    /// Never occupied. Terminates probe sequences.
    Empty,
    /// Previously occupied. Probes continue through it; placement may
    /// reuse it.
    Deleted,
    /// Occupied by the slot at this entries index.
    Index(usize),
}

/// The hash-agnostic storage engine under `OrdHashMap`.
///
/// Invariants (checked wholesale by `assert_invariants` in tests):
/// - all live slots lie in `[start, end)`, and when the range is non-empty
///   both boundary slots are live;
/// - `live` counts the `Some` slots in the range;
/// - in open-addressing mode every live slot is referenced by exactly one
///   `Bin::Index`, reachable from its cached hash, and non-`Empty` bins
///   never outnumber the entries capacity (half the bins array), which is
///   what guarantees probes terminate.
#[derive(Clone)]
pub(crate) struct RawTable<K, V> {
    entries: Vec<Option<Slot<K, V>>>,
    bins: Vec<Bin>,
    start: usize,
    end: usize,
    live: usize,
    generation: u64,
}

impl<K, V> RawTable<K, V> {
    pub(crate) fn new() -> Self {
        Self::with_capacity(0)
    }

    /// An empty table with room for `capacity` entries before the first
    /// growth. Capacities above the linear-scan threshold allocate bins up
    /// front; zero allocates nothing.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut table = Self {
            entries: Vec::new(),
            bins: Vec::new(),
            start: 0,
            end: 0,
            live: 0,
            generation: 0,
        };
        if capacity > 0 {
            let capacity = capacity.next_power_of_two().max(LINEAR_SCAN_CAPACITY);
            table.entries.resize_with(capacity, || None);
            if capacity > LINEAR_SCAN_CAPACITY {
                table.bins = vec![Bin::Empty; capacity * 2];
            }
        }
        table
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn start(&self) -> usize {
        self.start
    }

    pub(crate) fn end(&self) -> usize {
        self.end
    }

    fn open_addressing(&self) -> bool {
        !self.bins.is_empty()
    }

    /// Bucket visit order for `hash`: a `5b + 1` linear-congruential walk.
    /// Over a power-of-two modulus that recurrence is a full-period
    /// permutation of the bucket space (Hull-Dobell), so one pass of `len`
    /// steps visits every bin exactly once and then repeats.
    fn probe(len: usize, hash: u64) -> impl Iterator<Item = usize> {
        debug_assert!(len.is_power_of_two());
        let mask = len - 1;
        let mut bucket = (hash as usize) & mask;
        std::iter::repeat_with(move || {
            let current = bucket;
            bucket = bucket.wrapping_mul(5).wrapping_add(1) & mask;
            current
        })
        .take(len)
    }

    /// Index of the live slot matching `hash` and `eq`, if any.
    pub(crate) fn find(&self, hash: u64, mut eq: impl FnMut(&K) -> bool) -> Option<usize> {
        if self.live == 0 {
            return None;
        }
        if self.open_addressing() {
            for bucket in Self::probe(self.bins.len(), hash) {
                match self.bins[bucket] {
                    Bin::Empty => return None,
                    Bin::Deleted => {}
                    Bin::Index(index) => {
                        if let Some(slot) = self.entries[index].as_ref() {
                            if slot.hash == hash && eq(&slot.key) {
                                return Some(index);
                            }
                        }
                    }
                }
            }
            None
        } else {
            for index in self.start..self.end {
                if let Some(slot) = self.entries[index].as_ref() {
                    if slot.hash == hash && eq(&slot.key) {
                        return Some(index);
                    }
                }
            }
            None
        }
    }

    /// Append a new slot at `end`, growing (and compacting) first when the
    /// entries array is exhausted. The caller has already established that
    /// the key is absent.
    pub(crate) fn append(&mut self, hash: u64, key: K, value: V) -> usize {
        if self.end == self.capacity() {
            self.grow();
        }
        let index = self.end;
        self.entries[index] = Some(Slot { hash, key, value });
        self.end += 1;
        self.live += 1;
        if self.open_addressing() {
            self.place_bin(hash, index);
        }
        index
    }

    /// Remove the slot matching `hash` and `eq`, if present: its bin becomes
    /// `Deleted` (never `Empty`, so colliding probes keep walking), the slot
    /// becomes a tombstone, and the live range tightens.
    pub(crate) fn remove(&mut self, hash: u64, mut eq: impl FnMut(&K) -> bool) -> Option<(K, V)> {
        if self.live == 0 {
            return None;
        }
        if self.open_addressing() {
            for bucket in Self::probe(self.bins.len(), hash) {
                match self.bins[bucket] {
                    Bin::Empty => return None,
                    Bin::Deleted => {}
                    Bin::Index(index) => {
                        let matches = match self.entries[index].as_ref() {
                            Some(slot) => slot.hash == hash && eq(&slot.key),
                            None => false,
                        };
                        if matches {
                            self.bins[bucket] = Bin::Deleted;
                            return self.take_slot(index);
                        }
                    }
                }
            }
            None
        } else {
            let found = (self.start..self.end).find(|&index| {
                self.entries[index]
                    .as_ref()
                    .map(|slot| slot.hash == hash && eq(&slot.key))
                    .unwrap_or(false)
            })?;
            self.take_slot(found)
        }
    }

    /// Remove the live slot at `index` without an equality check; the bin is
    /// located through the slot's cached hash.
    pub(crate) fn remove_at(&mut self, index: usize) -> Option<(K, V)> {
        let hash = self.entries.get(index)?.as_ref()?.hash;
        if self.open_addressing() {
            self.unlink_bin(hash, index);
        }
        self.take_slot(index)
    }

    /// Recompute every live key's hash, drop later duplicates under the new
    /// equality (the first occurrence keeps its position and value), compact
    /// tombstones, and rebuild bins. Bumps the generation.
    pub(crate) fn rehash(
        &mut self,
        mut hash_of: impl FnMut(&K) -> u64,
        mut eq: impl FnMut(&K, &K) -> bool,
    ) {
        let drained: Vec<Slot<K, V>> = self.entries[self.start..self.end]
            .iter_mut()
            .filter_map(Option::take)
            .collect();
        self.start = 0;
        self.end = 0;
        self.live = 0;
        for bin in &mut self.bins {
            *bin = Bin::Empty;
        }
        self.generation += 1;
        for mut slot in drained {
            slot.hash = hash_of(&slot.key);
            if self.find(slot.hash, |key| eq(key, &slot.key)).is_some() {
                continue;
            }
            self.append(slot.hash, slot.key, slot.value);
        }
    }

    /// Drop every entry, keep the allocations and the storage mode, and bump
    /// the generation so in-flight traversals restart.
    pub(crate) fn clear(&mut self) {
        for slot in &mut self.entries {
            *slot = None;
        }
        for bin in &mut self.bins {
            *bin = Bin::Empty;
        }
        self.start = 0;
        self.end = 0;
        self.live = 0;
        self.generation += 1;
    }

    pub(crate) fn is_live(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(Option::is_some)
    }

    /// Key/value references of the live slot at `index`.
    pub(crate) fn pair_at(&self, index: usize) -> Option<(&K, &V)> {
        self.entries
            .get(index)?
            .as_ref()
            .map(|slot| (&slot.key, &slot.value))
    }

    pub(crate) fn pair_mut_at(&mut self, index: usize) -> Option<(&K, &mut V)> {
        self.entries
            .get_mut(index)?
            .as_mut()
            .map(|slot| (&slot.key, &mut slot.value))
    }

    /// Overwrite the value of the live slot at `index`, returning the old
    /// value. Positions and bins are untouched.
    pub(crate) fn replace_value(&mut self, index: usize, value: V) -> Option<V> {
        let slot = self.entries.get_mut(index)?.as_mut()?;
        Some(std::mem::replace(&mut slot.value, value))
    }

    /// The `[start, end)` window of slots, tombstones included. Borrowing
    /// iterators walk this directly.
    pub(crate) fn range_slots(&self) -> &[Option<Slot<K, V>>] {
        &self.entries[self.start..self.end]
    }

    pub(crate) fn range_slots_mut(&mut self) -> &mut [Option<Slot<K, V>>] {
        let (start, end) = (self.start, self.end);
        &mut self.entries[start..end]
    }

    pub(crate) fn into_entries(self) -> Vec<Option<Slot<K, V>>> {
        self.entries
    }

    /// Double the entries array (the first growth allocates the minimum)
    /// and rebuild. Tombstones are reclaimed here and nowhere else.
    fn grow(&mut self) {
        let new_capacity = (self.capacity() * 2).max(LINEAR_SCAN_CAPACITY);
        let mut fresh: Vec<Option<Slot<K, V>>> = Vec::with_capacity(new_capacity);
        fresh.resize_with(new_capacity, || None);
        let mut next = 0;
        for slot in &mut self.entries[self.start..self.end] {
            if let Some(slot) = slot.take() {
                fresh[next] = Some(slot);
                next += 1;
            }
        }
        self.entries = fresh;
        self.start = 0;
        self.end = next;
        self.live = next;
        self.generation += 1;
        self.rebuild_bins();
    }

    /// Size bins for the current capacity and re-place every live slot from
    /// its cached hash. Tables at or below the linear-scan capacity keep no
    /// bins.
    fn rebuild_bins(&mut self) {
        let capacity = self.capacity();
        if capacity <= LINEAR_SCAN_CAPACITY {
            debug_assert!(self.bins.is_empty());
            return;
        }
        self.bins.clear();
        self.bins.resize(capacity * 2, Bin::Empty);
        for index in 0..self.end {
            let hash = match &self.entries[index] {
                Some(slot) => slot.hash,
                None => continue,
            };
            self.place_bin(hash, index);
        }
    }

    /// Write `Index(index)` into the first `Empty` or `Deleted` bin on the
    /// probe path. The occupancy invariant keeps at least half the bins
    /// `Empty`, so a full-period pass cannot miss.
    fn place_bin(&mut self, hash: u64, index: usize) {
        for bucket in Self::probe(self.bins.len(), hash) {
            match self.bins[bucket] {
                Bin::Empty | Bin::Deleted => {
                    self.bins[bucket] = Bin::Index(index);
                    return;
                }
                Bin::Index(_) => {}
            }
        }
        unreachable!("no free bin in a full probe cycle");
    }

    /// Mark the bin holding `Index(index)` as `Deleted`.
    fn unlink_bin(&mut self, hash: u64, index: usize) {
        for bucket in Self::probe(self.bins.len(), hash) {
            match self.bins[bucket] {
                Bin::Index(i) if i == index => {
                    self.bins[bucket] = Bin::Deleted;
                    return;
                }
                Bin::Empty => break,
                _ => {}
            }
        }
        unreachable!("live slot has no bin on its probe path");
    }

    /// Tombstone the slot at `index` and tighten the live range: a removal
    /// at `start` advances it past contiguous tombstones, a removal of the
    /// last live slot retreats `end`.
    fn take_slot(&mut self, index: usize) -> Option<(K, V)> {
        let slot = self.entries[index].take()?;
        self.live -= 1;
        if index == self.start {
            while self.start < self.end && self.entries[self.start].is_none() {
                self.start += 1;
            }
        }
        if index + 1 == self.end {
            while self.end > self.start && self.entries[self.end - 1].is_none() {
                self.end -= 1;
            }
        }
        Some((slot.key, slot.value))
    }
}

#[cfg(test)]
impl<K, V> RawTable<K, V> {
    /// Test oracle: every structural invariant in one assertion pass.
    pub(crate) fn assert_invariants(&self) {
        assert!(self.start <= self.end, "range is ordered");
        assert!(self.end <= self.capacity(), "range within capacity");
        let live = self.entries[self.start..self.end]
            .iter()
            .filter(|slot| slot.is_some())
            .count();
        assert_eq!(live, self.live, "live count matches occupied slots");
        for (index, slot) in self.entries.iter().enumerate() {
            if !(self.start..self.end).contains(&index) {
                assert!(slot.is_none(), "no slots outside the live range");
            }
        }
        if self.start < self.end {
            assert!(self.entries[self.start].is_some(), "start is tight");
            assert!(self.entries[self.end - 1].is_some(), "end is tight");
        }
        if self.open_addressing() {
            assert!(self.bins.len().is_power_of_two());
            assert_eq!(self.bins.len(), self.capacity() * 2);
            let occupied = self
                .bins
                .iter()
                .filter(|bin| !matches!(bin, Bin::Empty))
                .count();
            assert!(
                occupied <= self.capacity(),
                "probe termination margin holds"
            );
            let mut owners = vec![0usize; self.capacity()];
            for bin in &self.bins {
                if let Bin::Index(index) = bin {
                    assert!(
                        self.entries[*index].is_some(),
                        "bins never point at tombstones"
                    );
                    owners[*index] += 1;
                }
            }
            for index in self.start..self.end {
                let Some(slot) = self.entries[index].as_ref() else {
                    continue;
                };
                assert_eq!(owners[index], 1, "live slot owns exactly one bin");
                let mut reachable = false;
                for bucket in Self::probe(self.bins.len(), slot.hash) {
                    match self.bins[bucket] {
                        Bin::Empty => break,
                        Bin::Index(i) if i == index => {
                            reachable = true;
                            break;
                        }
                        _ => {}
                    }
                }
                assert!(reachable, "live slot reachable on its probe path");
            }
        } else {
            assert!(self.capacity() <= LINEAR_SCAN_CAPACITY);
        }
    }
}
