// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Storage strategies for measured sizes.
//!
//! A [`DependencyRegistry`](crate::DependencyRegistry) does not care where the
//! per-node records live. Two strategies are provided:
//!
//! - [`HashStore`]: a side table keyed by node identity. Works for any
//!   hashable key.
//! - [`SlotStore`]: the record sits in a slot addressed by the node's own
//!   dense index, the moral equivalent of tagging the node itself. Needs
//!   [`DenseKey`] and is faster for compact, slot-allocated ids.
//!
//! The strategy is a type parameter chosen when the registry is built.

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashMap;

use crate::size::MeasuredSize;

/// A key that maps to a small, dense `usize` index.
///
/// Indices should be compact (close to `0..n`) since [`SlotStore`] allocates
/// a slot for every index up to the largest one seen.
///
/// # Panics
///
/// Nothing checks the bound. Storing a key with a huge index, such as one
/// built from `u32::MAX`, in a [`SlotStore`] asks for memory in proportion
/// to that index: the allocation fails and aborts the process, or panics on
/// capacity overflow. Use a [`HashStore`] for sparse ids.
pub trait DenseKey: Copy + Eq {
    /// Returns the dense index for this key.
    fn index(self) -> usize;
}

impl DenseKey for u32 {
    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl DenseKey for usize {
    #[inline]
    fn index(self) -> usize {
        self
    }
}

/// Where a registry keeps its [`MeasuredSize`] records.
///
/// Implementations hold at most one record per node.
pub trait SizeStore<N, D>: Default {
    /// Returns the record for `node`, if any.
    fn get(&self, node: N) -> Option<&MeasuredSize<D>>;

    /// Returns the record for `node` mutably, if any.
    fn get_mut(&mut self, node: N) -> Option<&mut MeasuredSize<D>>;

    /// Returns the record for `node`, inserting an unmeasured one if absent.
    fn get_or_insert(&mut self, node: N) -> &mut MeasuredSize<D>;

    /// Stores `size` for `node`, returning the record it replaced.
    fn insert(&mut self, node: N, size: MeasuredSize<D>) -> Option<MeasuredSize<D>>;

    /// Removes and returns the record for `node`.
    fn remove(&mut self, node: N) -> Option<MeasuredSize<D>>;

    /// Keeps only the records for which `keep` returns `true`, visiting each
    /// record exactly once. Returns the number of records dropped.
    fn retain(&mut self, keep: impl FnMut(N, &mut MeasuredSize<D>) -> bool) -> usize;

    /// Number of records.
    fn len(&self) -> usize;

    /// Returns `true` if there are no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the tracked nodes. Order is unspecified.
    fn nodes(&self) -> impl Iterator<Item = N> + '_;

    /// Drops every record.
    fn clear(&mut self);
}

/// Side table keyed by node identity.
#[derive(Debug, Clone)]
pub struct HashStore<N, D> {
    map: HashMap<N, MeasuredSize<D>>,
}

impl<N, D> Default for HashStore<N, D> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
        }
    }
}

impl<N, D> SizeStore<N, D> for HashStore<N, D>
where
    N: Copy + Eq + Hash,
{
    fn get(&self, node: N) -> Option<&MeasuredSize<D>> {
        self.map.get(&node)
    }

    fn get_mut(&mut self, node: N) -> Option<&mut MeasuredSize<D>> {
        self.map.get_mut(&node)
    }

    fn get_or_insert(&mut self, node: N) -> &mut MeasuredSize<D> {
        self.map.entry(node).or_default()
    }

    fn insert(&mut self, node: N, size: MeasuredSize<D>) -> Option<MeasuredSize<D>> {
        self.map.insert(node, size)
    }

    fn remove(&mut self, node: N) -> Option<MeasuredSize<D>> {
        self.map.remove(&node)
    }

    fn retain(&mut self, mut keep: impl FnMut(N, &mut MeasuredSize<D>) -> bool) -> usize {
        let before = self.map.len();
        self.map.retain(|&node, size| keep(node, size));
        before - self.map.len()
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn nodes(&self) -> impl Iterator<Item = N> + '_ {
        self.map.keys().copied()
    }

    fn clear(&mut self) {
        self.map.clear();
    }
}

/// Records stored in slots addressed by [`DenseKey::index`].
///
/// Each slot keeps the full key next to the record, so two keys that share an
/// index (for example generational ids after slot reuse) never alias: a lookup
/// with a stale key misses.
///
/// Slots are never shrunk: after a record at index `i` is removed, the store
/// still holds `i + 1` slots until [`clear`](SizeStore::clear).
///
/// # Panics
///
/// Inserting grows the slot vector to the key's index; see [`DenseKey`] for
/// what happens with huge indices.
#[derive(Debug, Clone)]
pub struct SlotStore<N, D> {
    slots: Vec<Option<(N, MeasuredSize<D>)>>,
    len: usize,
}

impl<N, D> Default for SlotStore<N, D> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
        }
    }
}

impl<N, D> SlotStore<N, D>
where
    N: DenseKey,
{
    fn slot(&self, node: N) -> Option<&(N, MeasuredSize<D>)> {
        self.slots
            .get(node.index())?
            .as_ref()
            .filter(|(key, _)| *key == node)
    }

    fn slot_mut(&mut self, node: N) -> Option<&mut (N, MeasuredSize<D>)> {
        self.slots
            .get_mut(node.index())?
            .as_mut()
            .filter(|(key, _)| *key == node)
    }
}

impl<N, D> SizeStore<N, D> for SlotStore<N, D>
where
    N: DenseKey,
{
    fn get(&self, node: N) -> Option<&MeasuredSize<D>> {
        self.slot(node).map(|(_, size)| size)
    }

    fn get_mut(&mut self, node: N) -> Option<&mut MeasuredSize<D>> {
        self.slot_mut(node).map(|(_, size)| size)
    }

    fn get_or_insert(&mut self, node: N) -> &mut MeasuredSize<D> {
        let idx = node.index();
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }
        let slot = &mut self.slots[idx];
        match slot {
            Some((key, _)) if *key == node => {}
            // A stale key held the slot; its record goes with it.
            Some(_) => *slot = None,
            None => self.len += 1,
        }
        &mut slot.get_or_insert_with(|| (node, MeasuredSize::new())).1
    }

    fn insert(&mut self, node: N, size: MeasuredSize<D>) -> Option<MeasuredSize<D>> {
        let idx = node.index();
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }
        match self.slots[idx].replace((node, size)) {
            Some((key, old)) if key == node => Some(old),
            Some(_) => None,
            None => {
                self.len += 1;
                None
            }
        }
    }

    fn remove(&mut self, node: N) -> Option<MeasuredSize<D>> {
        let slot = self.slots.get_mut(node.index())?;
        if !matches!(slot, Some((key, _)) if *key == node) {
            return None;
        }
        self.len -= 1;
        slot.take().map(|(_, size)| size)
    }

    fn retain(&mut self, mut keep: impl FnMut(N, &mut MeasuredSize<D>) -> bool) -> usize {
        let mut dropped = 0;
        for slot in &mut self.slots {
            if let Some((node, size)) = slot
                && !keep(*node, size)
            {
                *slot = None;
                dropped += 1;
            }
        }
        self.len -= dropped;
        dropped
    }

    fn len(&self) -> usize {
        self.len
    }

    fn nodes(&self) -> impl Iterator<Item = N> + '_ {
        self.slots.iter().flatten().map(|(node, _)| *node)
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    /// A generational id: slot index plus generation.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    struct Gen(u32, u32);

    impl DenseKey for Gen {
        fn index(self) -> usize {
            self.0 as usize
        }
    }

    fn exercise<S: SizeStore<Gen, u32>>() {
        let mut store = S::default();
        assert!(store.is_empty());
        assert!(store.get(Gen(0, 1)).is_none());
        assert!(store.remove(Gen(0, 1)).is_none());

        store.get_or_insert(Gen(3, 1)).add_dependent(9);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(Gen(3, 1)).unwrap().dependents(), &[9]);
        // Same record on the second call.
        store.get_or_insert(Gen(3, 1)).add_dependent(10);
        assert_eq!(store.get(Gen(3, 1)).unwrap().dependents().len(), 2);

        assert!(store.insert(Gen(1, 1), MeasuredSize::new()).is_none());
        assert!(store.insert(Gen(1, 1), MeasuredSize::new()).is_some());
        assert_eq!(store.len(), 2);

        let mut nodes: Vec<_> = store.nodes().collect();
        nodes.sort_by_key(|n| n.0);
        assert_eq!(nodes, [Gen(1, 1), Gen(3, 1)]);

        let mut visited = 0;
        let dropped = store.retain(|node, _| {
            visited += 1;
            node.0 == 3
        });
        assert_eq!(visited, 2);
        assert_eq!(dropped, 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(Gen(1, 1)).is_none());

        assert!(store.remove(Gen(3, 1)).is_some());
        assert!(store.remove(Gen(3, 1)).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn hash_store_contract() {
        exercise::<HashStore<Gen, u32>>();
    }

    #[test]
    fn slot_store_contract() {
        exercise::<SlotStore<Gen, u32>>();
    }

    #[test]
    fn slot_store_grows_to_the_largest_index() {
        let mut store = SlotStore::<u32, u32>::default();
        store.insert(9, MeasuredSize::new());
        assert_eq!(store.slots.len(), 10);
        assert_eq!(store.len(), 1);

        // Smaller indices reuse the existing slots.
        store.get_or_insert(4);
        assert_eq!(store.slots.len(), 10);

        store.remove(9);
        assert_eq!(store.slots.len(), 10);
        store.clear();
        assert!(store.slots.is_empty());
    }

    #[test]
    fn slot_store_stale_generation_misses() {
        let mut store = SlotStore::<Gen, u32>::default();
        store.get_or_insert(Gen(0, 1)).add_dependent(1);

        assert!(store.get(Gen(0, 2)).is_none());
        assert!(store.remove(Gen(0, 2)).is_none());

        // A newer generation takes the slot over with a fresh record.
        let fresh = store.get_or_insert(Gen(0, 2));
        assert!(!fresh.has_dependents());
        assert_eq!(store.len(), 1);
        assert!(store.get(Gen(0, 1)).is_none());
    }
}
