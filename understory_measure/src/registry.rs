// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registry of measured sizes and the dependents registered on them.

use core::fmt;
use core::marker::PhantomData;

use crate::size::MeasuredSize;
use crate::store::{HashStore, SizeStore};

/// Maps nodes to their [`MeasuredSize`] and, through it, to the dependents
/// that consume that size.
///
/// The registry is tolerant of speculative use: looking up or removing a node
/// it never tracked is a no-op that returns `None`/`false`, since components
/// routinely query nodes they do not own.
///
/// Removing a node from the visual tree does not tell the registry anything.
/// Call [`sweep_detached`](Self::sweep_detached) between passes to drop
/// records of nodes that are gone.
///
/// # Type Parameters
///
/// - `N`: Node identity.
/// - `D`: Dependent identity.
/// - `S`: Storage strategy, see [`store`](crate::store). Defaults to [`HashStore`].
///
/// # Example
///
/// ```
/// use understory_measure::DependencyRegistry;
///
/// let mut registry = DependencyRegistry::<u32, &str>::new();
/// registry.add_dependent(1, "panel");
/// registry.get_or_insert(2);
/// registry.get_or_insert(3);
///
/// // Only node 2 is still in the tree.
/// let removed = registry.sweep_detached(|node| node == 2);
/// assert_eq!(removed, 2);
/// assert!(registry.get(1).is_none());
/// assert!(registry.get(2).is_some());
/// ```
pub struct DependencyRegistry<N, D, S = HashStore<N, D>> {
    store: S,
    marker: PhantomData<fn(N) -> D>,
}

impl<N, D, S: Default> Default for DependencyRegistry<N, D, S> {
    fn default() -> Self {
        Self {
            store: S::default(),
            marker: PhantomData,
        }
    }
}

impl<N, D> DependencyRegistry<N, D> {
    /// Creates an empty registry backed by a [`HashStore`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<N, D, S> DependencyRegistry<N, D, S> {
    /// Creates an empty registry with the given storage strategy.
    #[must_use]
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            marker: PhantomData,
        }
    }
}

impl<N, D, S> DependencyRegistry<N, D, S>
where
    N: Copy,
    D: Copy + Eq,
    S: SizeStore<N, D>,
{
    /// Returns the record for `node`, without creating one.
    #[must_use]
    pub fn get(&self, node: N) -> Option<&MeasuredSize<D>> {
        self.store.get(node)
    }

    /// Returns the record for `node` mutably, without creating one.
    pub fn get_mut(&mut self, node: N) -> Option<&mut MeasuredSize<D>> {
        self.store.get_mut(node)
    }

    /// Returns the record for `node`, or `default` if there is none.
    ///
    /// Never creates an entry.
    #[must_use]
    pub fn get_or<'a>(&'a self, node: N, default: &'a MeasuredSize<D>) -> &'a MeasuredSize<D> {
        self.store.get(node).unwrap_or(default)
    }

    /// Returns the record for `node`, creating an unmeasured one if needed.
    pub fn get_or_insert(&mut self, node: N) -> &mut MeasuredSize<D> {
        self.store.get_or_insert(node)
    }

    /// Stores `size` for `node`, returning any record it replaced.
    pub fn put(&mut self, node: N, size: MeasuredSize<D>) -> Option<MeasuredSize<D>> {
        self.store.insert(node, size)
    }

    /// Removes the record for `node`. Returns `None` if it was not tracked.
    pub fn remove(&mut self, node: N) -> Option<MeasuredSize<D>> {
        self.store.remove(node)
    }

    /// Returns `true` if `node` has a record.
    #[must_use]
    pub fn contains(&self, node: N) -> bool {
        self.store.get(node).is_some()
    }

    /// Number of tracked nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if no node is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Iterates over the tracked nodes. Order is unspecified.
    pub fn nodes(&self) -> impl Iterator<Item = N> + '_ {
        self.store.nodes()
    }

    /// Registers `dependent` on `node`, creating the record if needed.
    ///
    /// Returns `false` if the dependent was already registered.
    pub fn add_dependent(&mut self, node: N, dependent: D) -> bool {
        self.store.get_or_insert(node).add_dependent(dependent)
    }

    /// Unregisters `dependent` from `node`.
    ///
    /// Returns `false` if `node` is untracked or the dependent was not
    /// registered on it.
    pub fn remove_dependent(&mut self, node: N, dependent: D) -> bool {
        self.store
            .get_mut(node)
            .is_some_and(|size| size.remove_dependent(dependent))
    }

    /// Returns the dependents registered on `node`; empty if untracked.
    #[must_use]
    pub fn dependents(&self, node: N) -> &[D] {
        self.store
            .get(node)
            .map(MeasuredSize::dependents)
            .unwrap_or_default()
    }

    /// Drops every record whose node fails `is_attached`.
    ///
    /// Visits every tracked node exactly once. Returns the number of records
    /// dropped.
    pub fn sweep_detached(&mut self, mut is_attached: impl FnMut(N) -> bool) -> usize {
        self.store.retain(|node, _| is_attached(node))
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        self.store.clear();
    }
}

impl<N, D, S: fmt::Debug> fmt::Debug for DependencyRegistry<N, D, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyRegistry")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edges::EdgeBox;
    use crate::store::SlotStore;
    use crate::style::ComputedBox;

    fn measured(width: f64) -> MeasuredSize<u32> {
        let mut size = MeasuredSize::new();
        size.update(ComputedBox {
            border: EdgeBox::uniform(1),
            content_width: width,
            content_height: width,
            ..ComputedBox::ZERO
        });
        size
    }

    #[test]
    fn lookups_do_not_create() {
        let registry = DependencyRegistry::<u32, u32>::new();
        let placeholder = MeasuredSize::new();
        assert!(registry.get(1).is_none());
        assert_eq!(registry.get_or(1, &placeholder).outer_width(), -1.0);
        assert!(registry.is_empty());
        assert!(registry.dependents(1).is_empty());
    }

    #[test]
    fn untracked_removal_is_a_no_op() {
        let mut registry = DependencyRegistry::<u32, u32>::new();
        assert!(registry.remove(4).is_none());
        assert!(!registry.remove_dependent(4, 1));
        registry.put(4, measured(3.0));
        assert!(registry.remove(4).is_some());
        assert!(registry.remove(4).is_none());
    }

    #[test]
    fn sweep_keeps_attached_record_untouched() {
        let mut registry = DependencyRegistry::<u32, u32>::new();
        registry.put(1, measured(1.0));
        registry.put(2, measured(2.0));
        registry.put(3, measured(3.0));
        registry.add_dependent(2, 77);
        let before = registry.get(2).cloned();

        let mut visits = 0;
        let removed = registry.sweep_detached(|node| {
            visits += 1;
            node == 2
        });

        assert_eq!(visits, 3);
        assert_eq!(removed, 2);
        assert!(registry.get(1).is_none());
        assert!(registry.get(3).is_none());
        assert_eq!(registry.get(2).cloned(), before);
    }

    #[test]
    fn dependents_round_trip() {
        let mut registry = DependencyRegistry::<u32, u32>::new();
        assert!(registry.add_dependent(1, 10));
        assert!(!registry.add_dependent(1, 10));
        assert!(registry.add_dependent(1, 11));
        assert_eq!(registry.dependents(1).len(), 2);
        assert!(registry.remove_dependent(1, 10));
        assert_eq!(registry.dependents(1), &[11]);
        // The record outlives its last dependent until swept.
        assert!(registry.remove_dependent(1, 11));
        assert!(registry.contains(1));
    }

    #[test]
    fn slot_backed_registry() {
        let mut registry =
            DependencyRegistry::<u32, u32, SlotStore<u32, u32>>::with_store(SlotStore::default());
        registry.put(5, measured(8.0));
        registry.get_or_insert(2);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(5).unwrap().outer_width(), 10.0);
        assert_eq!(registry.sweep_detached(|node| node != 5), 1);
        assert_eq!(registry.nodes().collect::<alloc::vec::Vec<_>>(), [2]);
    }
}
