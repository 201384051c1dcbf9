// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout pass bookkeeping: phases, scopes, queued work and scratch buffers.

use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};

use crate::edges::Axes;
use crate::size::MeasuredSize;

/// Where a [`LayoutManager`](crate::LayoutManager) is in its pass cycle.
///
/// A pass moves `Idle → Measuring → Notifying → Sweeping → Idle` and never
/// goes back to `Measuring` within the same pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No pass is running.
    #[default]
    Idle,
    /// Candidate nodes are being read and compared with their cached sizes.
    Measuring,
    /// Dependents of changed nodes are being told to redo their layout.
    Notifying,
    /// Records of detached nodes are being dropped.
    Sweeping,
}

/// The nodes a layout request covers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LayoutScope<N> {
    /// The given node and every node reachable from it through
    /// [`NodeTree::children`](crate::NodeTree::children).
    Root(N),
    /// Every node the registry tracks. Roots queued alongside it are still
    /// walked, so their untracked descendants are measured too.
    All,
}

/// What one layout pass did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PassReport {
    /// Nodes read through the style reader.
    pub measured: usize,
    /// Nodes whose width or height changed, including reported sizes.
    pub changed: usize,
    /// Dependents whose callback was invoked.
    pub notified: usize,
    /// Records dropped by the sweep.
    pub swept: usize,
    /// Requests recorded by callbacks and queued for the next pass.
    pub deferred: usize,
    /// Reader and callback failures that were logged and skipped.
    pub failed: usize,
}

/// Requests recorded while a pass is running.
///
/// Re-layout callbacks cannot reach the [`LayoutManager`](crate::LayoutManager)
/// that is notifying them. Whatever they want done goes through this handle
/// instead and is queued once the pass is back in [`Phase::Idle`]; it runs in
/// a later pass, never in the current one.
#[derive(Clone, Debug)]
pub struct Deferred<N, D> {
    pub(crate) measure: Vec<N>,
    pub(crate) scopes: Vec<LayoutScope<N>>,
    pub(crate) relayout: Vec<D>,
    pub(crate) widths: Vec<(N, f64)>,
    pub(crate) heights: Vec<(N, f64)>,
}

impl<N, D> Default for Deferred<N, D> {
    fn default() -> Self {
        Self {
            measure: Vec::new(),
            scopes: Vec::new(),
            relayout: Vec::new(),
            widths: Vec::new(),
            heights: Vec::new(),
        }
    }
}

impl<N, D> Deferred<N, D> {
    /// Creates an empty handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks for `node` to be measured in the next pass.
    pub fn set_needs_measure(&mut self, node: N) {
        self.measure.push(node);
    }

    /// Asks for another pass over `scope`.
    pub fn request_layout(&mut self, scope: LayoutScope<N>) {
        self.scopes.push(scope);
    }

    /// Asks for `dependent` to be notified in the next pass even if nothing
    /// it depends on changes.
    pub fn set_needs_relayout(&mut self, dependent: D) {
        self.relayout.push(dependent);
    }

    /// Announces the outer width a component assigned to `node`.
    pub fn report_outer_width(&mut self, node: N, width: f64) {
        self.widths.push((node, width));
    }

    /// Announces the outer height a component assigned to `node`.
    pub fn report_outer_height(&mut self, node: N, height: f64) {
        self.heights.push((node, height));
    }

    /// Number of recorded requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.measure.len()
            + self.scopes.len()
            + self.relayout.len()
            + self.widths.len()
            + self.heights.len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Insertion-ordered set used for coalescing queued work.
#[derive(Clone, Debug)]
pub(crate) struct OrderedSet<K> {
    order: Vec<K>,
    seen: HashSet<K>,
}

impl<K> Default for OrderedSet<K> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            seen: HashSet::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> OrderedSet<K> {
    pub(crate) fn insert(&mut self, key: K) -> bool {
        if self.seen.insert(key) {
            self.order.push(key);
            true
        } else {
            false
        }
    }

    pub(crate) fn as_slice(&self) -> &[K] {
        &self.order
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}

/// An outer size a component announced for a node.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) struct Reported {
    pub(crate) width: Option<f64>,
    pub(crate) height: Option<f64>,
}

/// Work waiting for the next pass. Everything in it is coalesced.
#[derive(Clone, Debug)]
pub(crate) struct Pending<N, D> {
    pub(crate) all: bool,
    pub(crate) roots: OrderedSet<N>,
    pub(crate) measure: OrderedSet<N>,
    pub(crate) relayout: OrderedSet<D>,
    pub(crate) reports: Vec<(N, Reported)>,
    report_index: HashMap<N, usize>,
}

impl<N, D> Default for Pending<N, D> {
    fn default() -> Self {
        Self {
            all: false,
            roots: OrderedSet::default(),
            measure: OrderedSet::default(),
            relayout: OrderedSet::default(),
            reports: Vec::new(),
            report_index: HashMap::new(),
        }
    }
}

impl<N, D> Pending<N, D>
where
    N: Copy + Eq + Hash,
    D: Copy + Eq + Hash,
{
    pub(crate) fn request(&mut self, scope: LayoutScope<N>) {
        match scope {
            LayoutScope::All => self.all = true,
            // Kept under `all`: a root may lead to nodes nobody tracks yet.
            LayoutScope::Root(root) => {
                self.roots.insert(root);
            }
        }
    }

    /// Queues a reported size unless it matches `cached` on every reported
    /// axis. A node that already has a queued report always takes the new
    /// value, so a later report can undo an earlier one.
    pub(crate) fn offer_report(
        &mut self,
        node: N,
        width: Option<f64>,
        height: Option<f64>,
        cached: Option<&MeasuredSize<D>>,
    ) {
        let unchanged = cached.is_some_and(|size| {
            width.is_none_or(|w| size.outer_width() == w)
                && height.is_none_or(|h| size.outer_height() == h)
        });
        if !unchanged || self.has_report(node) {
            self.report(node, width, height);
        }
    }

    pub(crate) fn report(&mut self, node: N, width: Option<f64>, height: Option<f64>) {
        let idx = *self.report_index.entry(node).or_insert_with(|| {
            self.reports.push((node, Reported::default()));
            self.reports.len() - 1
        });
        let entry = &mut self.reports[idx].1;
        // The latest report for an axis wins.
        if width.is_some() {
            entry.width = width;
        }
        if height.is_some() {
            entry.height = height;
        }
    }

    /// Moves everything `deferred` recorded into this queue. Reported sizes
    /// go through [`offer_report`](Self::offer_report) against `cached`.
    pub(crate) fn absorb<'r>(
        &mut self,
        deferred: &mut Deferred<N, D>,
        cached: impl Fn(N) -> Option<&'r MeasuredSize<D>>,
    ) where
        D: 'r,
    {
        for scope in deferred.scopes.drain(..) {
            self.request(scope);
        }
        for node in deferred.measure.drain(..) {
            self.measure.insert(node);
        }
        for dependent in deferred.relayout.drain(..) {
            self.relayout.insert(dependent);
        }
        for (node, width) in deferred.widths.drain(..) {
            self.offer_report(node, Some(width), None, cached(node));
        }
        for (node, height) in deferred.heights.drain(..) {
            self.offer_report(node, None, Some(height), cached(node));
        }
    }

    pub(crate) fn len(&self) -> usize {
        usize::from(self.all)
            + self.roots.len()
            + self.measure.len()
            + self.relayout.len()
            + self.reports.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn has_report(&self, node: N) -> bool {
        self.report_index.contains_key(&node)
    }

    pub(crate) fn clear(&mut self) {
        self.all = false;
        self.roots.clear();
        self.measure.clear();
        self.relayout.clear();
        self.reports.clear();
        self.report_index.clear();
    }
}

/// Reusable buffers for a pass.
///
/// Buffers keep their capacity between passes; [`reset`](Self::reset) only
/// clears them.
#[derive(Debug)]
pub(crate) struct PassScratch<N, D> {
    pub(crate) stack: Vec<N>,
    pub(crate) candidates: OrderedSet<N>,
    pub(crate) reported: HashSet<N>,
    pub(crate) changed: Vec<(N, Axes)>,
    pub(crate) notify: Notifications<D>,
}

impl<N, D> Default for PassScratch<N, D> {
    fn default() -> Self {
        Self {
            stack: Vec::new(),
            candidates: OrderedSet::default(),
            reported: HashSet::new(),
            changed: Vec::new(),
            notify: Notifications::default(),
        }
    }
}

impl<N, D> PassScratch<N, D>
where
    N: Copy + Eq + Hash,
    D: Copy + Eq + Hash,
{
    pub(crate) fn reset(&mut self) {
        self.stack.clear();
        self.candidates.clear();
        self.reported.clear();
        self.changed.clear();
        self.notify.clear();
    }
}

/// Dependents to notify in one pass, each once, in first-discovery order.
#[derive(Debug)]
pub(crate) struct Notifications<D> {
    entries: Vec<(D, Axes)>,
    index: HashMap<D, usize>,
}

impl<D> Default for Notifications<D> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<D: Copy + Eq + Hash> Notifications<D> {
    /// Queues `dependent`, unioning `axes` with any earlier entry for it.
    pub(crate) fn push(&mut self, dependent: D, axes: Axes) {
        if let Some(&idx) = self.index.get(&dependent) {
            self.entries[idx].1 |= axes;
        } else {
            self.index.insert(dependent, self.entries.len());
            self.entries.push((dependent, axes));
        }
    }

    pub(crate) fn entries(&self) -> &[(D, Axes)] {
        &self.entries
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_keeps_queued_roots() {
        let mut pending = Pending::<u32, u32>::default();
        pending.request(LayoutScope::Root(1));
        pending.request(LayoutScope::Root(1));
        assert_eq!(pending.roots.as_slice(), &[1]);

        pending.request(LayoutScope::All);
        pending.request(LayoutScope::Root(2));
        pending.request(LayoutScope::All);
        assert!(pending.all);
        assert_eq!(pending.roots.as_slice(), &[1, 2]);
        assert_eq!(pending.len(), 3);
    }

    #[test]
    fn reports_matching_the_cache_are_dropped() {
        let mut cached = MeasuredSize::<u32>::new();
        cached.set_outer_width(10.0);
        cached.set_outer_height(4.0);

        let mut pending = Pending::<u32, u32>::default();
        pending.offer_report(1, Some(10.0), None, Some(&cached));
        pending.offer_report(1, None, Some(4.0), Some(&cached));
        assert!(pending.is_empty());

        // Untracked nodes have nothing to match.
        pending.offer_report(2, Some(10.0), None, None);
        pending.offer_report(1, Some(12.0), None, Some(&cached));
        // Going back to the cached value must override the queued 12.
        pending.offer_report(1, Some(10.0), None, Some(&cached));
        assert_eq!(pending.reports.len(), 2);
        assert_eq!(pending.reports[1].1.width, Some(10.0));
    }

    #[test]
    fn reports_coalesce_per_node() {
        let mut pending = Pending::<u32, u32>::default();
        pending.report(3, Some(10.0), None);
        pending.report(3, None, Some(4.0));
        pending.report(3, Some(12.0), None);
        assert_eq!(
            pending.reports,
            [(
                3,
                Reported {
                    width: Some(12.0),
                    height: Some(4.0)
                }
            )]
        );
    }

    #[test]
    fn absorb_drains_deferred() {
        let mut deferred = Deferred::<u32, u32>::new();
        deferred.set_needs_measure(5);
        deferred.set_needs_measure(5);
        deferred.set_needs_relayout(9);
        deferred.request_layout(LayoutScope::Root(1));
        deferred.report_outer_width(5, 20.0);
        deferred.report_outer_height(6, 8.0);
        assert_eq!(deferred.len(), 6);

        let mut cached = MeasuredSize::new();
        cached.set_outer_height(8.0);
        let mut pending = Pending::default();
        pending.absorb(&mut deferred, |node| (node == 6).then_some(&cached));
        assert!(deferred.is_empty());
        assert_eq!(pending.measure.as_slice(), &[5]);
        assert_eq!(pending.relayout.as_slice(), &[9]);
        assert_eq!(pending.roots.as_slice(), &[1]);
        // Node 6 already has that height; only node 5's width is queued.
        assert_eq!(
            pending.reports,
            [(
                5,
                Reported {
                    width: Some(20.0),
                    height: None
                }
            )]
        );

        pending.clear();
        assert!(pending.is_empty());
    }

    #[test]
    fn notify_unions_axes_in_discovery_order() {
        let mut scratch = PassScratch::<u32, u32>::default();
        scratch.notify.push(7, Axes::WIDTH);
        scratch.notify.push(8, Axes::HEIGHT);
        scratch.notify.push(7, Axes::HEIGHT);
        assert_eq!(
            scratch.notify.entries(),
            [(7, Axes::all()), (8, Axes::HEIGHT)]
        );

        scratch.reset();
        assert!(scratch.notify.entries().is_empty());
        scratch.notify.push(8, Axes::WIDTH);
        assert_eq!(scratch.notify.entries(), [(8, Axes::WIDTH)]);
    }
}
