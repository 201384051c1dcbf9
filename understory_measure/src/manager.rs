// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layout orchestrator and the collaborators it drives.

use core::fmt;
use core::hash::Hash;

use tracing::{debug, debug_span, trace, warn};

use crate::edges::Axes;
use crate::error::UnstableLayout;
use crate::pass::{Deferred, LayoutScope, PassReport, PassScratch, Pending, Phase};
use crate::registry::DependencyRegistry;
use crate::size::MeasuredSize;
use crate::store::{HashStore, SizeStore};
use crate::style::StyleReader;

/// The live visual tree, as far as the orchestrator needs to see it.
pub trait NodeTree<N> {
    /// Returns `true` if `node` is still part of the tree.
    ///
    /// Must be free of side effects. Called once per tracked node per sweep.
    fn is_attached(&self, node: N) -> bool;

    /// The direct children of `node` that a [`LayoutScope::Root`] pass should
    /// also measure.
    fn children(&self, node: N) -> impl Iterator<Item = N> + '_;
}

/// Receives size-change notifications during [`Phase::Notifying`].
///
/// Requests a dependent wants to make of the manager go through `deferred`;
/// they run in a later pass. An `Err` is logged and does not stop the other
/// dependents from being notified.
///
/// Any `FnMut(D, Axes, &mut Deferred<N, D>) -> Result<(), E>` closure is a
/// callback.
pub trait Relayout<N, D> {
    /// Why a dependent failed to redo its layout.
    type Error: fmt::Debug;

    /// Called at most once per pass for each dependent with the union of the
    /// axes that changed among the nodes it depends on.
    fn on_dependency_size_changed(
        &mut self,
        dependent: D,
        axes: Axes,
        deferred: &mut Deferred<N, D>,
    ) -> Result<(), Self::Error>;
}

impl<N, D, E, F> Relayout<N, D> for F
where
    E: fmt::Debug,
    F: FnMut(D, Axes, &mut Deferred<N, D>) -> Result<(), E>,
{
    type Error = E;

    fn on_dependency_size_changed(
        &mut self,
        dependent: D,
        axes: Axes,
        deferred: &mut Deferred<N, D>,
    ) -> Result<(), E> {
        self(dependent, axes, deferred)
    }
}

/// Makes the host's measurements trustworthy before a pass reads them.
///
/// Some hosts report stale geometry until they are made to reflow. The
/// strategy runs once per pass, before the first read, with the nodes about to
/// be measured. It has no effect on cached state.
///
/// Any `FnMut(&[N])` closure is a strategy.
pub trait ReflowStrategy<N> {
    /// Forces the host to reflow ahead of reading `candidates`.
    fn force_reflow(&mut self, candidates: &[N]);
}

/// A [`ReflowStrategy`] for hosts that measure reliably.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NoReflow;

impl<N> ReflowStrategy<N> for NoReflow {
    #[inline]
    fn force_reflow(&mut self, _candidates: &[N]) {}
}

impl<N, F> ReflowStrategy<N> for F
where
    F: FnMut(&[N]),
{
    fn force_reflow(&mut self, candidates: &[N]) {
        self(candidates);
    }
}

/// Default bound on [`LayoutManager::layout_until_stable`].
pub const DEFAULT_MAX_PASSES: usize = 100;

/// Keeps the measured sizes of a tree current and tells dependents when the
/// sizes they consume change.
///
/// Work is queued with [`request_layout`](Self::request_layout) and the
/// `set_needs_*` / `report_*` methods, then run by
/// [`run_pending_pass`](Self::run_pending_pass). A pass:
///
/// 1. applies reported sizes and reads every candidate node through the
///    [`StyleReader`], comparing against the cached [`MeasuredSize`];
/// 2. notifies each dependent of the changed nodes exactly once, with the
///    axes that changed;
/// 3. drops records of nodes the [`NodeTree`] no longer has.
///
/// A pass holds the manager mutably until it returns, so nothing can nest a
/// pass inside it. Requests callbacks make through [`Deferred`] are queued for
/// the next pass, which is how mutually dependent nodes settle: each round is
/// a separate, terminating pass.
///
/// # Type Parameters
///
/// - `N`: Node identity.
/// - `D`: Dependent identity.
/// - `S`: Registry storage, see [`store`](crate::store).
/// - `F`: Reflow strategy run before each pass reads anything.
///
/// # Example
///
/// ```
/// use core::convert::Infallible;
/// use understory_measure::{Axes, ComputedBox, Deferred, LayoutManager, LayoutScope, NodeTree};
///
/// struct Flat;
///
/// impl NodeTree<u32> for Flat {
///     fn is_attached(&self, _: u32) -> bool {
///         true
///     }
///     fn children(&self, _: u32) -> impl Iterator<Item = u32> + '_ {
///         core::iter::empty()
///     }
/// }
///
/// let mut manager = LayoutManager::<u32, u32>::new();
/// // Dependent 100 lays itself out using the size of node 1.
/// manager.register_dependency(100, 1);
///
/// let mut width = 40.0;
/// let mut notified = Vec::new();
/// for _ in 0..2 {
///     let mut reader = |_: u32| -> Result<ComputedBox, Infallible> {
///         Ok(ComputedBox {
///             content_width: width,
///             content_height: 10.0,
///             ..ComputedBox::ZERO
///         })
///     };
///     let mut relayout = |d: u32, axes: Axes, _: &mut Deferred<u32, u32>| -> Result<(), Infallible> {
///         notified.push((d, axes));
///         Ok(())
///     };
///     manager.layout(LayoutScope::Root(1), &mut reader, &Flat, &mut relayout);
///     width = 60.0;
/// }
///
/// assert_eq!(notified, [(100, Axes::all()), (100, Axes::WIDTH)]);
/// assert_eq!(manager.get_measured_size(1).unwrap().outer_width(), 60.0);
/// ```
pub struct LayoutManager<N, D, S = HashStore<N, D>, F = NoReflow> {
    registry: DependencyRegistry<N, D, S>,
    reflow: F,
    pending: Pending<N, D>,
    work: Pending<N, D>,
    deferred: Deferred<N, D>,
    scratch: PassScratch<N, D>,
    phase: Phase,
    passes: u64,
    max_passes: usize,
    unmeasured: MeasuredSize<D>,
}

impl<N, D> Default for LayoutManager<N, D> {
    fn default() -> Self {
        Self::with_parts(HashStore::default(), NoReflow)
    }
}

impl<N, D> LayoutManager<N, D> {
    /// Creates a manager backed by a [`HashStore`] that does not force
    /// reflows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<N, D, S> LayoutManager<N, D, S> {
    /// Creates a manager with the given storage strategy.
    #[must_use]
    pub fn with_store(store: S) -> Self {
        Self::with_parts(store, NoReflow)
    }
}

impl<N, D, S, F> LayoutManager<N, D, S, F> {
    fn with_parts(store: S, reflow: F) -> Self {
        Self {
            registry: DependencyRegistry::with_store(store),
            reflow,
            pending: Pending::default(),
            work: Pending::default(),
            deferred: Deferred::default(),
            scratch: PassScratch::default(),
            phase: Phase::Idle,
            passes: 0,
            max_passes: DEFAULT_MAX_PASSES,
            unmeasured: MeasuredSize::new(),
        }
    }

    /// Replaces the reflow strategy.
    #[must_use]
    pub fn with_reflow<G>(self, reflow: G) -> LayoutManager<N, D, S, G> {
        LayoutManager {
            registry: self.registry,
            reflow,
            pending: self.pending,
            work: self.work,
            deferred: self.deferred,
            scratch: self.scratch,
            phase: self.phase,
            passes: self.passes,
            max_passes: self.max_passes,
            unmeasured: self.unmeasured,
        }
    }

    /// Sets how many passes [`layout_until_stable`](Self::layout_until_stable)
    /// may run before giving up. Defaults to [`DEFAULT_MAX_PASSES`].
    pub fn set_max_passes(&mut self, max_passes: usize) {
        self.max_passes = max_passes;
    }

    /// The current pass bound.
    #[must_use]
    pub fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// The current phase. Always [`Phase::Idle`] between passes.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns `true` while a pass is running.
    #[must_use]
    pub fn is_layout_running(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Number of passes run so far.
    #[must_use]
    pub fn pass_count(&self) -> u64 {
        self.passes
    }

    /// The registry holding every measured size.
    #[must_use]
    pub fn registry(&self) -> &DependencyRegistry<N, D, S> {
        &self.registry
    }
}

impl<N, D, S, F> LayoutManager<N, D, S, F>
where
    N: Copy + Eq + Hash + fmt::Debug,
    D: Copy + Eq + Hash + fmt::Debug,
    S: SizeStore<N, D>,
    F: ReflowStrategy<N>,
{
    /// The cached size of `node`, or `None` if it is not tracked.
    #[must_use]
    pub fn get_measured_size(&self, node: N) -> Option<&MeasuredSize<D>> {
        self.registry.get(node)
    }

    /// The cached size of `node`, or a shared unmeasured record whose
    /// accessors return the unmeasured sentinel.
    #[must_use]
    pub fn measured_size_or_unmeasured(&self, node: N) -> &MeasuredSize<D> {
        self.registry.get_or(node, &self.unmeasured)
    }

    /// Declares that `depender` lays itself out using the size of `dependee`.
    ///
    /// A new dependency queues `depender` for notification on both axes in
    /// the next pass, so it gets an initial layout against the current size.
    /// If `dependee` has not been measured yet it is queued for measurement
    /// too. Returns `false` if the dependency already existed.
    pub fn register_dependency(&mut self, depender: D, dependee: N) -> bool {
        let added = self.registry.add_dependent(dependee, depender);
        if added {
            self.pending.relayout.insert(depender);
        }
        if !self
            .registry
            .get(dependee)
            .is_some_and(MeasuredSize::is_measured)
        {
            self.pending.measure.insert(dependee);
        }
        added
    }

    /// Removes a dependency. Returns `false` if it did not exist.
    ///
    /// The record of `dependee` stays until the sweep finds it detached.
    pub fn unregister_dependency(&mut self, depender: D, dependee: N) -> bool {
        self.registry.remove_dependent(dependee, depender)
    }

    /// Queues a pass over `scope`. Repeated requests coalesce.
    pub fn request_layout(&mut self, scope: LayoutScope<N>) {
        self.pending.request(scope);
    }

    /// Returns `true` if a pass has work to do.
    #[must_use]
    pub fn is_layout_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Queues `node` for measurement in the next pass.
    pub fn set_needs_measure(&mut self, node: N) {
        self.pending.measure.insert(node);
    }

    /// Queues `node` and everything below it in `tree` for measurement.
    pub fn set_needs_measure_recursively<T>(&mut self, node: N, tree: &T)
    where
        T: NodeTree<N>,
    {
        let stack = &mut self.scratch.stack;
        stack.clear();
        stack.push(node);
        while let Some(next) = stack.pop() {
            if self.pending.measure.insert(next) {
                stack.extend(tree.children(next));
            }
        }
    }

    /// Makes the next pass measure every tracked node.
    pub fn set_everything_needs_measure(&mut self) {
        self.pending.request(LayoutScope::All);
    }

    /// Makes the next pass notify `dependent` on both axes, whether or not
    /// anything it depends on changed.
    pub fn set_needs_relayout(&mut self, dependent: D) {
        self.pending.relayout.insert(dependent);
    }

    /// Announces the outer width a component assigned to `node`.
    ///
    /// The value replaces the cached width at the start of the next pass and
    /// notifies dependents if it differs. A report equal to the cached value
    /// is dropped.
    pub fn report_outer_width(&mut self, node: N, width: f64) {
        self.pending
            .offer_report(node, Some(width), None, self.registry.get(node));
    }

    /// Announces the outer height a component assigned to `node`.
    ///
    /// See [`report_outer_width`](Self::report_outer_width).
    pub fn report_outer_height(&mut self, node: N, height: f64) {
        self.pending
            .offer_report(node, None, Some(height), self.registry.get(node));
    }

    /// Queues `scope` and runs one pass. See
    /// [`run_pending_pass`](Self::run_pending_pass).
    pub fn layout<R, T, C>(
        &mut self,
        scope: LayoutScope<N>,
        reader: &mut R,
        tree: &T,
        relayout: &mut C,
    ) -> PassReport
    where
        R: StyleReader<N>,
        T: NodeTree<N>,
        C: Relayout<N, D>,
    {
        self.request_layout(scope);
        self.run_pending_pass(reader, tree, relayout)
    }

    /// Runs passes until nothing is pending.
    ///
    /// Returns the number of passes run, or [`UnstableLayout`] once
    /// [`max_passes`](Self::max_passes) passes have not been enough.
    pub fn layout_until_stable<R, T, C>(
        &mut self,
        reader: &mut R,
        tree: &T,
        relayout: &mut C,
    ) -> Result<usize, UnstableLayout>
    where
        R: StyleReader<N>,
        T: NodeTree<N>,
        C: Relayout<N, D>,
    {
        let mut passes = 0;
        while self.is_layout_pending() {
            if passes >= self.max_passes {
                let pending = self.pending.len();
                warn!(passes, pending, "layout did not settle; aborting");
                return Err(UnstableLayout { passes, pending });
            }
            self.run_pending_pass(reader, tree, relayout);
            passes += 1;
        }
        Ok(passes)
    }

    /// Runs one pass over everything queued.
    ///
    /// Does nothing and returns an empty report if nothing is queued.
    pub fn run_pending_pass<R, T, C>(
        &mut self,
        reader: &mut R,
        tree: &T,
        relayout: &mut C,
    ) -> PassReport
    where
        R: StyleReader<N>,
        T: NodeTree<N>,
        C: Relayout<N, D>,
    {
        if self.pending.is_empty() {
            return PassReport::default();
        }
        self.passes += 1;
        let span = debug_span!("layout_pass", pass = self.passes);
        let _guard = span.enter();

        core::mem::swap(&mut self.pending, &mut self.work);
        self.scratch.reset();
        let mut report = PassReport::default();

        let Self {
            registry,
            reflow,
            pending,
            work,
            deferred,
            scratch,
            phase,
            ..
        } = self;

        enter(phase, Phase::Measuring);
        collect_candidates(registry, work, scratch, tree);
        if !scratch.candidates.as_slice().is_empty() {
            reflow.force_reflow(scratch.candidates.as_slice());
        }

        for &(node, reported) in &work.reports {
            scratch.reported.insert(node);
            let size = registry.get_or_insert(node);
            let mut axes = Axes::empty();
            if let Some(width) = reported.width
                && size.set_outer_width(width)
            {
                axes |= Axes::WIDTH;
            }
            if let Some(height) = reported.height
                && size.set_outer_height(height)
            {
                axes |= Axes::HEIGHT;
            }
            if !axes.is_empty() {
                scratch.changed.push((node, axes));
            }
        }

        for &node in scratch.candidates.as_slice() {
            // A reported size stands in for a read.
            if scratch.reported.contains(&node) {
                continue;
            }
            report.measured += 1;
            match registry.get_or_insert(node).measure(node, reader) {
                Ok(result) if result.is_changed() => scratch.changed.push((node, result.axes())),
                Ok(_) => {}
                Err(err) => {
                    warn!(?node, ?err, "measuring failed; treating node as unchanged");
                    report.failed += 1;
                }
            }
        }
        report.changed = scratch.changed.len();

        enter(phase, Phase::Notifying);
        for &(node, axes) in &scratch.changed {
            for &dependent in registry.dependents(node) {
                scratch.notify.push(dependent, axes);
            }
        }
        for &dependent in work.relayout.as_slice() {
            scratch.notify.push(dependent, Axes::all());
        }
        for &(dependent, axes) in scratch.notify.entries() {
            report.notified += 1;
            if let Err(err) = relayout.on_dependency_size_changed(dependent, axes, deferred) {
                warn!(?dependent, ?err, "re-layout callback failed");
                report.failed += 1;
            }
        }

        enter(phase, Phase::Sweeping);
        report.swept = registry.sweep_detached(|node| tree.is_attached(node));

        report.deferred = deferred.len();
        let cached = &*registry;
        pending.absorb(deferred, |node| cached.get(node));
        work.clear();
        enter(phase, Phase::Idle);

        debug!(
            measured = report.measured,
            changed = report.changed,
            notified = report.notified,
            swept = report.swept,
            deferred = report.deferred,
            "layout pass finished"
        );
        report
    }
}

fn enter(phase: &mut Phase, next: Phase) {
    trace!(from = ?*phase, to = ?next, "phase");
    *phase = next;
}

fn collect_candidates<N, D, S, T>(
    registry: &DependencyRegistry<N, D, S>,
    work: &Pending<N, D>,
    scratch: &mut PassScratch<N, D>,
    tree: &T,
) where
    N: Copy + Eq + Hash,
    D: Copy + Eq + Hash,
    S: SizeStore<N, D>,
    T: NodeTree<N>,
{
    // Subtrees first: a node already in the set is not descended into again.
    // Roots still count under `all`, as their subtrees may not be tracked.
    for &root in work.roots.as_slice() {
        scratch.stack.push(root);
        while let Some(node) = scratch.stack.pop() {
            if scratch.candidates.insert(node) {
                scratch.stack.extend(tree.children(node));
            }
        }
    }
    if work.all {
        for node in registry.nodes() {
            scratch.candidates.insert(node);
        }
    }
    for &node in work.measure.as_slice() {
        scratch.candidates.insert(node);
    }
}

impl<N, D, S: fmt::Debug, F> fmt::Debug for LayoutManager<N, D, S, F>
where
    N: fmt::Debug,
    D: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutManager")
            .field("registry", &self.registry)
            .field("pending", &self.pending)
            .field("phase", &self.phase)
            .field("passes", &self.passes)
            .field("max_passes", &self.max_passes)
            .finish_non_exhaustive()
    }
}
