// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Measure: a measured-size cache with size-dependency tracking.
//!
//! Layout code often needs the rendered size of nodes it does not own: a
//! panel sizes itself from its header, a split view from both halves. Reading
//! those sizes from the host is expensive (it may force a reflow), and
//! relaying out everything on every change is wasteful. This crate keeps the
//! last measured geometry of each node and re-lays out only the dependents of
//! nodes whose size actually changed.
//!
//! - **Geometry** ([`MeasuredSize`], [`EdgeBox`]): outer size plus margin,
//!   border and padding of one node, with exact change detection
//!   ([`MeasureResult`], [`Axes`]). Outer sizes read [`UNMEASURED`] until the
//!   first measurement.
//! - **Style reading** ([`StyleReader`], [`RawStyle`]): the only way the crate
//!   touches the host. [`RawStyle::normalize`] resolves `auto` values and
//!   borders whose style is none.
//! - **Registry** ([`DependencyRegistry`]): node to record, with the
//!   dependents registered on each node and a sweep for detached nodes.
//!   Storage is pluggable ([`HashStore`], [`SlotStore`]).
//! - **Orchestration** ([`LayoutManager`]): runs measure, notify and sweep
//!   passes over queued work and defers anything a callback asks for to the
//!   next pass.
//!
//! ## Quick Start
//!
//! ```rust
//! use core::convert::Infallible;
//! use understory_measure::{
//!     Axes, BorderStyle, Deferred, LayoutManager, LayoutScope, Length, NodeTree, RawStyle,
//!     RawStyleReader,
//! };
//!
//! // A two-node tree: 0 is the root, 1 its only child.
//! struct Tree;
//!
//! impl NodeTree<u32> for Tree {
//!     fn is_attached(&self, node: u32) -> bool {
//!         node <= 1
//!     }
//!     fn children(&self, node: u32) -> impl Iterator<Item = u32> + '_ {
//!         (node == 0).then_some(1).into_iter()
//!     }
//! }
//!
//! let mut reader = RawStyleReader::new(|node: u32| {
//!     Some(RawStyle {
//!         padding: [2.0; 4],
//!         // Stale width on a border whose style is none: reads as 0.
//!         border_width: [3.0; 4],
//!         border_style: [BorderStyle::None; 4],
//!         width: Length::Px(if node == 0 { 200.0 } else { 50.0 }),
//!         height: Length::Px(20.0),
//!         ..RawStyle::default()
//!     })
//! });
//!
//! let mut manager = LayoutManager::<u32, u32>::new();
//! // The root (as dependent 0) lays itself out from its child's size.
//! manager.register_dependency(0, 1);
//!
//! let mut relaid = Vec::new();
//! let report = manager.layout(
//!     LayoutScope::Root(0),
//!     &mut reader,
//!     &Tree,
//!     &mut |dependent: u32, _: Axes, _: &mut Deferred<u32, u32>| -> Result<(), Infallible> {
//!         relaid.push(dependent);
//!         Ok(())
//!     },
//! );
//!
//! assert_eq!(report.measured, 2);
//! assert_eq!(relaid, [0]);
//! let child = manager.get_measured_size(1).unwrap();
//! assert_eq!(child.outer_width(), 54.0);
//! assert_eq!(child.border_width(), 0);
//! ```
//!
//! ## Passes and re-entrancy
//!
//! A pass moves through [`Phase::Measuring`], [`Phase::Notifying`] and
//! [`Phase::Sweeping`] and returns to [`Phase::Idle`]. Callbacks receive a
//! [`Deferred`] handle rather than the manager; what they record runs in the
//! next pass. [`LayoutManager::layout_until_stable`] keeps running passes
//! until nothing is queued, and gives up with [`UnstableLayout`] after
//! [`LayoutManager::max_passes`] passes.
//!
//! ## Logging
//!
//! Passes are instrumented with [`tracing`]: a `layout_pass` span per pass,
//! a `debug` summary, and `warn` events for reader and callback failures. No
//! subscriber is installed by this crate.
//!
//! ## `no_std` Support
//!
//! This crate is `no_std` and uses `alloc`. The `std` (default) and `libm`
//! features only select how Kurbo does its float math.

#![no_std]

extern crate alloc;

mod edges;
mod error;
pub mod intern;
mod manager;
mod pass;
mod registry;
mod size;
pub mod store;
mod style;

pub use edges::{Axes, EdgeBox};
pub use error::UnstableLayout;
pub use intern::InternId;
pub use manager::{
    DEFAULT_MAX_PASSES, LayoutManager, NoReflow, NodeTree, ReflowStrategy, Relayout,
};
pub use pass::{Deferred, LayoutScope, PassReport, Phase};
pub use registry::DependencyRegistry;
pub use size::{MeasureResult, MeasuredSize, UNMEASURED};
pub use store::{DenseKey, HashStore, SizeStore, SlotStore};
pub use style::{BorderStyle, ComputedBox, Length, RawStyle, RawStyleReader, StyleReader};
