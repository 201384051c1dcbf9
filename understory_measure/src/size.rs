// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The cached geometry snapshot of one node.

use core::fmt;

use kurbo::Size;
use smallvec::SmallVec;

use crate::edges::{Axes, EdgeBox};
use crate::style::{ComputedBox, StyleReader};

/// Outer width or height of a node that has never been measured.
///
/// Distinct from `0.0`, which is a legitimate size (for example a detached
/// node).
pub const UNMEASURED: f64 = -1.0;

/// Which dimensions changed in a single re-measurement.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MeasureResult {
    /// The outer width, or a horizontal edge, changed.
    pub width_changed: bool,
    /// The outer height, or a vertical edge, changed.
    pub height_changed: bool,
}

impl MeasureResult {
    /// Nothing changed.
    pub const UNCHANGED: Self = Self {
        width_changed: false,
        height_changed: false,
    };

    /// Returns `true` if either dimension changed.
    #[must_use]
    pub const fn is_changed(self) -> bool {
        self.width_changed || self.height_changed
    }

    /// The changed dimensions as [`Axes`].
    #[must_use]
    pub fn axes(self) -> Axes {
        let mut axes = Axes::empty();
        axes.set(Axes::WIDTH, self.width_changed);
        axes.set(Axes::HEIGHT, self.height_changed);
        axes
    }
}

impl From<Axes> for MeasureResult {
    fn from(axes: Axes) -> Self {
        Self {
            width_changed: axes.contains(Axes::WIDTH),
            height_changed: axes.contains(Axes::HEIGHT),
        }
    }
}

/// Cached box metrics for one node plus the dependents registered on it.
///
/// All accessors are plain reads of cached state; only [`measure`](Self::measure),
/// [`update`](Self::update) and the outer-size setters change it.
///
/// # Type Parameters
///
/// - `D`: Identifier of a dependent. See [`intern`](crate::intern) for
///   turning owned ids such as strings into a `Copy` type.
///
/// # Example
///
/// ```
/// use understory_measure::{ComputedBox, EdgeBox, MeasuredSize};
///
/// let mut size = MeasuredSize::<u32>::new();
/// assert_eq!(size.outer_width(), -1.0);
///
/// let result = size.update(ComputedBox {
///     margin: EdgeBox::uniform(10),
///     border: EdgeBox::uniform(1),
///     padding: EdgeBox::uniform(2),
///     content_width: 60.0,
///     content_height: 20.0,
/// });
/// assert!(result.is_changed());
/// assert_eq!(size.outer_width(), 86.0);
/// assert_eq!(size.inner_width(), 60.0);
///
/// // Nothing changed underneath: the next measurement reports no change.
/// assert!(!size.update(ComputedBox {
///     margin: EdgeBox::uniform(10),
///     border: EdgeBox::uniform(1),
///     padding: EdgeBox::uniform(2),
///     content_width: 60.0,
///     content_height: 20.0,
/// }).is_changed());
/// ```
#[derive(Clone)]
pub struct MeasuredSize<D> {
    width: f64,
    height: f64,
    margin: EdgeBox,
    border: EdgeBox,
    padding: EdgeBox,
    dependents: SmallVec<[D; 4]>,
}

impl<D> Default for MeasuredSize<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> MeasuredSize<D> {
    /// Creates an unmeasured record with no dependents.
    #[must_use]
    pub fn new() -> Self {
        Self {
            width: UNMEASURED,
            height: UNMEASURED,
            margin: EdgeBox::ZERO,
            border: EdgeBox::ZERO,
            padding: EdgeBox::ZERO,
            dependents: SmallVec::new(),
        }
    }

    /// Returns `true` once both outer dimensions have been set.
    #[must_use]
    pub fn is_measured(&self) -> bool {
        self.width != UNMEASURED && self.height != UNMEASURED
    }

    /// Reads `node` through `reader` and updates the cached values.
    ///
    /// Returns the reader's error untouched; the cached values are left as
    /// they were in that case.
    pub fn measure<N, R>(&mut self, node: N, reader: &mut R) -> Result<MeasureResult, R::Error>
    where
        R: StyleReader<N>,
    {
        let computed = reader.read(node)?;
        Ok(self.update(computed))
    }

    /// Stores `computed` and reports which dimensions changed.
    ///
    /// Edges compare by value; the outer size compares exactly, so any
    /// numeric difference counts as a change. Values are stored whether or
    /// not they changed.
    pub fn update(&mut self, computed: ComputedBox) -> MeasureResult {
        let mut axes = self.margin.changed_axes(computed.margin)
            | self.border.changed_axes(computed.border)
            | self.padding.changed_axes(computed.padding);
        self.margin = computed.margin;
        self.border = computed.border;
        self.padding = computed.padding;

        if self.set_outer_width(computed.outer_width()) {
            axes |= Axes::WIDTH;
        }
        if self.set_outer_height(computed.outer_height()) {
            axes |= Axes::HEIGHT;
        }
        axes.into()
    }

    /// Sets the outer width, returning `true` if it changed.
    ///
    /// Negative and NaN values are stored as `0`.
    pub fn set_outer_width(&mut self, width: f64) -> bool {
        let width = non_negative(width);
        let changed = self.width != width;
        self.width = width;
        changed
    }

    /// Sets the outer height, returning `true` if it changed.
    ///
    /// Negative and NaN values are stored as `0`.
    pub fn set_outer_height(&mut self, height: f64) -> bool {
        let height = non_negative(height);
        let changed = self.height != height;
        self.height = height;
        changed
    }

    /// Outer width including margin, or [`UNMEASURED`].
    #[must_use]
    pub fn outer_width(&self) -> f64 {
        self.width
    }

    /// Outer height including margin, or [`UNMEASURED`].
    #[must_use]
    pub fn outer_height(&self) -> f64 {
        self.height
    }

    /// Outer width minus horizontal margin, border, and padding.
    #[must_use]
    pub fn inner_width(&self) -> f64 {
        self.width
            - f64::from(self.margin.width())
            - f64::from(self.border.width())
            - f64::from(self.padding.width())
    }

    /// Outer height minus vertical margin, border, and padding.
    #[must_use]
    pub fn inner_height(&self) -> f64 {
        self.height
            - f64::from(self.margin.height())
            - f64::from(self.border.height())
            - f64::from(self.padding.height())
    }

    /// The outer size, or `None` before the first measurement.
    #[must_use]
    pub fn outer_size(&self) -> Option<Size> {
        self.is_measured()
            .then(|| Size::new(self.width, self.height))
    }

    /// The inner (content) size, or `None` before the first measurement.
    #[must_use]
    pub fn inner_size(&self) -> Option<Size> {
        self.is_measured()
            .then(|| Size::new(self.inner_width(), self.inner_height()))
    }

    /// Margin edges.
    #[must_use]
    pub fn margin(&self) -> EdgeBox {
        self.margin
    }

    /// Border edges.
    #[must_use]
    pub fn border(&self) -> EdgeBox {
        self.border
    }

    /// Padding edges.
    #[must_use]
    pub fn padding(&self) -> EdgeBox {
        self.padding
    }

    /// Left plus right margin.
    #[must_use]
    pub fn margin_width(&self) -> u32 {
        self.margin.width()
    }

    /// Top plus bottom margin.
    #[must_use]
    pub fn margin_height(&self) -> u32 {
        self.margin.height()
    }

    /// Left plus right border.
    #[must_use]
    pub fn border_width(&self) -> u32 {
        self.border.width()
    }

    /// Top plus bottom border.
    #[must_use]
    pub fn border_height(&self) -> u32 {
        self.border.height()
    }

    /// Left plus right padding.
    #[must_use]
    pub fn padding_width(&self) -> u32 {
        self.padding.width()
    }

    /// Top plus bottom padding.
    #[must_use]
    pub fn padding_height(&self) -> u32 {
        self.padding.height()
    }

    /// Top margin.
    #[must_use]
    pub fn margin_top(&self) -> u32 {
        self.margin.top
    }

    /// Right margin.
    #[must_use]
    pub fn margin_right(&self) -> u32 {
        self.margin.right
    }

    /// Bottom margin.
    #[must_use]
    pub fn margin_bottom(&self) -> u32 {
        self.margin.bottom
    }

    /// Left margin.
    #[must_use]
    pub fn margin_left(&self) -> u32 {
        self.margin.left
    }

    /// Top border.
    #[must_use]
    pub fn border_top(&self) -> u32 {
        self.border.top
    }

    /// Right border.
    #[must_use]
    pub fn border_right(&self) -> u32 {
        self.border.right
    }

    /// Bottom border.
    #[must_use]
    pub fn border_bottom(&self) -> u32 {
        self.border.bottom
    }

    /// Left border.
    #[must_use]
    pub fn border_left(&self) -> u32 {
        self.border.left
    }

    /// Top padding.
    #[must_use]
    pub fn padding_top(&self) -> u32 {
        self.padding.top
    }

    /// Right padding.
    #[must_use]
    pub fn padding_right(&self) -> u32 {
        self.padding.right
    }

    /// Bottom padding.
    #[must_use]
    pub fn padding_bottom(&self) -> u32 {
        self.padding.bottom
    }

    /// Left padding.
    #[must_use]
    pub fn padding_left(&self) -> u32 {
        self.padding.left
    }

    /// Returns `true` if any dependent is registered.
    #[must_use]
    pub fn has_dependents(&self) -> bool {
        !self.dependents.is_empty()
    }

    /// The registered dependents. Order is not meaningful.
    #[must_use]
    pub fn dependents(&self) -> &[D] {
        &self.dependents
    }
}

impl<D: Copy + Eq> MeasuredSize<D> {
    /// Registers `dependent`. Returns `false` if it was already registered.
    pub fn add_dependent(&mut self, dependent: D) -> bool {
        if self.dependents.contains(&dependent) {
            return false;
        }
        self.dependents.push(dependent);
        true
    }

    /// Unregisters `dependent`. Returns `false` if it was not registered.
    pub fn remove_dependent(&mut self, dependent: D) -> bool {
        if let Some(pos) = self.dependents.iter().position(|&d| d == dependent) {
            self.dependents.swap_remove(pos);
            true
        } else {
            false
        }
    }
}

/// Dependents compare as a set: the order they were registered in, or left
/// in by removals, does not matter.
impl<D: PartialEq> PartialEq for MeasuredSize<D> {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.margin == other.margin
            && self.border == other.border
            && self.padding == other.padding
            && self.dependents.len() == other.dependents.len()
            && self.dependents.iter().all(|d| other.dependents.contains(d))
    }
}

impl<D: fmt::Debug> fmt::Debug for MeasuredSize<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeasuredSize")
            .field("outer_width", &self.width)
            .field("outer_height", &self.height)
            .field("margin", &self.margin)
            .field("border", &self.border)
            .field("padding", &self.padding)
            .field("dependents", &self.dependents.as_slice())
            .finish()
    }
}

fn non_negative(value: f64) -> f64 {
    if value > 0.0 { value } else { 0.0 }
}
