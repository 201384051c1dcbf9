// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Box edges and the axes a size change affects.

use core::fmt;

use kurbo::Insets;

/// One of margin, border, or padding: a `(top, right, bottom, left)` tuple of
/// whole, non-negative pixels.
///
/// Unresolved values (such as an `auto` margin) are normalized to `0` before
/// they are stored; see [`RawStyle::normalize`](crate::RawStyle::normalize).
///
/// # Example
///
/// ```
/// use understory_measure::EdgeBox;
///
/// let margin = EdgeBox::new(10, 5, 10, 5);
/// assert_eq!(margin.width(), 10);
/// assert_eq!(margin.height(), 20);
/// ```
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct EdgeBox {
    /// Top edge.
    pub top: u32,
    /// Right edge.
    pub right: u32,
    /// Bottom edge.
    pub bottom: u32,
    /// Left edge.
    pub left: u32,
}

impl EdgeBox {
    /// All four edges zero.
    pub const ZERO: Self = Self::uniform(0);

    /// Creates an edge box in CSS order: top, right, bottom, left.
    #[must_use]
    pub const fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Creates an edge box with the same value on every edge.
    #[must_use]
    pub const fn uniform(value: u32) -> Self {
        Self::new(value, value, value, value)
    }

    /// Sum of the left and right edges.
    #[must_use]
    pub const fn width(self) -> u32 {
        self.left.saturating_add(self.right)
    }

    /// Sum of the top and bottom edges.
    #[must_use]
    pub const fn height(self) -> u32 {
        self.top.saturating_add(self.bottom)
    }

    /// Returns the axes on which `self` and `other` differ.
    ///
    /// A change to the top or bottom edge affects the height; a change to the
    /// left or right edge affects the width.
    #[must_use]
    pub fn changed_axes(self, other: Self) -> Axes {
        let mut axes = Axes::empty();
        if self.left != other.left || self.right != other.right {
            axes |= Axes::WIDTH;
        }
        if self.top != other.top || self.bottom != other.bottom {
            axes |= Axes::HEIGHT;
        }
        axes
    }

    /// Converts to Kurbo insets (`x0` is left, `y0` is top).
    #[must_use]
    pub fn to_insets(self) -> Insets {
        Insets::new(
            f64::from(self.left),
            f64::from(self.top),
            f64::from(self.right),
            f64::from(self.bottom),
        )
    }
}

impl From<[u32; 4]> for EdgeBox {
    /// Builds from `[top, right, bottom, left]`.
    fn from([top, right, bottom, left]: [u32; 4]) -> Self {
        Self::new(top, right, bottom, left)
    }
}

impl fmt::Debug for EdgeBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EdgeBox({} {} {} {})",
            self.top, self.right, self.bottom, self.left
        )
    }
}

bitflags::bitflags! {
    /// Axes along which a measured size changed.
    ///
    /// Dependents are told which axes of the nodes they depend on changed so
    /// they can redo only the matching half of their layout.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Axes: u8 {
        /// The outer width changed.
        const WIDTH  = 0b0000_0001;
        /// The outer height changed.
        const HEIGHT = 0b0000_0010;
    }
}
