// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Style reading: the boundary between the measurement cache and the host's
//! rendering surface.
//!
//! A host reports box metrics for a node either already normalized, by
//! implementing [`StyleReader`] directly, or as a [`RawStyle`] that still
//! carries `auto` values and border styles. [`RawStyle::normalize`] resolves
//! the latter into a [`ComputedBox`].

use core::convert::Infallible;
use core::fmt;

use kurbo::Size;

use crate::edges::EdgeBox;

/// A length as reported by the host before normalization.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Length {
    /// The host reported `auto` (or any other non-numeric keyword).
    Auto,
    /// A pixel value.
    Px(f64),
}

impl Default for Length {
    fn default() -> Self {
        Self::Px(0.0)
    }
}

/// The style of one border edge, as far as measurement cares.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum BorderStyle {
    /// No border is drawn; the edge's width reads as zero.
    #[default]
    None,
    /// Like [`BorderStyle::None`] for measurement purposes.
    Hidden,
    /// Any style that draws a border (solid, dashed, ...).
    Styled,
}

impl BorderStyle {
    /// Returns `true` if an edge with this style occupies space.
    #[must_use]
    pub const fn takes_space(self) -> bool {
        matches!(self, Self::Styled)
    }
}

/// Unnormalized box metrics for one node, straight from the host.
///
/// Arrays are in CSS order: top, right, bottom, left.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RawStyle {
    /// Margin per edge; `auto` normalizes to zero.
    pub margin: [Length; 4],
    /// Raw border width per edge. May be stale when the edge's style is none.
    pub border_width: [f64; 4],
    /// Border style per edge.
    pub border_style: [BorderStyle; 4],
    /// Padding per edge.
    pub padding: [f64; 4],
    /// Content width as reported by the style system.
    pub width: Length,
    /// Content height as reported by the style system.
    pub height: Length,
    /// The content box the node actually rendered with, if the host knows it.
    ///
    /// Used to resolve an `auto` (or otherwise unusable) width or height.
    pub rendered: Option<Size>,
}

impl Default for RawStyle {
    fn default() -> Self {
        Self {
            margin: [Length::default(); 4],
            border_width: [0.0; 4],
            border_style: [BorderStyle::None; 4],
            padding: [0.0; 4],
            width: Length::Auto,
            height: Length::Auto,
            rendered: None,
        }
    }
}

impl RawStyle {
    /// Resolves host quirks into a [`ComputedBox`].
    ///
    /// Rules, applied per value:
    ///
    /// - A border edge whose style is none or hidden is `0`, whatever width
    ///   the host reported for it.
    /// - An `auto` margin is `0`.
    /// - Edge values are truncated to whole pixels; negative or non-finite
    ///   values are `0`.
    /// - The content width (height) is the reported pixel value when it is
    ///   finite and non-negative, otherwise the rendered content box width
    ///   (height), otherwise `0`.
    #[must_use]
    pub fn normalize(&self) -> ComputedBox {
        let margin = self.margin.map(|m| match m {
            Length::Auto => 0,
            Length::Px(v) => whole_px(v),
        });
        let mut border = [0; 4];
        for (out, (width, style)) in border
            .iter_mut()
            .zip(self.border_width.iter().zip(self.border_style.iter()))
        {
            if style.takes_space() {
                *out = whole_px(*width);
            }
        }
        let padding = self.padding.map(whole_px);

        ComputedBox {
            margin: margin.into(),
            border: border.into(),
            padding: padding.into(),
            content_width: resolve_content(self.width, self.rendered.map(|s| s.width)),
            content_height: resolve_content(self.height, self.rendered.map(|s| s.height)),
        }
    }
}

fn whole_px(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "edge values are truncated to whole pixels; the cast saturates"
        )]
        let px = value as u32;
        px
    } else {
        0
    }
}

fn usable(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}

fn resolve_content(reported: Length, rendered: Option<f64>) -> f64 {
    let explicit = match reported {
        Length::Px(v) => usable(v),
        Length::Auto => None,
    };
    explicit.or_else(|| rendered.and_then(usable)).unwrap_or(0.0)
}

/// Normalized box metrics for one node.
///
/// The outer box is the content box plus padding, border, and margin.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ComputedBox {
    /// Margin edges.
    pub margin: EdgeBox,
    /// Border edges.
    pub border: EdgeBox,
    /// Padding edges.
    pub padding: EdgeBox,
    /// Width of the content box.
    pub content_width: f64,
    /// Height of the content box.
    pub content_height: f64,
}

impl ComputedBox {
    /// The result for a node that is not attached to the rendering surface.
    pub const ZERO: Self = Self {
        margin: EdgeBox::ZERO,
        border: EdgeBox::ZERO,
        padding: EdgeBox::ZERO,
        content_width: 0.0,
        content_height: 0.0,
    };

    /// Content width plus horizontal padding, border, and margin.
    #[must_use]
    pub fn outer_width(&self) -> f64 {
        self.content_width
            + f64::from(self.padding.width())
            + f64::from(self.border.width())
            + f64::from(self.margin.width())
    }

    /// Content height plus vertical padding, border, and margin.
    #[must_use]
    pub fn outer_height(&self) -> f64 {
        self.content_height
            + f64::from(self.padding.height())
            + f64::from(self.border.height())
            + f64::from(self.margin.height())
    }
}

/// Reads the current box metrics of a node.
///
/// Implementations must stay total for nodes that are detached from the
/// rendering surface: return [`ComputedBox::ZERO`] for those rather than an
/// error. An `Err` is reserved for nodes the reader cannot handle at all; the
/// [`LayoutManager`](crate::LayoutManager) logs it and treats the node as
/// unchanged.
///
/// Reading may force the host to reflow synchronously.
///
/// Any `FnMut(N) -> Result<ComputedBox, E>` closure is a reader.
pub trait StyleReader<N> {
    /// Why a node could not be read.
    type Error: fmt::Debug;

    /// Returns the normalized metrics of `node`.
    fn read(&mut self, node: N) -> Result<ComputedBox, Self::Error>;
}

impl<N, E, F> StyleReader<N> for F
where
    E: fmt::Debug,
    F: FnMut(N) -> Result<ComputedBox, E>,
{
    type Error = E;

    fn read(&mut self, node: N) -> Result<ComputedBox, E> {
        self(node)
    }
}

/// Adapts a host that reports [`RawStyle`] into a [`StyleReader`].
///
/// The wrapped function returns `None` for detached nodes, which read as
/// [`ComputedBox::ZERO`].
///
/// # Example
///
/// ```
/// use understory_measure::{BorderStyle, RawStyle, RawStyleReader, StyleReader};
///
/// let mut reader = RawStyleReader::new(|node: u32| {
///     (node == 1).then(|| RawStyle {
///         border_width: [3.0; 4],
///         border_style: [BorderStyle::None; 4],
///         ..RawStyle::default()
///     })
/// });
///
/// assert_eq!(reader.read(1).unwrap().border.top, 0);
/// assert_eq!(reader.read(2).unwrap().outer_width(), 0.0);
/// ```
#[derive(Clone, Debug)]
pub struct RawStyleReader<F> {
    source: F,
}

impl<F> RawStyleReader<F> {
    /// Wraps a raw style source.
    #[must_use]
    pub fn new(source: F) -> Self {
        Self { source }
    }
}

impl<N, F> StyleReader<N> for RawStyleReader<F>
where
    F: FnMut(N) -> Option<RawStyle>,
{
    type Error = Infallible;

    fn read(&mut self, node: N) -> Result<ComputedBox, Infallible> {
        Ok((self.source)(node).map_or(ComputedBox::ZERO, |raw| raw.normalize()))
    }
}
