// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

/// Returned by [`LayoutManager::layout_until_stable`](crate::LayoutManager::layout_until_stable)
/// when passes keep queueing more work.
///
/// The work that was still queued stays queued; the next call picks it up.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnstableLayout {
    /// Passes run before giving up.
    pub passes: usize,
    /// Coalesced requests still waiting.
    pub pending: usize,
}

impl fmt::Display for UnstableLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "layout did not settle after {} passes ({} requests still pending)",
            self.passes, self.pending
        )
    }
}

impl core::error::Error for UnstableLayout {}
