// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact ids for owned dependent identifiers.
//!
//! Hosts often name components with owned keys such as connector id strings,
//! while the registry and the orchestrator want a small `Copy` type for `D`
//! (and sometimes for `N`). [`Interner`] hands out an [`InternId`] per
//! distinct key and resolves it back for logging or dispatch.
//!
//! ## Example
//!
//! ```rust
//! use understory_measure::intern::Interner;
//! use understory_measure::DependencyRegistry;
//!
//! let mut ids = Interner::<String>::new();
//! let panel = ids.intern("panel-17".to_string());
//!
//! let mut registry = DependencyRegistry::<u32, _>::new();
//! registry.add_dependent(4, panel);
//!
//! // Look up by borrowed form without allocating.
//! assert_eq!(ids.lookup("panel-17"), Some(panel));
//! assert_eq!(ids.resolve(registry.dependents(4)[0]).unwrap(), "panel-17");
//! ```

use alloc::vec::Vec;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};

use hashbrown::{DefaultHashBuilder, HashMap};
use smallvec::SmallVec;

use crate::store::DenseKey;

/// A compact id handed out by an [`Interner`].
///
/// Ids are dense from zero, so they also work as [`DenseKey`]s for a
/// [`SlotStore`](crate::SlotStore).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct InternId(usize);

impl InternId {
    /// Returns this id as an index.
    #[inline]
    #[must_use]
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl DenseKey for InternId {
    #[inline]
    fn index(self) -> usize {
        self.0
    }
}

/// Maps owned keys to [`InternId`]s and back.
///
/// Each key is stored once. Lookups go through a table from key hash to the
/// ids sharing that hash.
#[derive(Debug, Clone)]
pub struct Interner<K> {
    keys: Vec<K>,
    by_hash: HashMap<u64, SmallVec<[InternId; 1]>>,
    build_hasher: DefaultHashBuilder,
}

impl<K: Eq + Hash> Default for Interner<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> Interner<K> {
    /// Creates an empty interner.
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            by_hash: HashMap::new(),
            build_hasher: DefaultHashBuilder::default(),
        }
    }

    /// Number of interned keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if nothing has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns the id for `key`, interning it if it is new.
    ///
    /// An equal key that was interned earlier keeps its id; `key` is dropped.
    pub fn intern(&mut self, key: K) -> InternId {
        let hash = self.build_hasher.hash_one(&key);
        if let Some(id) = self.find(hash, &key) {
            return id;
        }
        let id = InternId(self.keys.len());
        self.keys.push(key);
        self.by_hash.entry(hash).or_default().push(id);
        id
    }

    /// Returns the id of an interned key without interning it.
    #[must_use]
    pub fn lookup<Q>(&self, key: &Q) -> Option<InternId>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.find(self.build_hasher.hash_one(key), key)
    }

    /// Returns the key behind `id`, or `None` if this interner did not hand
    /// it out.
    #[must_use]
    pub fn resolve(&self, id: InternId) -> Option<&K> {
        self.keys.get(id.0)
    }

    /// Iterates over `(id, key)` pairs in interning order.
    pub fn iter(&self) -> impl Iterator<Item = (InternId, &K)> + '_ {
        self.keys.iter().enumerate().map(|(i, k)| (InternId(i), k))
    }

    /// Forgets every key. Ids handed out earlier become dangling.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.by_hash.clear();
    }

    fn find<Q>(&self, hash: u64, key: &Q) -> Option<InternId>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.by_hash
            .get(&hash)?
            .iter()
            .copied()
            .find(|id| <K as Borrow<Q>>::borrow(&self.keys[id.0]) == key)
    }
}
