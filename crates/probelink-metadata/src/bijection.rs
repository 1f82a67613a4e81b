//! A one-to-one pairing between two sets of values.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::error::{MetadataError, Result};

/// A set of `(left, right)` pairs where no left value and no right value
/// appears twice.
///
/// Both directions live in this one owner; [`left`](Bijection::left) and
/// [`right`](Bijection::right) hand out borrowed views instead of separate
/// maps that point at each other.
#[derive(Clone)]
pub struct Bijection<L, R> {
    forward: HashMap<L, R>,
    backward: HashMap<R, L>,
    order: Vec<L>,
}

/// Read-only view of one side of a [`Bijection`].
pub struct BijectionMap<'a, K, V> {
    map: &'a HashMap<K, V>,
}

impl<L, R> Bijection<L, R>
where
    L: Eq + Hash + Clone + fmt::Debug,
    R: Eq + Hash + Clone + fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            forward: HashMap::new(),
            backward: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Build from `(left, right)` pairs. Fails on the first conflicting pair.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (L, R)>) -> Result<Self> {
        let mut bijection = Self::new();
        for (left, right) in pairs {
            bijection.insert(left, right)?;
        }
        Ok(bijection)
    }

    /// Build from a left-to-right map whose values must be unique.
    pub fn from_map(map: HashMap<L, R>) -> Result<Self> {
        Self::from_pairs(map)
    }

    /// Pair `left` with `right`.
    ///
    /// Fails with [`MetadataError::MappingConflict`] when `right` is already
    /// paired with a different left value. Re-inserting an existing pair is
    /// a no-op; giving `left` a new right value releases the old one.
    pub fn insert(&mut self, left: L, right: R) -> Result<()> {
        if let Some(owner) = self.backward.get(&right) {
            if *owner != left {
                return Err(MetadataError::MappingConflict {
                    value: format!("{right:?}"),
                    owner: format!("{owner:?}"),
                });
            }
            return Ok(());
        }

        match self.forward.insert(left.clone(), right.clone()) {
            Some(stale) => {
                self.backward.remove(&stale);
            }
            None => self.order.push(left.clone()),
        }
        self.backward.insert(right, left);
        Ok(())
    }

    /// Pair `right` with `left`, checking for conflicts on the left side.
    pub fn insert_by_right(&mut self, right: R, left: L) -> Result<()> {
        if let Some(owner) = self.forward.get(&left) {
            if *owner != right {
                return Err(MetadataError::MappingConflict {
                    value: format!("{left:?}"),
                    owner: format!("{owner:?}"),
                });
            }
            return Ok(());
        }

        if let Some(stale) = self.backward.insert(right.clone(), left.clone()) {
            self.forward.remove(&stale);
            self.order.retain(|l| *l != stale);
        }
        self.forward.insert(left.clone(), right);
        self.order.push(left);
        Ok(())
    }

    /// Remove the pair owning `left`, returning its right value.
    pub fn remove_by_left(&mut self, left: &L) -> Option<R> {
        let right = self.forward.remove(left)?;
        self.backward.remove(&right);
        self.order.retain(|l| l != left);
        Some(right)
    }

    /// Remove the pair owning `right`, returning its left value.
    pub fn remove_by_right(&mut self, right: &R) -> Option<L> {
        let left = self.backward.remove(right)?;
        self.forward.remove(&left);
        self.order.retain(|l| *l != left);
        Some(left)
    }

    pub fn get_by_left<Q>(&self, left: &Q) -> Option<&R>
    where
        L: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.forward.get(left)
    }

    pub fn get_by_right<Q>(&self, right: &Q) -> Option<&L>
    where
        R: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.backward.get(right)
    }

    /// Whether exactly the pair `(left, right)` is present.
    pub fn contains(&self, left: &L, right: &R) -> bool {
        self.forward.get(left) == Some(right)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Left-to-right view.
    pub fn left(&self) -> BijectionMap<'_, L, R> {
        BijectionMap { map: &self.forward }
    }

    /// Right-to-left view.
    pub fn right(&self) -> BijectionMap<'_, R, L> {
        BijectionMap { map: &self.backward }
    }

    /// Pairs in the order their left values were first inserted.
    pub fn iter(&self) -> impl Iterator<Item = (&L, &R)> + '_ {
        self.order
            .iter()
            .filter_map(move |left| self.forward.get(left).map(|right| (left, right)))
    }
}

impl<L, R> Default for Bijection<L, R>
where
    L: Eq + Hash + Clone + fmt::Debug,
    R: Eq + Hash + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<L, R> PartialEq for Bijection<L, R>
where
    L: Eq + Hash,
    R: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.forward == other.forward
    }
}

impl<L, R> fmt::Debug for Bijection<L, R>
where
    L: Eq + Hash + Clone + fmt::Debug,
    R: Eq + Hash + Clone + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Bijection")
            .field(&self.iter().collect::<Vec<_>>())
            .finish()
    }
}

impl<'a, K: Eq + Hash, V> BijectionMap<'a, K, V> {
    pub fn get<Q>(&self, key: &Q) -> Option<&'a V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.get(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Keys in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &'a K> + 'a {
        self.map.keys()
    }
}
