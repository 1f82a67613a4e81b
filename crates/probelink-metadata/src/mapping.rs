use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::LazyLock;

use tracing::warn;

use crate::bijection::Bijection;
use crate::error::{MetadataError, Result};

/// Probe model name to the internal code stored in its EEPROM.
pub static UUIDS: LazyLock<UserMapping<&'static str, &'static str>> = LazyLock::new(|| {
    UserMapping::new([
        ("Hornet4kV", "886-142-504"),
        ("BumbleBee2kV", "886-102-504"),
        ("BumbleBee400V", "886-122-504"),
        ("BumbleBee200V", "886-112-504"),
        ("HSDP4010", "88T-400-008"),
        ("HSDP2010", "88T-200-003"),
        ("HSDP2010L", "88T-200-004"),
        ("HSDP2025", "88T-200-005"),
        ("HSDP2025L", "88T-200-006"),
        ("HSDP2050", "88T-200-007"),
        ("FireFly", "886-102-505"),
    ])
});

/// Translates between user-facing values and internal device codes.
///
/// Built once from a fixed table. If two user values share an internal
/// code the table is not bijective: a warning is logged, both user values
/// still resolve forward, and the code resolves back to the first user
/// value that claims it in table order. This is first-wins, not the
/// last-wins result of inverting the table entry by entry into a map.
#[derive(Clone)]
pub struct UserMapping<U, I> {
    pairs: Bijection<U, I>,
    shadowed: HashMap<U, I>,
    order: Vec<U>,
}

impl<U, I> UserMapping<U, I>
where
    U: Eq + Hash + Clone + fmt::Debug,
    I: Eq + Hash + Clone + fmt::Debug,
{
    /// Build from `(user value, internal code)` entries in table order.
    ///
    /// A repeated user value replaces its earlier entry and keeps its
    /// original position.
    pub fn new(table: impl IntoIterator<Item = (U, I)>) -> Self {
        let mut entries = HashMap::new();
        let mut order = Vec::new();
        for (user, internal) in table {
            if entries.insert(user.clone(), internal).is_none() {
                order.push(user);
            }
        }

        // Codes are paired only once every entry is final, so a code freed
        // by a replaced entry still goes to the first user that holds it.
        let mut pairs = Bijection::new();
        let mut shadowed = HashMap::new();
        for user in &order {
            if let Some(internal) = entries.remove(user) {
                if pairs.insert(user.clone(), internal.clone()).is_err() {
                    shadowed.insert(user.clone(), internal);
                }
            }
        }

        if !shadowed.is_empty() {
            warn!(
                duplicates = shadowed.len(),
                "mapping is not bijective; a shared internal value resolves to its first holder"
            );
        }

        Self {
            pairs,
            shadowed,
            order,
        }
    }

    /// Internal code for `user`.
    pub fn to_internal<Q>(&self, user: &Q) -> Result<&I>
    where
        U: Borrow<Q>,
        Q: Eq + Hash + fmt::Debug + ?Sized,
    {
        self.pairs
            .get_by_left(user)
            .or_else(|| self.shadowed.get(user))
            .ok_or_else(|| MetadataError::UnknownIdentifier(format!("{user:?}")))
    }

    /// User value for `internal`.
    pub fn to_user<Q>(&self, internal: &Q) -> Result<&U>
    where
        I: Borrow<Q>,
        Q: Eq + Hash + fmt::Debug + ?Sized,
    {
        self.pairs
            .get_by_right(internal)
            .ok_or_else(|| MetadataError::UnknownIdentifier(format!("{internal:?}")))
    }

    /// Whether `internal` is a known code.
    pub fn contains_internal<Q>(&self, internal: &Q) -> bool
    where
        I: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.pairs.right().contains_key(internal)
    }

    /// Whether the table had no duplicate internal codes.
    pub fn is_bijective(&self) -> bool {
        self.shadowed.is_empty()
    }

    /// User values in table order.
    pub fn user_values(&self) -> impl Iterator<Item = &U> + '_ {
        self.order.iter()
    }

    /// Internal codes in table order, duplicates included.
    pub fn internal_values(&self) -> impl Iterator<Item = &I> + '_ {
        self.iter().map(|(_, internal)| internal)
    }

    /// `(user value, internal code)` entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&U, &I)> + '_ {
        self.order.iter().filter_map(move |user| {
            self.pairs
                .get_by_left(user)
                .or_else(|| self.shadowed.get(user))
                .map(|internal| (user, internal))
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<U: fmt::Debug, I: fmt::Debug> fmt::Debug for UserMapping<U, I>
where
    U: Eq + Hash + Clone,
    I: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
