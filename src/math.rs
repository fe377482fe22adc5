use std::{collections::BTreeSet, hash::Hash};

/// Type alias for sets, we use this to hide which type of `HashSet` we are actually using.
pub type Set<S> = fxhash::FxHashSet<S>;

/// Represents a bijective mapping between `L` and `R`, that is a mapping which associates
/// each `L` with precisely one `R` and vice versa.
pub type Bijection<L, R> = bimap::BiBTreeMap<L, R>;

/// A partition groups elements of type `I` into pairwise disjoint, non-empty classes.
/// Classes are stored as sorted sets, which means two classes compare equal exactly
/// if they contain the same elements, independent of how they were built.
#[derive(Debug, Clone)]
pub struct Partition<I: Hash + Eq>(Vec<BTreeSet<I>>);

impl<I: Hash + Eq> std::ops::Deref for Partition<I> {
    type Target = Vec<BTreeSet<I>>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a, I: Hash + Eq> IntoIterator for &'a Partition<I> {
    type Item = &'a BTreeSet<I>;
    type IntoIter = std::slice::Iter<'a, BTreeSet<I>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<I: Hash + Eq> PartialEq for Partition<I> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|o| other.contains(o))
    }
}
impl<I: Hash + Eq> Eq for Partition<I> {}

impl<I: Hash + Eq + Ord + Clone> Partition<I> {
    /// Returns the size of the partition, i.e. the number of classes.
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Builds a new partition from an iterator that yields iterators
    /// which yield elements of type `I`. Empty classes are dropped.
    pub fn new<X: IntoIterator<Item = I>, Y: IntoIterator<Item = X>>(iter: Y) -> Self {
        Self(
            iter.into_iter()
                .map(|it| it.into_iter().collect::<BTreeSet<_>>())
                .filter(|class| !class.is_empty())
                .collect(),
        )
    }

    /// Returns the position of the class that contains `element`, if there is one.
    pub fn class_of(&self, element: &I) -> Option<usize> {
        self.0.iter().position(|class| class.contains(element))
    }

    /// Removes the class equal to `class` and appends the two given halves in its place.
    /// Returns `false` and leaves `self` untouched if no such class exists.
    pub fn split(&mut self, class: &BTreeSet<I>, left: BTreeSet<I>, right: BTreeSet<I>) -> bool {
        let Some(pos) = self.0.iter().position(|c| c == class) else {
            return false;
        };
        debug_assert!(
            left.is_disjoint(&right) && left.union(&right).eq(class.iter()),
            "halves must partition the class that is split"
        );
        self.0.remove(pos);
        self.0.push(left);
        self.0.push(right);
        true
    }

    /// Verifies that the classes are non-empty, pairwise disjoint and that their union
    /// is exactly `universe`.
    pub fn covers_exactly<'a>(&self, universe: impl IntoIterator<Item = &'a I>) -> bool
    where
        I: 'a,
    {
        let universe: BTreeSet<&I> = universe.into_iter().collect();
        let mut seen = BTreeSet::new();
        for class in &self.0 {
            if class.is_empty() {
                return false;
            }
            for element in class {
                if !seen.insert(element) {
                    return false;
                }
            }
        }
        seen == universe
    }

    /// Consumes the partition and returns the underlying classes.
    pub fn into_classes(self) -> Vec<BTreeSet<I>> {
        self.0
    }
}

impl<I: Hash + Eq + Ord> From<Vec<BTreeSet<I>>> for Partition<I> {
    fn from(value: Vec<BTreeSet<I>>) -> Self {
        Self(value)
    }
}
