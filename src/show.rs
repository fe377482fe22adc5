use std::collections::BTreeSet;

use itertools::Itertools;

/// Helper trait which can be used to display states, transitions and such.
pub trait Show {
    /// Returns a human readable representation of `self`, for a state that should be
    /// for example q0, q1, q2, ... and for a marking something like (p1=1, p2=∞).
    /// This is mainly used for debugging and for the textual output of analyses.
    fn show(&self) -> String;

    /// Show a collection of the thing, for a collection of states this should be {q0, q1, q2, ...}.
    fn show_collection<'a, I>(iter: I) -> String
    where
        Self: 'a,
        I: IntoIterator<Item = &'a Self>,
    {
        format!("{{{}}}", iter.into_iter().map(|x| x.show()).join(", "))
    }
}

impl Show for usize {
    fn show(&self) -> String {
        self.to_string()
    }
}

impl Show for String {
    fn show(&self) -> String {
        self.clone()
    }
}

impl Show for str {
    fn show(&self) -> String {
        self.to_string()
    }
}

impl<S: Show> Show for BTreeSet<S> {
    fn show(&self) -> String {
        S::show_collection(self.iter())
    }
}

impl<S: Show> Show for &S {
    fn show(&self) -> String {
        (*self).show()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::Show;

    #[test]
    fn show_sets() {
        let set: BTreeSet<String> = ["b", "a"].into_iter().map(String::from).collect();
        assert_eq!(set.show(), "{a, b}");
        assert_eq!(BTreeSet::<usize>::new().show(), "{}");
    }
}
