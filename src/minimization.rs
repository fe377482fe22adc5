pub(crate) mod partition_refinement;

use std::collections::BTreeSet;

use tracing::{debug, error};

use crate::{
    dfa::{check_with, Dfa, StateId},
    graph::{Conventions, Graph},
    math::Partition,
    Failure,
};

/// The result of minimizing a [`Dfa`]: the minimal automaton together with the classes of
/// original states that were merged into each of its states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Minimized {
    automaton: Dfa,
    classes: Vec<BTreeSet<String>>,
}

impl Minimized {
    /// The minimal automaton. Its states are called `q0`, `q1`, ... where the number is the
    /// position of the class in the final partition.
    pub fn automaton(&self) -> &Dfa {
        &self.automaton
    }

    /// Consumes `self` and returns the minimal automaton.
    pub fn into_automaton(self) -> Dfa {
        self.automaton
    }

    /// The number of states of the minimal automaton.
    pub fn size(&self) -> usize {
        self.automaton.size()
    }

    /// Returns the names of the original states merged into state `id` of the minimal automaton.
    pub fn class(&self, id: StateId) -> Option<&BTreeSet<String>> {
        self.classes.get(id)
    }

    /// Iterates over all classes, the position of a class is the index of the state it became.
    pub fn classes(&self) -> impl Iterator<Item = &BTreeSet<String>> + '_ {
        self.classes.iter()
    }

    /// Returns the state of the minimal automaton that the original state `name` was merged into.
    pub fn block_of(&self, name: &str) -> Option<StateId> {
        self.classes.iter().position(|class| class.contains(name))
    }
}

impl Dfa {
    /// Computes the coarsest partition of the states of `self` that is compatible with
    /// acceptance and the transitions, using Hopcroft's partition refinement.
    pub fn language_partition(&self) -> Partition<StateId> {
        partition_refinement::hopcroft(self)
    }

    /// Returns the unique (up to naming) minimal DFA that accepts the same language as `self`.
    /// The minimal automaton is built from [`Dfa::language_partition`], `self` is not modified.
    pub fn minimize(&self) -> Minimized {
        partition_refinement::quotient(self, self.language_partition())
    }
}

/// Validates `graph` and minimizes the automaton it describes, using the default [`Conventions`].
pub fn minimize(graph: &Graph) -> Result<Minimized, Failure> {
    minimize_with(graph, &Conventions::default())
}

/// See [`minimize`]. If validation fails, no minimization is attempted and the reason is
/// logged and returned.
pub fn minimize_with(graph: &Graph, conventions: &Conventions) -> Result<Minimized, Failure> {
    let dfa = check_with(graph, conventions).map_err(|e| {
        error!("cannot minimize, {e}");
        Failure::from(e)
    })?;
    let minimized = dfa.minimize();
    debug!(
        "minimized DFA with {} states to {} states",
        dfa.size(),
        minimized.size()
    );
    Ok(minimized)
}

#[cfg(test)]
mod tests {
    use crate::{
        prelude::*,
        tests::{three_state_graph, wiki_graph},
    };

    #[test_log::test]
    fn merges_equivalent_sinks() {
        let minimized = minimize(&three_state_graph()).unwrap();
        assert_eq!(minimized.size(), 2);
        assert_eq!(minimized.block_of("B"), minimized.block_of("C"));
        assert_ne!(minimized.block_of("A"), minimized.block_of("B"));

        let dfa = minimized.automaton();
        let initial = dfa.initial();
        assert_eq!(Some(initial), minimized.block_of("A"));
        assert!(!dfa.is_accepting(initial));
        let sink = dfa.successor(initial, "0").unwrap();
        assert_eq!(dfa.successor(initial, "1"), Some(sink));
        assert!(dfa.is_accepting(sink));
        assert_eq!(dfa.transitions().count(), 4);
    }

    #[test]
    fn minimization_is_idempotent() {
        for graph in [three_state_graph(), wiki_graph()] {
            let once = minimize(&graph).unwrap();
            let twice = once.automaton().minimize();
            assert_eq!(once.size(), twice.size());
        }
    }

    #[test]
    fn wiki_example() {
        let minimized = minimize(&wiki_graph()).unwrap();
        assert_eq!(minimized.size(), 3);
        let classes: Vec<Vec<&str>> = minimized
            .classes()
            .map(|c| c.iter().map(|s| s.as_str()).collect())
            .collect();
        assert!(classes.contains(&vec!["a", "b"]));
        assert!(classes.contains(&vec!["c", "d", "e"]));
        assert!(classes.contains(&vec!["f"]));
    }

    #[test]
    fn language_is_preserved() {
        let graph = wiki_graph();
        let original = check(&graph).unwrap();
        let minimized = minimize(&graph).unwrap();
        let words: [&[&str]; 6] = [
            &[],
            &["0"],
            &["1"],
            &["0", "0", "1"],
            &["1", "1"],
            &["0", "1", "0"],
        ];
        for word in words {
            assert_eq!(
                original.accepts(word.iter().copied()),
                minimized.automaton().accepts(word.iter().copied()),
                "disagreement on {word:?}"
            );
        }
    }

    #[test]
    fn invalid_input_fails_without_minimizing() {
        let graph = Graph::builder()
            .with_node("q0", [("style", "bold")])
            .with_edges([("q0", "a", "q0"), ("q0", "ε", "q0")])
            .build()
            .unwrap();
        assert!(matches!(
            minimize(&graph),
            Err(Failure::Validation(ValidationError::Epsilon { .. }))
        ));
    }

    #[test]
    fn all_accepting_or_all_rejecting() {
        let graph = Graph::builder()
            .with_node("x", [("style", "bold"), ("shape", "doublecircle")])
            .with_node("y", [("shape", "doublecircle")])
            .with_edges([("x", "a", "y"), ("y", "a", "x")])
            .build()
            .unwrap();
        let minimized = minimize(&graph).unwrap();
        assert_eq!(minimized.size(), 1);
        assert!(minimized.automaton().is_accepting(0));
        assert_eq!(minimized.automaton().successor(0, "a"), Some(0));
    }

    #[test]
    fn no_edges_at_all() {
        let graph = Graph::builder()
            .with_node("only", [("style", "bold")])
            .build()
            .unwrap();
        let minimized = minimize(&graph).unwrap();
        assert_eq!(minimized.size(), 1);
        assert_eq!(minimized.automaton().alphabet().count(), 0);
        assert!(!minimized.automaton().accepts(std::iter::empty::<&str>()));
    }

    #[test]
    fn isolated_state_survives_without_transitions() {
        let graph = Graph::builder()
            .with_node("q0", [("style", "bold")])
            .with_node("q1", [("shape", "doublecircle")])
            .with_node("lonely", [("shape", "circle")])
            .with_edges([("q0", "a", "q1"), ("q1", "a", "q1")])
            .build()
            .unwrap();
        let minimized = minimize(&graph).unwrap();
        assert_eq!(minimized.size(), 3);

        let dfa = minimized.automaton();
        let lonely = minimized.block_of("lonely").unwrap();
        assert_ne!(Some(lonely), minimized.block_of("q0"));
        assert_eq!(dfa.successor(lonely, "a"), None);
        assert_eq!(dfa.transitions_from(lonely).count(), 0);
        assert!(dfa.accepts(["a"]));
    }
}
