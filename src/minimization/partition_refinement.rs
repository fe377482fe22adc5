use std::collections::BTreeSet;

use indexmap::{map::Entry, IndexMap, IndexSet};
use tracing::trace;

use super::Minimized;
use crate::{
    dfa::{Dfa, StateId},
    math::{Bijection, Partition},
};

type Block = BTreeSet<StateId>;

/// Hopcroft's algorithm for computing the coarsest partition of the states of `dfa` that
/// separates accepting from rejecting states and is compatible with the transitions.
///
/// The worklist is processed last in, first out. A block that is split while it is waiting
/// in the worklist is replaced there by both halves, otherwise only the smaller half is
/// added (the intersection if both halves have the same size).
pub(crate) fn hopcroft(dfa: &Dfa) -> Partition<StateId> {
    let accepting: Block = dfa.accepting_states().collect();
    let rejecting: Block = dfa
        .state_indices()
        .filter(|q| !dfa.is_accepting(*q))
        .collect();

    let mut partition = Partition::new([accepting, rejecting]);
    let mut worklist: Vec<Block> = partition.iter().cloned().collect();

    let alphabet: Vec<&str> = dfa.alphabet().collect();

    while let Some(splitter) = worklist.pop() {
        for &sym in &alphabet {
            let predecessors: Block = dfa
                .state_indices()
                .filter(|q| {
                    dfa.successor(*q, sym)
                        .is_some_and(|p| splitter.contains(&p))
                })
                .collect();
            if predecessors.is_empty() {
                continue;
            }

            let snapshot = partition.clone();
            for block in snapshot.iter() {
                let intersection: Block = block.intersection(&predecessors).copied().collect();
                if intersection.is_empty() || intersection.len() == block.len() {
                    continue;
                }
                let difference: Block = block.difference(&predecessors).copied().collect();
                trace!(
                    "splitting {block:?} into {intersection:?} and {difference:?} on {sym} into {splitter:?}"
                );

                partition.split(block, intersection.clone(), difference.clone());

                if worklist.contains(block) {
                    worklist.retain(|b| b != block);
                    worklist.push(intersection);
                    worklist.push(difference);
                } else if intersection.len() <= difference.len() {
                    worklist.push(intersection);
                } else {
                    worklist.push(difference);
                }
            }
        }
    }

    debug_assert!(partition.covers_exactly(&dfa.state_indices().collect::<Vec<_>>()));
    partition
}

/// Builds the quotient of `dfa` with respect to `partition`, which must be a congruence.
/// Class `i` becomes state `q{i}`, a class is accepting if any of its members is, and the
/// initial state is the class that the initial state of `dfa` ended up in.
pub(crate) fn quotient(dfa: &Dfa, partition: Partition<StateId>) -> Minimized {
    let mut class_of: Vec<StateId> = vec![0; dfa.size()];
    for (i, class) in partition.iter().enumerate() {
        for &q in class {
            class_of[q] = i;
        }
    }

    let states: Bijection<String, StateId> =
        (0..partition.size()).map(|i| (format!("q{i}"), i)).collect();
    let alphabet: IndexSet<String> = dfa.alphabet().map(|s| s.to_string()).collect();

    let mut transitions: Vec<IndexMap<usize, StateId>> = vec![IndexMap::new(); partition.size()];
    for (source, sym, target) in dfa.transitions() {
        let Some(position) = alphabet.get_index_of(sym) else {
            continue;
        };
        match transitions[class_of[source]].entry(position) {
            Entry::Vacant(vacant) => {
                vacant.insert(class_of[target]);
            }
            Entry::Occupied(existing) => {
                debug_assert_eq!(
                    *existing.get(),
                    class_of[target],
                    "partition is not a congruence"
                );
            }
        }
    }

    let accepting: BTreeSet<StateId> = partition
        .iter()
        .enumerate()
        .filter(|(_, class)| class.iter().any(|q| dfa.is_accepting(*q)))
        .map(|(i, _)| i)
        .collect();

    let initial = class_of[dfa.initial()];
    trace!(
        "initial state {:?} lies in class q{initial}",
        dfa.state_name(dfa.initial())
    );

    let classes = partition
        .iter()
        .map(|class| {
            class
                .iter()
                .filter_map(|q| dfa.state_name(*q))
                .map(|s| s.to_string())
                .collect()
        })
        .collect();

    Minimized {
        automaton: Dfa::from_parts(states, alphabet, transitions, accepting, initial),
        classes,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::{
        prelude::*,
        tests::{three_state_graph, wiki_graph},
    };

    /// Moore's fixpoint iteration, used as a reference: two states are equivalent if they agree
    /// on acceptance and their successors are equivalent for every symbol.
    fn moore_classes(dfa: &Dfa) -> usize {
        let mut class: Vec<usize> = dfa
            .state_indices()
            .map(|q| usize::from(dfa.is_accepting(q)))
            .collect();
        loop {
            let signatures: Vec<(usize, Vec<usize>)> = dfa
                .state_indices()
                .map(|q| {
                    (
                        class[q],
                        dfa.alphabet()
                            .map(|a| class[dfa.successor(q, a).unwrap()])
                            .collect(),
                    )
                })
                .collect();
            let distinct: Vec<_> = signatures.iter().collect::<BTreeSet<_>>().into_iter().collect();
            let next: Vec<usize> = signatures
                .iter()
                .map(|s| distinct.iter().position(|d| *d == s).unwrap())
                .collect();
            let before = class.iter().collect::<BTreeSet<_>>().len();
            class = next;
            if class.iter().collect::<BTreeSet<_>>().len() == before {
                return before;
            }
        }
    }

    fn binary_counter(modulus: usize, copies: usize) -> Graph {
        // states (i, c) count the number of 1s modulo `modulus`, the copy index c is irrelevant
        let name = |i: usize, c: usize| format!("s{i}_{c}");
        let mut builder = Graph::builder();
        for c in 0..copies {
            for i in 0..modulus {
                let mut attributes = vec![];
                if i == 0 {
                    attributes.push(("shape", "doublecircle"));
                }
                if i == 0 && c == 0 {
                    attributes.push(("style", "bold"));
                }
                builder = builder.with_node(name(i, c), attributes);
            }
        }
        for c in 0..copies {
            for i in 0..modulus {
                builder = builder
                    .with_edge(name(i, c), "0", name(i, (c + 1) % copies))
                    .with_edge(name(i, c), "1", name((i + 1) % modulus, c));
            }
        }
        builder.build().unwrap()
    }

    #[test_log::test]
    fn hopcroft_matches_moore() {
        for graph in [
            three_state_graph(),
            wiki_graph(),
            binary_counter(3, 2),
            binary_counter(4, 3),
            binary_counter(1, 4),
        ] {
            let dfa = check(&graph).unwrap();
            let partition = hopcroft(&dfa);
            assert!(partition.covers_exactly(&dfa.state_indices().collect::<Vec<_>>()));
            assert_eq!(partition.size(), moore_classes(&dfa));
        }
    }

    #[test]
    fn counter_collapses_copies() {
        let dfa = check(&binary_counter(4, 3)).unwrap();
        let minimized = dfa.minimize();
        assert_eq!(minimized.size(), 4);
        for class in minimized.classes() {
            assert_eq!(class.len(), 3);
        }
    }

    #[test]
    fn initial_state_follows_its_class() {
        // `q0` is a rejecting state reachable only from the accepting initial state `start`,
        // so the class containing `q0` is not the initial one
        let graph = Graph::builder()
            .with_node("start", [("style", "bold"), ("shape", "doublecircle")])
            .with_node("q0", [("shape", "circle")])
            .with_node("q1", [("shape", "doublecircle")])
            .with_edges([
                ("start", "a", "q0"),
                ("q0", "a", "q1"),
                ("q1", "a", "q0"),
            ])
            .build()
            .unwrap();
        let minimized = minimize(&graph).unwrap();
        let initial = minimized.automaton().initial();
        assert_eq!(minimized.block_of("start"), Some(initial));

        // picking the class that contains a state literally named `q0` would be wrong here
        let literal = minimized.block_of("q0");
        assert_ne!(literal, Some(initial));
    }

    #[test]
    fn literal_name_and_tracked_initial_agree_on_conventional_names() {
        let graph = Graph::builder()
            .with_node("q0", [("style", "bold")])
            .with_node("q1", [("shape", "doublecircle")])
            .with_node("q2", [("shape", "doublecircle")])
            .with_edges([("q0", "a", "q1"), ("q1", "a", "q2"), ("q2", "a", "q1")])
            .build()
            .unwrap();
        let minimized = minimize(&graph).unwrap();
        assert_eq!(minimized.size(), 2);
        assert_eq!(minimized.block_of("q0"), Some(minimized.automaton().initial()));
    }
}
