use std::collections::BTreeSet;

use indexmap::{map::Entry, IndexMap, IndexSet};
use thiserror::Error;
use tracing::{debug, trace};

use super::{Dfa, StateId};
use crate::{
    graph::{Conventions, Graph},
    math::Bijection,
};

/// The reasons for which a graph does not describe a deterministic finite automaton.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An edge is labeled with the reserved ε symbol.
    #[error("edge from \"{from}\" to \"{to}\" is an epsilon transition")]
    Epsilon {
        /// source of the offending edge
        from: String,
        /// target of the offending edge
        to: String,
    },
    /// Two edges leaving the same state on the same symbol lead to different states.
    #[error("state \"{state}\" has transitions to \"{first}\" and \"{second}\" on \"{symbol}\"")]
    Nondeterministic {
        /// the state with two successors
        state: String,
        /// the symbol on which the successor is ambiguous
        symbol: String,
        /// the target that was seen first
        first: String,
        /// the target that was seen second
        second: String,
    },
    /// No node carries the initial marker.
    #[error("no state is marked as initial")]
    MissingInitial,
    /// More than one node carries the initial marker.
    #[error("more than one state is marked as initial: {0:?}")]
    AmbiguousInitial(Vec<String>),
    /// Some state has no transition on some symbol of the alphabet.
    #[error("state \"{state}\" has no transition on \"{symbol}\"")]
    Incomplete {
        /// the state that lacks a transition
        state: String,
        /// the symbol for which the transition is missing
        symbol: String,
    },
}

/// Returns true if and only if `graph` describes a deterministic, complete automaton with
/// a unique initial state, using the default [`Conventions`].
pub fn validate(graph: &Graph) -> bool {
    validate_with(graph, &Conventions::default())
}

/// See [`validate`], interpreting the graph according to `conventions`.
pub fn validate_with(graph: &Graph, conventions: &Conventions) -> bool {
    match check_with(graph, conventions) {
        Ok(_) => true,
        Err(e) => {
            debug!("graph is not a valid DFA: {e}");
            false
        }
    }
}

/// Checks that `graph` describes a valid DFA and returns it, using the default [`Conventions`].
pub fn check(graph: &Graph) -> Result<Dfa, ValidationError> {
    check_with(graph, &Conventions::default())
}

/// Builds the [`Dfa`] described by `graph`. Every node becomes a state, an edge contributes
/// one transition for each symbol of its comma separated label and edges with an empty
/// label are skipped. The checks happen in the order determinism (including the absence of
/// ε-edges), initial state, completeness. Completeness is only required of states that are
/// the source or target of some edge, nodes without any edge stay without transitions.
pub fn check_with(graph: &Graph, conventions: &Conventions) -> Result<Dfa, ValidationError> {
    let states: Bijection<String, StateId> = graph
        .nodes()
        .enumerate()
        .map(|(i, node)| (node.id().to_string(), i))
        .collect();
    let name = |q: StateId| {
        states
            .get_by_right(&q)
            .cloned()
            .unwrap_or_else(|| q.to_string())
    };

    let mut alphabet: IndexSet<String> = IndexSet::new();
    let mut transitions: Vec<IndexMap<usize, StateId>> = vec![IndexMap::new(); states.len()];
    // states that occur as the endpoint of some edge, only these have to be complete
    let mut touched: BTreeSet<StateId> = BTreeSet::new();

    for edge in graph.edges() {
        let (Some(&from), Some(&to)) = (
            states.get_by_left(edge.from()),
            states.get_by_left(edge.to()),
        ) else {
            unreachable!("graph declares every endpoint of its edges as node")
        };
        touched.insert(from);
        touched.insert(to);

        if conventions.is_epsilon(edge.label())
            || edge.symbols().any(|sym| conventions.is_epsilon(sym))
        {
            return Err(ValidationError::Epsilon {
                from: edge.from().to_string(),
                to: edge.to().to_string(),
            });
        }

        for sym in edge.symbols() {
            let (position, _) = alphabet.insert_full(sym.to_string());
            match transitions[from].entry(position) {
                Entry::Occupied(existing) if *existing.get() != to => {
                    return Err(ValidationError::Nondeterministic {
                        state: name(from),
                        symbol: sym.to_string(),
                        first: name(*existing.get()),
                        second: name(to),
                    });
                }
                // an identical repetition is not a second assignment, unlike a distinct target
                Entry::Occupied(_) => {
                    trace!("duplicate transition {} --{sym}--> {}", edge.from(), edge.to());
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(to);
                }
            }
        }
    }

    let initial: Vec<StateId> = graph
        .nodes()
        .enumerate()
        .filter(|(_, node)| conventions.is_initial(node))
        .map(|(i, _)| i)
        .collect();
    let initial = match initial.as_slice() {
        [] => return Err(ValidationError::MissingInitial),
        [q] => *q,
        more => {
            return Err(ValidationError::AmbiguousInitial(
                more.iter().map(|q| name(*q)).collect(),
            ))
        }
    };

    for &q in &touched {
        let edges = &transitions[q];
        if let Some(missing) = (0..alphabet.len()).find(|a| !edges.contains_key(a)) {
            return Err(ValidationError::Incomplete {
                state: name(q),
                symbol: alphabet[missing].clone(),
            });
        }
    }

    let accepting: BTreeSet<StateId> = graph
        .nodes()
        .enumerate()
        .filter(|(_, node)| conventions.is_accepting(node))
        .map(|(i, _)| i)
        .collect();

    trace!(
        "validated DFA with {} states and {} symbols",
        states.len(),
        alphabet.len()
    );
    Ok(Dfa::from_parts(
        states,
        alphabet,
        transitions,
        accepting,
        initial,
    ))
}
