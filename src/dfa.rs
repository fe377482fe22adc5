use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;

use crate::{math::Bijection, show::Show};

mod validate;
pub use validate::{check, check_with, validate, validate_with, ValidationError};

/// Index of a state in a [`Dfa`]. Indices are dense and assigned in the order in which
/// states are declared.
pub type StateId = usize;

/// A deterministic finite automaton over an alphabet of string symbols.
///
/// Values of this type are only handed out after the automaton was checked to be
/// deterministic and complete, see [`check`], or by the minimization, see
/// [`crate::minimization::minimize`]. Hence [`Dfa::successor`] is defined for every
/// state that is connected to some edge and every symbol of the alphabet, isolated states
/// have no transitions at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dfa {
    states: Bijection<String, StateId>,
    alphabet: IndexSet<String>,
    transitions: Vec<IndexMap<usize, StateId>>,
    accepting: BTreeSet<StateId>,
    initial: StateId,
}

impl Dfa {
    /// Assembles a DFA from its parts. Each entry of `transitions` maps the position of a
    /// symbol in `alphabet` to the target state, one entry per state.
    pub(crate) fn from_parts(
        states: Bijection<String, StateId>,
        alphabet: IndexSet<String>,
        transitions: Vec<IndexMap<usize, StateId>>,
        accepting: BTreeSet<StateId>,
        initial: StateId,
    ) -> Self {
        debug_assert_eq!(states.len(), transitions.len());
        debug_assert!(initial < states.len());
        Self {
            states,
            alphabet,
            transitions,
            accepting,
            initial,
        }
    }

    /// The number of states.
    pub fn size(&self) -> usize {
        self.states.len()
    }

    /// Iterates over all state indices in ascending order.
    pub fn state_indices(&self) -> impl Iterator<Item = StateId> + '_ {
        0..self.size()
    }

    /// Returns the name of the state with index `id`.
    pub fn state_name(&self, id: StateId) -> Option<&str> {
        self.states.get_by_right(&id).map(|s| s.as_str())
    }

    /// Returns the index of the state called `name`.
    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.states.get_by_left(name).copied()
    }

    /// The symbols of the alphabet in the order in which they were first seen.
    pub fn alphabet(&self) -> impl Iterator<Item = &str> + '_ {
        self.alphabet.iter().map(|s| s.as_str())
    }

    /// The designated initial state.
    pub fn initial(&self) -> StateId {
        self.initial
    }

    /// Returns true if `id` is an accepting state.
    pub fn is_accepting(&self, id: StateId) -> bool {
        self.accepting.contains(&id)
    }

    /// The accepting states in ascending order.
    pub fn accepting_states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.accepting.iter().copied()
    }

    /// Returns the state that is reached from `from` on `symbol`.
    pub fn successor(&self, from: StateId, symbol: &str) -> Option<StateId> {
        let position = self.alphabet.get_index_of(symbol)?;
        self.transitions.get(from)?.get(&position).copied()
    }

    /// Iterates over the outgoing transitions of `from` as `(symbol, target)` pairs, in
    /// the order in which they were added.
    pub fn transitions_from(&self, from: StateId) -> impl Iterator<Item = (&str, StateId)> + '_ {
        self.transitions
            .get(from)
            .into_iter()
            .flat_map(|edges| edges.iter())
            .map(|(sym, target)| (self.alphabet[*sym].as_str(), *target))
    }

    /// Iterates over all transitions as `(source, symbol, target)` triples.
    pub fn transitions(&self) -> impl Iterator<Item = (StateId, &str, StateId)> + '_ {
        self.state_indices()
            .flat_map(move |q| self.transitions_from(q).map(move |(a, p)| (q, a, p)))
    }

    /// Runs the automaton on `word` from the initial state and returns whether the reached
    /// state is accepting. Words containing symbols outside the alphabet are rejected.
    pub fn accepts<'a, W>(&self, word: W) -> bool
    where
        W: IntoIterator<Item = &'a str>,
    {
        word.into_iter()
            .try_fold(self.initial, |q, sym| self.successor(q, sym))
            .map_or(false, |q| self.is_accepting(q))
    }

    /// Returns a string representation of the transition table.
    pub fn build_transition_table(&self) -> String {
        use owo_colors::OwoColorize;

        let mut builder = tabled::builder::Builder::default();
        builder.push_record(std::iter::once("State".to_string()).chain(self.alphabet.iter().cloned()));
        for q in self.state_indices() {
            let mut name = self.state_name(q).unwrap_or_default().to_string();
            if self.is_accepting(q) {
                name = format!("({name})");
            }
            if q == self.initial {
                name = format!("->{}", name.bold());
            }
            let mut row = vec![name];
            for sym in self.alphabet() {
                row.push(
                    self.successor(q, sym)
                        .and_then(|p| self.state_name(p))
                        .unwrap_or("-")
                        .to_string(),
                );
            }
            builder.push_record(row);
        }

        builder
            .build()
            .with(tabled::settings::Style::rounded())
            .to_string()
    }
}

impl Show for Dfa {
    fn show(&self) -> String {
        self.build_transition_table()
    }
}

impl std::fmt::Display for Dfa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DFA with states {} over {{{}}}, accepting {}",
            self.state_indices()
                .filter_map(|q| self.state_name(q))
                .map(|s| s.to_string())
                .collect::<BTreeSet<_>>()
                .show(),
            self.alphabet().join(", "),
            self.accepting_states()
                .filter_map(|q| self.state_name(q))
                .map(|s| s.to_string())
                .collect::<BTreeSet<_>>()
                .show(),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::{prelude::*, tests::three_state_graph};

    #[test]
    fn accepts_words() {
        let dfa = check(&three_state_graph()).unwrap();
        assert_eq!(dfa.size(), 3);
        assert_eq!(dfa.alphabet().collect::<Vec<_>>(), vec!["0", "1"]);
        assert!(!dfa.accepts(std::iter::empty::<&str>()));
        assert!(dfa.accepts(["0"]));
        assert!(dfa.accepts(["1", "0", "1"]));
        assert!(!dfa.accepts(["2"]));
    }

    #[test]
    fn transition_table_mentions_every_state() {
        let dfa = check(&three_state_graph()).unwrap();
        let table = dfa.show();
        for name in ["A", "B", "C"] {
            assert!(table.contains(name));
        }
        assert_eq!(dfa.transitions().count(), 6);
    }
}
