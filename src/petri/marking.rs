use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use itertools::Itertools;
use thiserror::Error;
use tracing::debug;

use super::{PetriNet, PlaceId, Transition};
use crate::show::Show;

/// The number of tokens on a place. `Omega` stands for an unbounded number of tokens, it is
/// larger than every finite count and stays `Omega` when tokens are added or removed.
///
/// The derived order puts every `Finite` count below `Omega`, so comparing two markings
/// place by place with `>=` already treats ω as absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tokens {
    /// A concrete number of tokens.
    Finite(u64),
    /// Arbitrarily many tokens.
    Omega,
}

impl Tokens {
    /// Returns true if at least one token can be consumed.
    pub fn is_positive(&self) -> bool {
        match self {
            Tokens::Finite(n) => *n > 0,
            Tokens::Omega => true,
        }
    }

    /// Returns true if `self` is ω.
    pub fn is_omega(&self) -> bool {
        matches!(self, Tokens::Omega)
    }

    /// Removes one token, returns `None` if there is none.
    pub fn decrement(self) -> Option<Self> {
        match self {
            Tokens::Finite(n) => n.checked_sub(1).map(Tokens::Finite),
            Tokens::Omega => Some(Tokens::Omega),
        }
    }

    /// Adds one token.
    pub fn increment(self) -> Self {
        match self {
            Tokens::Finite(n) => Tokens::Finite(n.saturating_add(1)),
            Tokens::Omega => Tokens::Omega,
        }
    }
}

impl Default for Tokens {
    fn default() -> Self {
        Tokens::Finite(0)
    }
}

impl From<u64> for Tokens {
    fn from(value: u64) -> Self {
        Tokens::Finite(value)
    }
}

impl Display for Tokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tokens::Finite(n) => write!(f, "{n}"),
            Tokens::Omega => write!(f, "∞"),
        }
    }
}

/// A marking assigns a token count to every place of a net. Counts are stored by [`PlaceId`],
/// that is in the lexicographic order of the place names, which makes a marking its own
/// canonical key: two markings are equal exactly if they agree on every place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Marking(Vec<Tokens>);

impl Marking {
    /// Creates a marking from the token counts of places `0, 1, ...`.
    pub fn new(tokens: impl IntoIterator<Item = Tokens>) -> Self {
        Self(tokens.into_iter().collect())
    }

    /// The empty marking on `places` places.
    pub fn zero(places: usize) -> Self {
        Self(vec![Tokens::default(); places])
    }

    /// The number of tokens on `place`, places beyond the marking carry no tokens.
    pub fn get(&self, place: PlaceId) -> Tokens {
        self.0.get(place).copied().unwrap_or_default()
    }

    /// Iterates over the token counts in place order.
    pub fn iter(&self) -> impl Iterator<Item = Tokens> + '_ {
        self.0.iter().copied()
    }

    /// Returns a marking on exactly `places` places, missing places carry no tokens and
    /// places beyond `places` are dropped.
    pub fn padded(&self, places: usize) -> Self {
        Self((0..places).map(|place| self.get(place)).collect())
    }

    /// The number of places.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the marking ranges over no place at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if some place carries ω tokens.
    pub fn has_omega(&self) -> bool {
        self.0.iter().any(Tokens::is_omega)
    }

    /// A transition is enabled if each of its input places carries at least as many tokens
    /// as the weight of the arc from that place, ω is always enough.
    pub fn enables(&self, transition: &Transition) -> bool {
        transition.inputs().iter().all(|&place| match self.get(place) {
            Tokens::Finite(n) => n >= transition.input_weight(place) as u64,
            Tokens::Omega => true,
        })
    }

    /// Fires `transition` by consuming one token per input arc and producing one token per
    /// output arc. Returns `None` if the transition is not enabled.
    pub fn fire(&self, transition: &Transition) -> Option<Self> {
        let mut next = self.clone();
        for &place in transition.inputs() {
            let slot = next.0.get_mut(place)?;
            *slot = slot.decrement()?;
        }
        for &place in transition.outputs() {
            let slot = next.0.get_mut(place)?;
            *slot = slot.increment();
        }
        Some(next)
    }

    /// Returns true if `self` is pointwise at least `other`. ω is only matched by ω.
    pub fn covers(&self, other: &Marking) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(&other.0).all(|(new, old)| new >= old)
    }

    /// Returns true if `self` covers `other` and is strictly larger on at least one place.
    pub fn strictly_covers(&self, other: &Marking) -> bool {
        self.covers(other) && self.0.iter().zip(&other.0).any(|(new, old)| new > old)
    }

    /// Sets every place on which `self` strictly exceeds `ancestor` to ω and returns the
    /// affected places.
    pub fn accelerate(&mut self, ancestor: &Marking) -> Vec<PlaceId> {
        let mut raised = vec![];
        for (place, (new, old)) in self.0.iter_mut().zip(&ancestor.0).enumerate() {
            if *new > *old {
                if !new.is_omega() {
                    raised.push(place);
                }
                *new = Tokens::Omega;
            }
        }
        raised
    }

    /// Renders the marking as `name=count` pairs joined by `separator`.
    pub fn labelled<'a>(&self, names: impl IntoIterator<Item = &'a str>, separator: &str) -> String {
        names
            .into_iter()
            .zip(&self.0)
            .map(|(name, tokens)| format!("{name}={tokens}"))
            .join(separator)
    }
}

impl Show for Marking {
    fn show(&self) -> String {
        format!("({})", self.0.iter().join(", "))
    }
}

/// Errors in the textual description of an initial marking.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkingParseError {
    /// An entry does not have the form `place=count`.
    #[error("expected an entry of the form place=count, found \"{0}\"")]
    MalformedEntry(String),
    /// The count of a place is not a non-negative integer.
    #[error("token count \"{count}\" of place \"{place}\" is not a non-negative integer")]
    InvalidCount {
        /// the place
        place: String,
        /// the count as it was given
        count: String,
    },
    /// A place is given more than once.
    #[error("place \"{0}\" is given more than once")]
    Duplicate(String),
}

/// An initial marking as supplied by a user, mapping place names to token counts. Places of a
/// net that are not mentioned carry no tokens.
///
/// The textual form lists `place=count` entries (`place:count` works as well) separated by
/// commas, semicolons or line breaks.
/// ```
/// use automata_analysis::prelude::*;
///
/// let initial: InitialMarking = "p1=1, p2 = 0; p4:3".parse().unwrap();
/// assert_eq!(initial.tokens("p4"), 3);
/// assert_eq!(initial.tokens("p3"), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitialMarking(BTreeMap<String, u64>);

impl InitialMarking {
    /// The number of tokens on the place called `place`.
    pub fn tokens(&self, place: &str) -> u64 {
        self.0.get(place).copied().unwrap_or(0)
    }

    /// Builds the [`Marking`] of `net` described by `self`. Entries for places that do not
    /// exist in `net` are ignored.
    pub fn for_net(&self, net: &PetriNet) -> Marking {
        for unknown in self.0.keys().filter(|p| net.place_id(p).is_none()) {
            debug!("ignoring tokens of unknown place \"{unknown}\"");
        }
        Marking::new(
            net.places()
                .map(|p| Tokens::Finite(self.tokens(p))),
        )
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for InitialMarking {
    fn from_iter<T: IntoIterator<Item = (S, u64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(p, n)| (p.into(), n)).collect())
    }
}

impl FromStr for InitialMarking {
    type Err = MarkingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = BTreeMap::new();
        for entry in s
            .split(|c: char| matches!(c, ',' | ';' | '\n'))
            .map(str::trim)
            .filter(|e| !e.is_empty())
        {
            let Some((place, count)) = entry.split_once(|c: char| c == '=' || c == ':') else {
                return Err(MarkingParseError::MalformedEntry(entry.to_string()));
            };
            let (place, count) = (place.trim(), count.trim());
            if place.is_empty() {
                return Err(MarkingParseError::MalformedEntry(entry.to_string()));
            }
            let count: u64 = count.parse().map_err(|_| MarkingParseError::InvalidCount {
                place: place.to_string(),
                count: count.to_string(),
            })?;
            if tokens.insert(place.to_string(), count).is_some() {
                return Err(MarkingParseError::Duplicate(place.to_string()));
            }
        }
        Ok(Self(tokens))
    }
}
