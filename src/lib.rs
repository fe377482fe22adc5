//! Library for analysing automata and Petri nets that are drawn as graphs.
//!
//! The input is always a [`graph::Graph`], an ordered collection of nodes and edges that carry
//! DOT style attributes. How attributes are interpreted is configured through
//! [`graph::Conventions`]: by default a node with `style=bold` is initial, a node with
//! `shape=doublecircle` is accepting, circles are places and boxes are transitions.
//!
//! Two analyses are offered on top of this model.
//! - Finite automata: [`dfa::check`] verifies that a graph describes a deterministic and
//!   complete automaton and produces a [`dfa::Dfa`], which [`minimization::minimize`] reduces
//!   to its minimal equivalent using Hopcroft's partition refinement.
//! - Petri nets: [`petri::build`] reads a [`petri::PetriNet`] off a graph and
//!   [`petri::explore`] computes its coverability tree, where places that can hold
//!   arbitrarily many tokens are marked with ω.
//!
//! Results can be shown as text through [`Show`] and written in the DOT format through
//! [`dot::Dottable`].
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use thiserror::Error;

/// The prelude is supposed to make using this package easier. Including everything, i.e.
/// `use automata_analysis::prelude::*;` should be enough to use the package.
pub mod prelude {
    pub use super::{
        dfa::{check, check_with, validate, validate_with, Dfa, StateId, ValidationError},
        dot::{DotStateAttribute, DotTransitionAttribute, Dottable},
        graph::{AdaptError, Attributes, Conventions, Edge, Graph, GraphBuilder, Node},
        math::Partition,
        minimization::{minimize, minimize_with, Minimized},
        petri::{
            build, build_with, check_shape_with, cover, cover_with, explore, is_petri_net,
            CoverabilityNode, CoverabilityTree, InitialMarking, Marking, MarkingParseError,
            NodeId, NodeKind, PetriNet, PlaceId, ShapeError, Tokens, Transition, TransitionId,
        },
        Failure, Show,
    };
}

/// This module contains some definitions of mathematical objects which are used throughout the crate and
/// do not really fit to the top level.
pub mod math;

mod show;
pub use show::Show;

/// The graph model that all analyses start from, and the conventions for reading it.
pub mod graph;

/// Deterministic finite automata and the check that turns a graph into one.
pub mod dfa;

/// Minimization of deterministic finite automata.
pub mod minimization;

/// Petri nets, their markings and coverability trees.
pub mod petri;

/// Writing automata and coverability trees in the DOT format.
pub mod dot;

/// The ways in which a public operation of this crate can fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The graph does not describe a deterministic and complete automaton.
    #[error("validation failed: {0}")]
    Validation(#[from] dfa::ValidationError),
    /// The node and edge records could not be turned into a graph.
    #[error("graph adaptation failed: {0}")]
    Adaptation(#[from] graph::AdaptError),
    /// The initial marking could not be parsed.
    #[error("invalid initial marking: {0}")]
    Marking(#[from] petri::MarkingParseError),
}
