use indexmap::IndexMap;
use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, trace};

use crate::graph::{Conventions, Graph};

/// Index of a place, places are numbered in the lexicographic order of their names.
pub type PlaceId = usize;
/// Index of a transition, transitions are numbered in the order in which they are declared.
pub type TransitionId = usize;

/// A transition of a [`PetriNet`] with its input and output arcs. A place that occurs several
/// times among the inputs (outputs) is connected by an arc of the respective weight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    inputs: Vec<PlaceId>,
    outputs: Vec<PlaceId>,
}

impl Transition {
    /// Creates a transition from its input and output places.
    pub fn new(
        inputs: impl IntoIterator<Item = PlaceId>,
        outputs: impl IntoIterator<Item = PlaceId>,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            outputs: outputs.into_iter().collect(),
        }
    }

    /// The input places, one entry per arc.
    pub fn inputs(&self) -> &[PlaceId] {
        &self.inputs
    }

    /// The output places, one entry per arc.
    pub fn outputs(&self) -> &[PlaceId] {
        &self.outputs
    }

    /// The weight of the arc from `place` into this transition.
    pub fn input_weight(&self, place: PlaceId) -> usize {
        self.inputs.iter().filter(|p| **p == place).count()
    }

    /// The weight of the arc from this transition into `place`.
    pub fn output_weight(&self, place: PlaceId) -> usize {
        self.outputs.iter().filter(|p| **p == place).count()
    }
}

/// A place/transition net.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PetriNet {
    places: Vec<String>,
    transitions: IndexMap<String, Transition>,
}

impl PetriNet {
    /// Creates a net from place names and named transitions. Place names are sorted and
    /// deduplicated, the arcs of the transitions refer to places by name; arcs to unknown
    /// places are dropped.
    pub fn new<P, T, S>(places: P, transitions: T) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
        T: IntoIterator<Item = (S, Vec<S>, Vec<S>)>,
    {
        let places: Vec<String> = places
            .into_iter()
            .map(Into::<String>::into)
            .sorted()
            .dedup()
            .collect();
        let mut net = Self {
            places,
            transitions: IndexMap::new(),
        };
        for (name, inputs, outputs) in transitions {
            let resolve = |names: Vec<S>| -> Vec<PlaceId> {
                names
                    .into_iter()
                    .filter_map(|n| {
                        let n: String = n.into();
                        net.place_id(&n)
                    })
                    .collect()
            };
            let transition = Transition::new(resolve(inputs), resolve(outputs));
            net.transitions.insert(name.into(), transition);
        }
        net
    }

    /// The place names in [`PlaceId`] order.
    pub fn places(&self) -> impl Iterator<Item = &str> + '_ {
        self.places.iter().map(|p| p.as_str())
    }

    /// The number of places.
    pub fn place_count(&self) -> usize {
        self.places.len()
    }

    /// Looks up the index of the place called `name`.
    pub fn place_id(&self, name: &str) -> Option<PlaceId> {
        self.places
            .binary_search_by(|p| p.as_str().cmp(name))
            .ok()
    }

    /// The name of place `id`.
    pub fn place_name(&self, id: PlaceId) -> Option<&str> {
        self.places.get(id).map(|p| p.as_str())
    }

    /// Iterates over all transitions in declaration order.
    pub fn transitions(&self) -> impl Iterator<Item = (TransitionId, &str, &Transition)> + '_ {
        self.transitions
            .iter()
            .enumerate()
            .map(|(i, (name, t))| (i, name.as_str(), t))
    }

    /// The transition called `name`.
    pub fn transition(&self, name: &str) -> Option<&Transition> {
        self.transitions.get(name)
    }

    /// The name of transition `id`.
    pub fn transition_name(&self, id: TransitionId) -> Option<&str> {
        self.transitions.get_index(id).map(|(name, _)| name.as_str())
    }
}

/// Reads a [`PetriNet`] off `graph`, using the default [`Conventions`].
pub fn build(graph: &Graph) -> PetriNet {
    build_with(graph, &Conventions::default())
}

/// Reads a [`PetriNet`] off `graph`. Nodes are classified with [`Conventions::is_place`] and
/// [`Conventions::is_transition`], nodes that are neither are ignored. Edges from a place to
/// a transition become input arcs, edges from a transition to a place output arcs and all
/// other edges are ignored.
pub fn build_with(graph: &Graph, conventions: &Conventions) -> PetriNet {
    let places: Vec<&str> = graph
        .nodes()
        .filter(|n| conventions.is_place(n))
        .map(|n| n.id())
        .collect();
    let mut arcs: IndexMap<&str, (Vec<&str>, Vec<&str>)> = graph
        .nodes()
        .filter(|n| conventions.is_transition(n))
        .map(|n| (n.id(), (vec![], vec![])))
        .collect();

    for edge in graph.edges() {
        let (from, to) = (edge.from(), edge.to());
        if places.contains(&from) && arcs.contains_key(to) {
            arcs[to].0.push(from);
        } else if places.contains(&to) && arcs.contains_key(from) {
            arcs[from].1.push(to);
        } else {
            trace!("ignoring edge {from} -> {to}, it does not connect a place and a transition");
        }
    }

    let net = PetriNet::new(
        places,
        arcs.into_iter()
            .map(|(name, (inputs, outputs))| (name, inputs, outputs)),
    );
    debug!(
        "built net with {} places and {} transitions",
        net.place_count(),
        net.transitions.len()
    );
    net
}

/// Violations of the bipartite shape of a Petri net drawing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// A node is neither drawn as a place nor as a transition.
    #[error("node \"{node}\" has shape \"{shape}\" which is neither a place nor a transition")]
    UnknownShape {
        /// the node
        node: String,
        /// its shape
        shape: String,
    },
    /// An edge connects two places or two transitions.
    #[error("edge from \"{from}\" to \"{to}\" connects two nodes of the same kind")]
    SameKind {
        /// source of the edge
        from: String,
        /// target of the edge
        to: String,
    },
}

/// Checks that every node of `graph` is drawn with the place or the transition shape and that
/// every edge connects a place with a transition. Unlike [`build_with`], this does not fall
/// back to the names of nodes.
pub fn check_shape_with(graph: &Graph, conventions: &Conventions) -> Result<(), ShapeError> {
    let kinds: IndexMap<&str, bool> = graph
        .nodes()
        .map(|node| {
            let shape = node.attributes().shape();
            if shape == conventions.place_shape() {
                Ok((node.id(), true))
            } else if shape == conventions.transition_shape() {
                Ok((node.id(), false))
            } else {
                Err(ShapeError::UnknownShape {
                    node: node.id().to_string(),
                    shape: shape.to_string(),
                })
            }
        })
        .collect::<Result<_, _>>()?;

    for edge in graph.edges() {
        if kinds.get(edge.from()) == kinds.get(edge.to()) {
            return Err(ShapeError::SameKind {
                from: edge.from().to_string(),
                to: edge.to().to_string(),
            });
        }
    }
    Ok(())
}

/// Returns true if `graph` has the shape of a Petri net, see [`check_shape_with`].
pub fn is_petri_net(graph: &Graph) -> bool {
    check_shape_with(graph, &Conventions::default())
        .map_err(|e| debug!("not a petri net: {e}"))
        .is_ok()
}
