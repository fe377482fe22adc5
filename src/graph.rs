use indexmap::{IndexMap, IndexSet};
use thiserror::Error;
use tracing::trace;

/// Errors that can occur when adapting node and edge records into a [`Graph`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdaptError {
    /// A node or an edge endpoint had an empty identifier.
    #[error("encountered node with empty identifier")]
    EmptyIdentifier,
    /// The same node was declared twice with different attributes.
    #[error("node \"{0}\" is declared more than once with conflicting attributes")]
    ConflictingDeclaration(String),
}

/// Strips surrounding whitespace and one pair of surrounding double quotes from a raw
/// attribute value, `"\"doublecircle\" "` becomes `doublecircle`.
pub fn unquote(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
    trimmed.trim()
}

/// The attributes of a node or an edge, stored with their raw values in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(IndexMap<String, String>);

impl Attributes {
    /// Creates a new attribute list from key-value pairs. Later pairs overwrite earlier ones.
    pub fn new<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns the unquoted value of attribute `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| unquote(v))
    }

    /// Returns the raw, unprocessed value of attribute `key`.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| v.as_str())
    }

    /// The `shape` attribute, or the empty string.
    pub fn shape(&self) -> &str {
        self.get("shape").unwrap_or_default()
    }

    /// The `style` attribute, or the empty string.
    pub fn style(&self) -> &str {
        self.get("style").unwrap_or_default()
    }

    /// The `label` attribute, or the empty string.
    pub fn label(&self) -> &str {
        self.get("label").unwrap_or_default()
    }

    /// Returns true if no attribute is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over all key-value pairs with raw values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A node of a [`Graph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: String,
    attributes: Attributes,
}

impl Node {
    /// The identifier of the node.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The attributes of the node.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// A directed edge of a [`Graph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    from: String,
    to: String,
    attributes: Attributes,
}

impl Edge {
    /// The identifier of the source node.
    pub fn from(&self) -> &str {
        &self.from
    }

    /// The identifier of the target node.
    pub fn to(&self) -> &str {
        &self.to
    }

    /// The attributes of the edge.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The unquoted label, or the empty string.
    pub fn label(&self) -> &str {
        self.attributes.label()
    }

    /// Splits the label on commas into the symbols it stands for. Surrounding whitespace
    /// is dropped and empty pieces are skipped, so an empty label yields no symbol at all.
    pub fn symbols(&self) -> impl Iterator<Item = &str> + '_ {
        self.label()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// A directed graph whose nodes and edges carry attributes, the way a graph description
/// in the DOT format looks after parsing. Nodes are kept in declaration order, endpoints
/// of edges that were never declared are added (without attributes) in the order in which
/// they are first mentioned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    nodes: IndexMap<String, Node>,
    edges: Vec<Edge>,
}

impl Graph {
    /// Returns a [`GraphBuilder`] for constructing a graph.
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    /// Iterates over all nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    /// Iterates over all edges in declaration order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter()
    }

    /// Looks up the node with the given identifier.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The number of nodes.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }
}

/// Builder for [`Graph`]s, collects node and edge records and checks them for consistency
/// when [`GraphBuilder::build`] is called.
///
/// # Example
/// ```
/// use automata_analysis::prelude::*;
///
/// let graph = Graph::builder()
///     .with_node("q0", [("style", "bold")])
///     .with_node("q1", [("shape", "doublecircle")])
///     .with_edges([("q0", "a", "q1"), ("q1", "a", "q1")])
///     .build()
///     .unwrap();
/// assert_eq!(graph.size(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    nodes: Vec<(String, Attributes)>,
    edges: Vec<(String, String, Attributes)>,
}

impl GraphBuilder {
    /// Declares a node with the given attributes.
    pub fn with_node<K, V, I>(mut self, id: impl Into<String>, attributes: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.nodes.push((id.into(), Attributes::new(attributes)));
        self
    }

    /// Declares all the given nodes, each given as an identifier and a shape.
    pub fn with_shaped_nodes<S, T, I>(self, nodes: I) -> Self
    where
        S: Into<String>,
        T: Into<String>,
        I: IntoIterator<Item = (S, T)>,
    {
        nodes.into_iter().fold(self, |builder, (id, shape)| {
            let shape: String = shape.into();
            builder.with_node(id, [("shape", shape)])
        })
    }

    /// Adds an edge with the given attributes.
    pub fn with_edge_attributes<K, V, I>(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        attributes: I,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.edges
            .push((from.into(), to.into(), Attributes::new(attributes)));
        self
    }

    /// Adds an edge from `from` to `to` carrying `label`.
    pub fn with_edge(
        self,
        from: impl Into<String>,
        label: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        let label: String = label.into();
        self.with_edge_attributes(from, to, [("label", label)])
    }

    /// Adds all edges given as `(from, label, to)` triples.
    pub fn with_edges<F, L, T, I>(self, edges: I) -> Self
    where
        F: Into<String>,
        L: Into<String>,
        T: Into<String>,
        I: IntoIterator<Item = (F, L, T)>,
    {
        edges
            .into_iter()
            .fold(self, |builder, (from, label, to)| {
                builder.with_edge(from, label, to)
            })
    }

    /// Adds unlabeled edges given as `(from, to)` pairs.
    pub fn with_arcs<F, T, I>(self, arcs: I) -> Self
    where
        F: Into<String>,
        T: Into<String>,
        I: IntoIterator<Item = (F, T)>,
    {
        arcs.into_iter().fold(self, |builder, (from, to)| {
            builder.with_edge_attributes(from, to, std::iter::empty::<(String, String)>())
        })
    }

    /// Consumes the builder and produces the [`Graph`]. Declaring a node twice with
    /// identical attributes is fine, declaring it with differing ones is an error.
    pub fn build(self) -> Result<Graph, AdaptError> {
        let mut nodes: IndexMap<String, Node> = IndexMap::new();

        for (id, attributes) in self.nodes {
            if id.trim().is_empty() {
                return Err(AdaptError::EmptyIdentifier);
            }
            match nodes.get(&id) {
                Some(existing) if existing.attributes != attributes => {
                    return Err(AdaptError::ConflictingDeclaration(id));
                }
                Some(_) => {}
                None => {
                    nodes.insert(id.clone(), Node { id, attributes });
                }
            }
        }

        let mut implicit = IndexSet::new();
        let mut edges = Vec::with_capacity(self.edges.len());
        for (from, to, attributes) in self.edges {
            for endpoint in [&from, &to] {
                if endpoint.trim().is_empty() {
                    return Err(AdaptError::EmptyIdentifier);
                }
                if !nodes.contains_key(endpoint.as_str()) {
                    implicit.insert(endpoint.clone());
                    nodes.insert(
                        endpoint.clone(),
                        Node {
                            id: endpoint.clone(),
                            attributes: Attributes::default(),
                        },
                    );
                }
            }
            edges.push(Edge {
                from,
                to,
                attributes,
            });
        }

        if !implicit.is_empty() {
            trace!("implicitly declared nodes {:?}", implicit);
        }

        Ok(Graph { nodes, edges })
    }
}

/// Configures how the attributes of a [`Graph`] are interpreted. The defaults follow
/// the usual graphviz drawing conventions for automata and Petri nets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conventions {
    epsilon: String,
    initial_style: String,
    accepting_shape: String,
    place_shape: String,
    place_prefix: String,
    transition_shape: String,
    transition_prefix: String,
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            epsilon: "ε".into(),
            initial_style: "bold".into(),
            accepting_shape: "doublecircle".into(),
            place_shape: "circle".into(),
            place_prefix: "p".into(),
            transition_shape: "box".into(),
            transition_prefix: "t".into(),
        }
    }
}

impl Conventions {
    /// Sets the reserved symbol that denotes an ε-transition.
    pub fn with_epsilon(mut self, epsilon: impl Into<String>) -> Self {
        self.epsilon = epsilon.into();
        self
    }

    /// Sets the style token that marks the initial state.
    pub fn with_initial_style(mut self, style: impl Into<String>) -> Self {
        self.initial_style = style.into();
        self
    }

    /// Sets the shape that marks accepting states.
    pub fn with_accepting_shape(mut self, shape: impl Into<String>) -> Self {
        self.accepting_shape = shape.into();
        self
    }

    /// Sets the shape and the identifier prefix that mark places.
    pub fn with_place(mut self, shape: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.place_shape = shape.into();
        self.place_prefix = prefix.into();
        self
    }

    /// Sets the shape and the identifier prefix that mark transitions.
    pub fn with_transition(mut self, shape: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.transition_shape = shape.into();
        self.transition_prefix = prefix.into();
        self
    }

    /// The reserved ε symbol.
    pub fn epsilon(&self) -> &str {
        &self.epsilon
    }

    /// The shape of places.
    pub fn place_shape(&self) -> &str {
        &self.place_shape
    }

    /// The shape of transitions.
    pub fn transition_shape(&self) -> &str {
        &self.transition_shape
    }

    /// Returns true if `symbol` is the reserved ε symbol.
    pub fn is_epsilon(&self, symbol: &str) -> bool {
        symbol == self.epsilon
    }

    /// A node is initial if one of the comma separated tokens of its style is the initial marker.
    pub fn is_initial(&self, node: &Node) -> bool {
        node.attributes()
            .style()
            .split(',')
            .any(|token| token.trim() == self.initial_style)
    }

    /// A node is accepting if its shape mentions the accepting shape.
    pub fn is_accepting(&self, node: &Node) -> bool {
        node.attributes().shape().contains(&self.accepting_shape)
    }

    /// A node is a place if it has the place shape or, failing that, its identifier has the place prefix.
    pub fn is_place(&self, node: &Node) -> bool {
        node.attributes().shape() == self.place_shape || node.id().starts_with(&self.place_prefix)
    }

    /// A node is a transition if it has the transition shape or its identifier has the
    /// transition prefix. Places take precedence, see [`Conventions::is_place`].
    pub fn is_transition(&self, node: &Node) -> bool {
        !self.is_place(node)
            && (node.attributes().shape() == self.transition_shape
                || node.id().starts_with(&self.transition_prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquoting() {
        assert_eq!(unquote("\"doublecircle\""), "doublecircle");
        assert_eq!(unquote("  \" a, b \" "), "a, b");
        assert_eq!(unquote("box"), "box");
        assert_eq!(unquote("\"\""), "");
    }

    #[test]
    fn implicit_nodes_follow_first_mention() {
        let graph = Graph::builder()
            .with_node("b", [("shape", "circle")])
            .with_edges([("a", "x", "b"), ("b", "x", "c")])
            .build()
            .unwrap();
        let ids: Vec<_> = graph.nodes().map(|n| n.id()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!(graph.node("a").unwrap().attributes().is_empty());
    }

    #[test]
    fn conflicting_declarations_are_rejected() {
        let result = Graph::builder()
            .with_node("q0", [("shape", "circle")])
            .with_node("q0", [("shape", "doublecircle")])
            .build();
        assert_eq!(
            result,
            Err(AdaptError::ConflictingDeclaration("q0".to_string()))
        );

        let same = Graph::builder()
            .with_node("q0", [("shape", "circle")])
            .with_node("q0", [("shape", "circle")])
            .build();
        assert!(same.is_ok());

        let empty = Graph::builder().with_edge("", "a", "q0").build();
        assert_eq!(empty, Err(AdaptError::EmptyIdentifier));
    }

    #[test]
    fn edge_symbols() {
        let graph = Graph::builder()
            .with_edge("q0", "\"a, b,\"", "q1")
            .with_edge("q1", "  ", "q0")
            .build()
            .unwrap();
        let symbols: Vec<Vec<&str>> = graph.edges().map(|e| e.symbols().collect()).collect();
        assert_eq!(symbols, vec![vec!["a", "b"], vec![]]);
    }

    #[test]
    fn conventions() {
        let conventions = Conventions::default();
        let graph = Graph::builder()
            .with_node("q0", [("style", "\"filled, bold\"")])
            .with_node("q1", [("shape", "doublecircle"), ("style", "semibold")])
            .with_node("t1", std::iter::empty::<(String, String)>())
            .with_node("x", [("shape", "box")])
            .with_node("pt", [("shape", "box")])
            .build()
            .unwrap();
        let node = |id: &str| graph.node(id).unwrap();

        assert!(conventions.is_initial(node("q0")));
        assert!(!conventions.is_initial(node("q1")));
        assert!(conventions.is_accepting(node("q1")));
        assert!(conventions.is_transition(node("t1")));
        assert!(conventions.is_transition(node("x")));
        // the name fallback for places wins over the transition shape
        assert!(conventions.is_place(node("pt")));
        assert!(!conventions.is_transition(node("pt")));

        let custom = Conventions::default().with_initial_style("semibold");
        assert!(custom.is_initial(node("q1")));
    }
}
