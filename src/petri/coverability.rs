use std::collections::BTreeSet;

use itertools::Itertools;
use tracing::{debug, trace, warn};

use super::{Marking, PetriNet, PlaceId, TransitionId};
use crate::{math::Set, show::Show};

/// Index of a node in a [`CoverabilityTree`].
pub type NodeId = usize;

/// Distinguishes expanded nodes from leaves whose marking had been seen before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The marking was seen for the first time and its successors were explored.
    Explored,
    /// The marking already occurs elsewhere in the tree, the node is a leaf.
    Repeat,
}

/// A node of a [`CoverabilityTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverabilityNode {
    marking: Marking,
    kind: NodeKind,
    parent: Option<(NodeId, TransitionId)>,
    children: Vec<NodeId>,
}

impl CoverabilityNode {
    /// The marking of the node.
    pub fn marking(&self) -> &Marking {
        &self.marking
    }

    /// Whether the node was explored or is a repeat leaf.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns true if this is a repeat leaf.
    pub fn is_repeat(&self) -> bool {
        self.kind == NodeKind::Repeat
    }

    /// The parent node and the transition whose firing led here, `None` for the root.
    pub fn parent(&self) -> Option<(NodeId, TransitionId)> {
        self.parent
    }

    /// The children in the order in which they were added to the tree.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A finite tree whose nodes are the markings reachable in a [`PetriNet`], where places with
/// unboundedly growing token counts are summarized by ω.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverabilityTree {
    places: Vec<String>,
    transitions: Vec<String>,
    nodes: Vec<CoverabilityNode>,
    visited: Set<Marking>,
}

/// A marking waiting to be added to the tree, together with the node and transition that
/// produced it and the markings on the path from the root to that node.
struct Pending {
    marking: Marking,
    trigger: Option<(NodeId, TransitionId)>,
    ancestors: Vec<Marking>,
}

impl CoverabilityTree {
    fn for_net(net: &PetriNet) -> Self {
        Self {
            places: net.places().map(|p| p.to_string()).collect(),
            transitions: net.transitions().map(|(_, n, _)| n.to_string()).collect(),
            nodes: vec![],
            visited: Set::default(),
        }
    }

    fn add_node(
        &mut self,
        marking: Marking,
        kind: NodeKind,
        parent: Option<(NodeId, TransitionId)>,
    ) -> NodeId {
        let id = self.nodes.len();
        if let Some((p, _)) = parent {
            self.nodes[p].children.push(id);
        }
        self.nodes.push(CoverabilityNode {
            marking,
            kind,
            parent,
            children: vec![],
        });
        id
    }

    /// The root node, whose marking is the initial marking.
    pub fn root(&self) -> NodeId {
        0
    }

    /// The node with index `id`.
    pub fn node(&self, id: NodeId) -> Option<&CoverabilityNode> {
        self.nodes.get(id)
    }

    /// Iterates over all nodes with their indices, in the order in which they were created.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &CoverabilityNode)> + '_ {
        self.nodes.iter().enumerate()
    }

    /// The number of nodes, including repeat leaves.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// The children of `id`.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children()).unwrap_or_default()
    }

    /// Iterates over all repeat leaves.
    pub fn repeats(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes()
            .filter(|(_, n)| n.is_repeat())
            .map(|(id, _)| id)
    }

    /// Iterates over all explored (non-repeat) nodes.
    pub fn explored(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes()
            .filter(|(_, n)| !n.is_repeat())
            .map(|(id, _)| id)
    }

    /// The set of distinct markings that occur in the tree.
    pub fn distinct_markings(&self) -> BTreeSet<&Marking> {
        self.nodes.iter().map(|n| &n.marking).collect()
    }

    /// Returns true if `marking` occurs in the tree.
    pub fn contains(&self, marking: &Marking) -> bool {
        self.visited.contains(marking)
    }

    /// Returns true if no marking in the tree contains ω, which means that the net is bounded.
    pub fn is_bounded(&self) -> bool {
        !self.nodes.iter().any(|n| n.marking.has_omega())
    }

    /// The names of the places that carry ω in some marking of the tree.
    pub fn unbounded_places(&self) -> Vec<&str> {
        (0..self.places.len())
            .filter(|&p| {
                self.nodes
                    .iter()
                    .any(|n| n.marking.get(p).is_omega())
            })
            .map(|p| self.places[p].as_str())
            .collect()
    }

    /// The place names in the order in which markings list their token counts.
    pub fn places(&self) -> impl Iterator<Item = &str> + '_ {
        self.places.iter().map(|p| p.as_str())
    }

    /// The name of the transition with index `id`.
    pub fn transition_name(&self, id: TransitionId) -> Option<&str> {
        self.transitions.get(id).map(|t| t.as_str())
    }

    /// The label of node `id`: one `place=count` line per place, ω shown as `∞`.
    pub fn label(&self, id: NodeId, separator: &str) -> String {
        self.nodes
            .get(id)
            .map(|n| n.marking.labelled(self.places(), separator))
            .unwrap_or_default()
    }

    /// Depth first traversal from the root, yielding nodes together with their depth.
    pub fn depth_first(&self) -> Vec<(usize, NodeId)> {
        let mut order = vec![];
        let mut stack = if self.nodes.is_empty() {
            vec![]
        } else {
            vec![(0, self.root())]
        };
        while let Some((depth, id)) = stack.pop() {
            order.push((depth, id));
            stack.extend(self.children(id).iter().rev().map(|c| (depth + 1, *c)));
        }
        order
    }
}

impl Show for CoverabilityTree {
    fn show(&self) -> String {
        self.depth_first()
            .into_iter()
            .map(|(depth, id)| {
                let node = &self.nodes[id];
                let edge = node
                    .parent
                    .and_then(|(_, t)| self.transition_name(t))
                    .map(|t| format!("--{t}--> "))
                    .unwrap_or_default();
                let repeat = if node.is_repeat() { " [repeat]" } else { "" };
                format!(
                    "{}{edge}n{id} {}{repeat}",
                    "  ".repeat(depth),
                    node.marking.labelled(self.places(), ", ")
                )
            })
            .join("\n")
    }
}

impl std::fmt::Display for CoverabilityTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.show())
    }
}

/// Builds the coverability tree of `net` starting in `initial`.
///
/// Pending markings are kept on a stack, so the tree is built depth first. When a marking is
/// taken from the stack and it already occurs in the tree, it becomes a repeat leaf.
/// Otherwise it is added and every enabled transition is fired. If the successor strictly
/// covers a marking on the path from the root to the parent of the current node, the
/// first such marking is used to set every strictly larger place to ω.
///
/// An `initial` marking with too few entries is padded with empty places.
pub fn explore(net: &PetriNet, initial: &Marking) -> CoverabilityTree {
    let mut tree = CoverabilityTree::for_net(net);
    if initial.len() != net.place_count() {
        warn!(
            "initial marking has {} entries for {} places, missing places get no tokens",
            initial.len(),
            net.place_count()
        );
    }

    let mut pending = vec![Pending {
        marking: initial.padded(net.place_count()),
        trigger: None,
        ancestors: vec![],
    }];

    while let Some(Pending {
        marking,
        trigger,
        ancestors,
    }) = pending.pop()
    {
        if tree.visited.contains(&marking) {
            trace!("{} repeats, not expanding it", marking.show());
            tree.add_node(marking, NodeKind::Repeat, trigger);
            continue;
        }
        tree.visited.insert(marking.clone());
        let id = tree.add_node(marking.clone(), NodeKind::Explored, trigger);

        let mut path = ancestors.clone();
        path.push(marking.clone());

        for (t, name, transition) in net.transitions() {
            if !marking.enables(transition) {
                continue;
            }
            let Some(mut successor) = marking.fire(transition) else {
                continue;
            };
            if let Some(ancestor) = ancestors.iter().find(|a| successor.strictly_covers(a)) {
                let raised: Vec<PlaceId> = successor.accelerate(ancestor);
                trace!(
                    "firing {name} in n{id} leads to {} which covers {}, raised {:?} to ω",
                    successor.show(),
                    ancestor.show(),
                    raised
                );
            }
            pending.push(Pending {
                marking: successor,
                trigger: Some((id, t)),
                ancestors: path.clone(),
            });
        }
    }

    debug!(
        "coverability tree has {} nodes, {} of them repeats",
        tree.size(),
        tree.repeats().count()
    );
    tree
}

impl PetriNet {
    /// Builds the coverability tree of `self` from `initial`, see [`explore`].
    pub fn coverability_tree(&self, initial: &Marking) -> CoverabilityTree {
        explore(self, initial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        petri::{build, Tokens},
        prelude::*,
        tests::producer_consumer_graph,
    };

    fn m(tokens: &[Option<u64>]) -> Marking {
        Marking::new(
            tokens
                .iter()
                .map(|t| t.map_or(Tokens::Omega, Tokens::Finite)),
        )
    }

    fn self_loop_doubler() -> PetriNet {
        PetriNet::new(["p1"], [("t1", vec!["p1"], vec!["p1", "p1"])])
    }

    #[test_log::test]
    fn doubling_place_becomes_omega() {
        let tree = explore(&self_loop_doubler(), &m(&[Some(1)]));

        let explored: Vec<&Marking> = tree
            .explored()
            .map(|id| tree.node(id).unwrap().marking())
            .collect();
        assert_eq!(explored, vec![&m(&[Some(1)]), &m(&[Some(2)]), &m(&[None])]);

        let repeats: Vec<NodeId> = tree.repeats().collect();
        assert_eq!(repeats.len(), 1);
        let repeat = tree.node(repeats[0]).unwrap();
        assert_eq!(repeat.marking(), &m(&[None]));
        assert!(repeat.children().is_empty());

        // root -> (2) -> (ω) -> repeat (ω)
        assert_eq!(tree.depth_first().last(), Some(&(3, repeats[0])));
        assert!(!tree.is_bounded());
        assert_eq!(tree.unbounded_places(), vec!["p1"]);
    }

    #[test]
    fn dead_net_has_single_node() {
        let tree = explore(&self_loop_doubler(), &m(&[Some(0)]));
        assert_eq!(tree.size(), 1);
        assert!(tree.children(tree.root()).is_empty());
        assert!(tree.is_bounded());
    }

    #[test]
    fn returning_to_a_marking_creates_a_repeat() {
        // a token moving back and forth between two places
        let net = PetriNet::new(
            ["p1", "p2"],
            [
                ("t1", vec!["p1"], vec!["p2"]),
                ("t2", vec!["p2"], vec!["p1"]),
            ],
        );
        let tree = explore(&net, &m(&[Some(1), Some(0)]));
        assert_eq!(tree.size(), 3);
        assert_eq!(tree.explored().count(), 2);
        let repeat = tree.repeats().next().unwrap();
        assert_eq!(tree.node(repeat).unwrap().marking(), &m(&[Some(1), Some(0)]));
        assert_eq!(tree.node(repeat).unwrap().parent(), Some((1, 1)));
        assert!(tree.is_bounded());
    }

    #[test]
    fn omega_is_never_lost() {
        // t1 pumps p1, t2 moves a token from p1 to p2
        let net = PetriNet::new(
            ["p1", "p2"],
            [
                ("t1", vec!["p1"], vec!["p1", "p1"]),
                ("t2", vec!["p1"], vec!["p2"]),
            ],
        );
        let tree = explore(&net, &m(&[Some(1), Some(0)]));
        for (id, node) in tree.nodes() {
            if let Some((parent, _)) = node.parent() {
                let before = tree.node(parent).unwrap().marking();
                for (old, new) in before.iter().zip(node.marking().iter()) {
                    assert!(!old.is_omega() || new.is_omega(), "n{id} lost ω");
                }
            }
        }
        assert_eq!(tree.unbounded_places(), vec!["p1", "p2"]);
        assert!(tree.contains(&m(&[None, None])));
    }

    #[test]
    fn only_the_first_covered_ancestor_accelerates() {
        // tA moves a token from y to x, tC doubles x and tD produces a token on y
        let net = PetriNet::new(
            ["x", "y"],
            [
                ("tA", vec!["y"], vec!["x"]),
                ("tC", vec!["x"], vec!["x", "x"]),
                ("tD", vec![], vec!["y"]),
            ],
        );
        let tree = explore(&net, &m(&[Some(0), Some(1)]));

        // on the path (0,1) -tA-> (1,0) -tC-> (2,0) -tD-> (2,1) the successor strictly
        // covers both (0,1) and (1,0), only the root is used and y stays finite
        let (pumped, _) = tree
            .nodes()
            .find(|(_, n)| n.marking() == &m(&[Some(2), Some(0)]))
            .unwrap();
        let produced: Vec<&Marking> = tree
            .children(pumped)
            .iter()
            .map(|c| tree.node(*c).unwrap())
            .filter(|n| n.parent() == Some((pumped, 2)))
            .map(|n| n.marking())
            .collect();
        assert_eq!(produced, vec![&m(&[None, Some(1)])]);
        assert_eq!(tree.unbounded_places(), vec!["x", "y"]);
    }

    #[test_log::test]
    fn weighted_input_arc_needs_enough_tokens() {
        let net = PetriNet::new(["p1", "p2"], [("t1", vec!["p1", "p1"], vec!["p2"])]);

        let starved = explore(&net, &m(&[Some(1), Some(0)]));
        assert_eq!(starved.size(), 1);
        assert!(starved.children(starved.root()).is_empty());

        let fed = explore(&net, &m(&[Some(3), Some(0)]));
        let markings: Vec<&Marking> = fed
            .depth_first()
            .into_iter()
            .map(|(_, id)| fed.node(id).unwrap().marking())
            .collect();
        assert_eq!(markings, vec![&m(&[Some(3), Some(0)]), &m(&[Some(1), Some(1)])]);
    }

    #[test]
    fn short_initial_marking_is_padded() {
        let net = PetriNet::new(["p1", "p2"], [("t1", vec!["p1"], vec!["p2"])]);
        let tree = explore(&net, &m(&[Some(1)]));
        assert_eq!(tree.node(tree.root()).unwrap().marking(), &m(&[Some(1), Some(0)]));
        assert_eq!(tree.size(), 2);
        assert!(tree.contains(&m(&[Some(0), Some(1)])));
    }

    #[test]
    fn textual_representation() {
        let net = build(&producer_consumer_graph());
        let initial: InitialMarking = "p1=1".parse().unwrap();
        let tree = net.coverability_tree(&initial.for_net(&net));
        let text = tree.show();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "n0 p1=1, p2=0, p3=0");
        assert!(lines[1].starts_with("  --t1--> n1 p1=0, p2=2, p3=0"));
        assert_eq!(lines.len(), tree.size());
    }
}
