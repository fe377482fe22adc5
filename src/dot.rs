use std::fmt::Display;

use itertools::Itertools;
#[cfg(feature = "graphviz")]
use thiserror::Error;

use crate::{
    dfa::{Dfa, StateId},
    petri::{CoverabilityTree, NodeId},
};

/// Errors that can occur when rendering through the `dot` executable of graphviz.
#[cfg(feature = "graphviz")]
#[derive(Error, Debug)]
pub enum RenderError {
    /// Spawning `dot`, talking to it or writing the temporary file failed.
    #[error("could not run dot: \"{0:?}\"")]
    Io(#[from] std::io::Error),
    /// `dot` ran but reported a failure.
    #[error("Child process had non-zero exit status \"{0}\"")]
    NonZeroExit(std::process::ExitStatus),
}

/// Implemented by everything that can be written as a graph in the DOT format, for more
/// information see the [graphviz documentation](https://graphviz.org/doc/info/lang.html).
pub trait Dottable {
    /// The type used to refer to nodes.
    type Index: Copy;

    /// Name of the digraph.
    fn dot_name(&self) -> Option<String>;

    /// Graph level statements emitted right after the opening line.
    fn dot_header_statements(&self) -> Vec<String> {
        vec![]
    }

    /// All nodes, in the order in which they should be emitted.
    fn dot_state_indices(&self) -> Vec<Self::Index>;

    /// The identifier of a node, it is quoted when written.
    fn dot_state_ident(&self, idx: Self::Index) -> String;

    /// Attributes of a node.
    fn dot_state_attributes(&self, _idx: Self::Index) -> Vec<DotStateAttribute> {
        vec![]
    }

    /// Outgoing edges of a node as target and edge attributes.
    fn dot_edges_from(&self, idx: Self::Index) -> Vec<(Self::Index, Vec<DotTransitionAttribute>)>;

    /// Compute the graphviz representation.
    fn dot_representation(&self) -> String {
        let header = std::iter::once(format!(
            "digraph {} {{",
            quote_dot_ident(&self.dot_name().unwrap_or("A".to_string()))
        ))
        .chain(self.dot_header_statements());

        let indices = self.dot_state_indices();

        let states = indices.iter().map(|&q| {
            format!(
                "{} [{}]",
                quote_dot_ident(&self.dot_state_ident(q)),
                self.dot_state_attributes(q)
                    .into_iter()
                    .map(|attr| attr.to_string())
                    .join(", ")
            )
        });

        let transitions = indices.iter().flat_map(|&q| {
            self.dot_edges_from(q)
                .into_iter()
                .map(move |(target, attributes)| {
                    format!(
                        "{} -> {} [{}]",
                        quote_dot_ident(&self.dot_state_ident(q)),
                        quote_dot_ident(&self.dot_state_ident(target)),
                        attributes.into_iter().map(|attr| attr.to_string()).join(", ")
                    )
                })
        });

        header
            .chain(states)
            .chain(transitions)
            .chain(std::iter::once("}".to_string()))
            .join("\n")
    }

    /// Renders the object visually (as PNG) and returns the bytes of the image. This method
    /// is only available on the `graphviz` crate feature and needs `dot` on the path.
    #[cfg(feature = "graphviz")]
    fn render_graphviz(&self) -> Result<Vec<u8>, RenderError> {
        use std::io::{Read, Write};

        use tracing::trace;
        let dot = self.dot_representation();
        trace!("writing dot representation\n{}", dot);

        let mut child = std::process::Command::new("dot")
            .arg("-Tpng")
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(dot.as_bytes())?;
        }

        let mut output = Vec::new();
        if let Some(mut stdout) = child.stdout.take() {
            stdout.read_to_end(&mut output)?;
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(RenderError::NonZeroExit(status));
        }

        Ok(output)
    }

    /// Renders the object to a PNG file called `filename`. The DOT text is handed to `dot`
    /// through a temporary file.
    #[cfg(feature = "graphviz")]
    fn render_to_file_name(&self, filename: &str) -> Result<(), RenderError> {
        use std::io::Write;
        use tracing::trace;

        trace!("Outputting dot and rendering to png");
        let dot = self.dot_representation();
        let mut tempfile = tempfile::NamedTempFile::new()?;
        tempfile.write_all(dot.as_bytes())?;

        let status = std::process::Command::new("dot")
            .arg("-Tpng")
            .arg("-o")
            .arg(filename)
            .arg(tempfile.path())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(RenderError::NonZeroExit(status))
        }
    }
}

impl Dottable for Dfa {
    type Index = StateId;

    fn dot_name(&self) -> Option<String> {
        Some("DFA".into())
    }

    fn dot_header_statements(&self) -> Vec<String> {
        vec!["rankdir=LR".into(), "ranksep=1.0".into(), "nodesep=0.6".into()]
    }

    fn dot_state_indices(&self) -> Vec<StateId> {
        self.state_indices().collect()
    }

    fn dot_state_ident(&self, idx: StateId) -> String {
        self.state_name(idx)
            .map(|name| name.to_string())
            .unwrap_or_else(|| format!("q{idx}"))
    }

    fn dot_state_attributes(&self, idx: StateId) -> Vec<DotStateAttribute> {
        let shape = if self.is_accepting(idx) {
            "doublecircle"
        } else {
            "circle"
        };
        let mut attributes = vec![
            DotStateAttribute::Shape(shape.into()),
            DotStateAttribute::Label(self.dot_state_ident(idx)),
        ];
        if idx == self.initial() {
            attributes.push(DotStateAttribute::Style("bold".into()));
        }
        attributes
    }

    fn dot_edges_from(&self, idx: StateId) -> Vec<(StateId, Vec<DotTransitionAttribute>)> {
        self.transitions_from(idx)
            .map(|(sym, target)| (target, vec![DotTransitionAttribute::Label(sym.to_string())]))
            .collect()
    }
}

impl Dottable for CoverabilityTree {
    type Index = NodeId;

    fn dot_name(&self) -> Option<String> {
        Some("CoverabilityTree".into())
    }

    fn dot_header_statements(&self) -> Vec<String> {
        vec!["rankdir=TB".into(), "nodesep=0.6".into(), "ranksep=0.8".into()]
    }

    fn dot_state_indices(&self) -> Vec<NodeId> {
        self.nodes().map(|(id, _)| id).collect()
    }

    fn dot_state_ident(&self, idx: NodeId) -> String {
        format!("n{idx}")
    }

    fn dot_state_attributes(&self, idx: NodeId) -> Vec<DotStateAttribute> {
        let shape = match self.node(idx) {
            Some(node) if node.is_repeat() => "box",
            _ => "ellipse",
        };
        vec![
            DotStateAttribute::Label(self.label(idx, "\\n")),
            DotStateAttribute::Shape(shape.into()),
        ]
    }

    fn dot_edges_from(&self, idx: NodeId) -> Vec<(NodeId, Vec<DotTransitionAttribute>)> {
        self.children(idx)
            .iter()
            .filter_map(|&child| {
                let (_, transition) = self.node(child)?.parent()?;
                let name = self.transition_name(transition)?;
                Some((child, vec![DotTransitionAttribute::Label(name.to_string())]))
            })
            .collect()
    }
}

/// Enum that abstracts attributes in the DOT format.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DotStateAttribute {
    /// The label of a node
    Label(String),
    /// The shape of a node
    Shape(String),
    /// The style of a node
    Style(String),
}

impl Display for DotStateAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DotStateAttribute::Label(s) => write!(f, "label=\"{}\"", escape_quotes(s)),
            DotStateAttribute::Shape(s) => write!(f, "shape=\"{}\"", s),
            DotStateAttribute::Style(s) => write!(f, "style=\"{}\"", s),
        }
    }
}

/// Attributes of an edge in the DOT format.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DotTransitionAttribute {
    /// The label of an edge
    Label(String),
}

impl Display for DotTransitionAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DotTransitionAttribute::Label(lbl) => write!(f, "label=\"{}\"", escape_quotes(lbl)),
        }
    }
}

// labels keep backslashes, `\n` is a line break for graphviz
fn escape_quotes(text: &str) -> String {
    text.replace('"', "\\\"")
}

fn quote_dot_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}
