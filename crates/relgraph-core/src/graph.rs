//! Relationship graph around one bug, with Graphviz export.
//!
//! # Edge direction
//!
//! Edges follow canonical storage direction: `A -> B` with `DependsOn`
//! means A depends on B. The registry's edge styles flip the arrowhead
//! (`dir=back`) so the rendered arrow points from child to parent.
//!
//! # Traversal
//!
//! Breadth-first from the root, following relationships in both
//! directions, for at most `max_depth` hops. [`GraphKind::Dependency`]
//! only follows parent/child links.

#![allow(clippy::module_name_repetitions)]

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;

use petgraph::graphmap::DiGraphMap;
use serde::Serialize;

use crate::error::Result;
use crate::model::{BugId, BugRecord};
use crate::registry::{RelationshipType, TypeRegistry};
use crate::store::RelationshipStore;
use crate::summary::truncate;

/// Hops followed when no depth is configured.
pub const DEFAULT_MAX_DEPTH: usize = 2;

const LABEL_WIDTH: usize = 30;

/// Which relationships a graph follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphKind {
    /// Every relationship type.
    #[default]
    Relation,
    /// Only parent/child links.
    Dependency,
}

impl GraphKind {
    const fn follows(self, kind: RelationshipType) -> bool {
        match self {
            Self::Relation => true,
            Self::Dependency => {
                matches!(kind, RelationshipType::DependsOn | RelationshipType::Blocks)
            }
        }
    }
}

/// Edge as exported to JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub source: BugId,
    pub destination: BugId,
    pub kind: RelationshipType,
}

/// Bugs reachable from a root through relationships.
#[derive(Debug, Clone)]
pub struct RelationshipGraph {
    root: BugId,
    kind: GraphKind,
    graph: DiGraphMap<BugId, RelationshipType>,
    records: HashMap<BugId, BugRecord>,
    resolved_status: u16,
}

impl RelationshipGraph {
    /// Walk relationships breadth-first from `root`.
    ///
    /// # Errors
    ///
    /// Collaborator failures.
    pub fn build(
        store: &RelationshipStore<'_>,
        root: BugId,
        kind: GraphKind,
        max_depth: usize,
    ) -> Result<Self> {
        let mut graph = DiGraphMap::new();
        graph.add_node(root);

        let mut depth_of: HashMap<BugId, usize> = HashMap::from([(root, 0)]);
        let mut queue = VecDeque::from([root]);

        while let Some(bug) = queue.pop_front() {
            let depth = depth_of.get(&bug).copied().unwrap_or_default();
            if depth >= max_depth {
                continue;
            }

            for rel in store.all(bug)?.relationships {
                if !kind.follows(rel.kind) {
                    continue;
                }
                let Some(other) = rel.other_end(bug) else {
                    continue;
                };
                graph.add_edge(rel.source, rel.destination, rel.kind);
                if let Entry::Vacant(slot) = depth_of.entry(other) {
                    slot.insert(depth + 1);
                    queue.push_back(other);
                }
            }
        }

        let nodes: Vec<BugId> = graph.nodes().collect();
        let records = store.bugs().load_many(&nodes)?;
        tracing::debug!(
            %root,
            ?kind,
            max_depth,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built relationship graph"
        );

        Ok(Self {
            root,
            kind,
            graph,
            records,
            resolved_status: store.policy().resolved_status,
        })
    }

    #[must_use]
    pub const fn root(&self) -> BugId {
        self.root
    }

    #[must_use]
    pub const fn kind(&self) -> GraphKind {
        self.kind
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn contains(&self, bug: BugId) -> bool {
        self.graph.contains_node(bug)
    }

    /// Bugs in discovery order.
    pub fn nodes(&self) -> impl Iterator<Item = BugId> + '_ {
        self.graph.nodes()
    }

    /// Edges in canonical direction.
    pub fn edges(&self) -> impl Iterator<Item = GraphEdge> + '_ {
        self.graph
            .all_edges()
            .map(|(source, destination, kind)| GraphEdge {
                source,
                destination,
                kind: *kind,
            })
    }

    /// Render as a Graphviz `digraph`.
    ///
    /// # Errors
    ///
    /// `UnknownType` when an edge carries a type missing from `registry`.
    pub fn to_dot(&self, registry: &TypeRegistry) -> Result<String> {
        let mut out = String::new();
        let name = match self.kind {
            GraphKind::Relation => "relation",
            GraphKind::Dependency => "dependency",
        };
        let rankdir = match self.kind {
            GraphKind::Relation => "LR",
            GraphKind::Dependency => "TB",
        };

        writeln!(out, "digraph {name}_{} {{", self.root.padded()).ok();
        writeln!(out, "  graph [rankdir={rankdir}];").ok();
        writeln!(out, "  node [shape=box, fontsize=10];").ok();

        for bug in self.graph.nodes() {
            let mut attrs = vec![format!("label=\"{}\"", self.node_label(bug))];
            if bug == self.root {
                attrs.push("style=filled".to_string());
                attrs.push("fillcolor=\"#E0E0FF\"".to_string());
            } else if self
                .records
                .get(&bug)
                .is_some_and(|record| record.status >= self.resolved_status)
            {
                attrs.push("fontcolor=\"#808080\"".to_string());
            }
            writeln!(out, "  \"{bug}\" [{}];", attrs.join(", ")).ok();
        }

        for (source, destination, kind) in self.graph.all_edges() {
            let info = registry.info(*kind)?;
            let attrs = info
                .edge_style
                .as_ref()
                .map(|style| style.to_dot_attrs())
                .filter(|attrs| !attrs.is_empty())
                .unwrap_or_else(|| format!("label=\"{}\"", escape(&info.description)));
            writeln!(out, "  \"{source}\" -> \"{destination}\" [{attrs}];").ok();
        }

        out.push_str("}\n");
        Ok(out)
    }

    fn node_label(&self, bug: BugId) -> String {
        match self.records.get(&bug) {
            Some(record) => format!(
                "{}\\n{}",
                bug.padded(),
                escape(&truncate(&record.summary, LABEL_WIDTH))
            ),
            None => format!("{}\\n(deleted)", bug.padded()),
        }
    }
}

/// Quote-safe text for a DOT string literal.
fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
