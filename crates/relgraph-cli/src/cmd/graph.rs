//! `relgraph graph`: Graphviz or JSON export of the bugs around one bug.
//!
//! Text and pretty modes print DOT source, ready for `dot -Tsvg`.


use clap::Args;
use serde::Serialize;

use relgraph_core::graph::{GraphEdge, GraphKind, RelationshipGraph};
use relgraph_core::BugId;

use crate::context::AppContext;
use crate::output::{fail, render};

#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Bug at the center of the graph.
    pub bug: BugId,

    /// Follow only parent/child links.
    #[arg(long)]
    pub dependency: bool,

    /// Hops to follow from the bug (defaults to `[graph] max_depth`).
    #[arg(long)]
    pub depth: Option<usize>,
}

#[derive(Debug, Serialize)]
struct GraphOutput {
    root: BugId,
    kind: GraphKind,
    depth: usize,
    nodes: Vec<BugId>,
    edges: Vec<GraphEdge>,
    #[serde(skip)]
    dot: String,
}

pub fn run_graph(args: &GraphArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let store = ctx.store();
    ctx.require_bug(&store, args.bug)?;

    let kind = if args.dependency {
        GraphKind::Dependency
    } else {
        GraphKind::Relation
    };
    let depth = args.depth.unwrap_or(ctx.config.graph.max_depth);
    let graph = RelationshipGraph::build(&store, args.bug, kind, depth)
        .map_err(|err| fail(ctx.output, &err))?;
    let dot = graph
        .to_dot(&ctx.registry)
        .map_err(|err| fail(ctx.output, &err))?;

    let out = GraphOutput {
        root: graph.root(),
        kind: graph.kind(),
        depth,
        nodes: graph.nodes().collect(),
        edges: graph.edges().collect(),
        dot,
    };
    render(ctx.output, &out, |o, w| write!(w, "{}", o.dot))
}
