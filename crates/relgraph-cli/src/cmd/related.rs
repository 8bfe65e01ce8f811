//! `relgraph related` and `relgraph can-resolve`.


use clap::Args;
use serde::Serialize;

use relgraph_core::summary::summarize;
use relgraph_core::{BugId, RelationshipType};

use crate::context::AppContext;
use crate::output::{fail, pretty_section, render};

#[derive(Args, Debug)]
pub struct RelatedArgs {
    pub bug: BugId,
}

#[derive(Args, Debug)]
pub struct CanResolveArgs {
    pub bug: BugId,
}

#[derive(Debug, Serialize)]
struct CanResolveOutput {
    bug: BugId,
    can_resolve: bool,
    /// Bugs this one depends on that are still open.
    blocking: Vec<BugId>,
}

pub fn run_related(args: &RelatedArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let store = ctx.store();
    ctx.require_bug(&store, args.bug)?;
    let options = ctx.summary_options();
    let summary = summarize(&store, &ctx.access(), &options, args.bug)
        .map_err(|err| fail(ctx.output, &err))?;

    let pretty = ctx.output.is_pretty();
    render(ctx.output, &summary, |s, w| {
        if pretty {
            pretty_section(w, &format!("Relationships of {}", s.bug.padded()))?;
        }
        if s.lines.is_empty() {
            return writeln!(w, "no relationships");
        }
        write!(w, "{}", s.to_text(options.width))
    })
}

pub fn run_can_resolve(args: &CanResolveArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let store = ctx.store();
    ctx.require_bug(&store, args.bug)?;
    let can_resolve = store
        .can_resolve(args.bug)
        .map_err(|err| fail(ctx.output, &err))?;

    let mut blocking = Vec::new();
    if !can_resolve {
        let children: Vec<BugId> = store
            .all_from_source(args.bug)
            .map_err(|err| fail(ctx.output, &err))?
            .into_iter()
            .filter(|rel| rel.kind == RelationshipType::DependsOn)
            .map(|rel| rel.destination)
            .collect();
        let records = store
            .bugs()
            .load_many(&children)
            .map_err(|err| fail(ctx.output, &err))?;
        let resolved = store.policy().resolved_status;
        blocking = children
            .into_iter()
            .filter(|child| {
                records
                    .get(child)
                    .is_some_and(|record| record.status < resolved)
            })
            .collect();
    }

    let out = CanResolveOutput {
        bug: args.bug,
        can_resolve,
        blocking,
    };
    render(ctx.output, &out, |o, w| {
        if o.can_resolve {
            return writeln!(w, "bug {} can be resolved", o.bug);
        }
        writeln!(w, "bug {} depends on unresolved bugs:", o.bug)?;
        for bug in &o.blocking {
            writeln!(w, "  {}", bug.padded())?;
        }
        Ok(())
    })
}
