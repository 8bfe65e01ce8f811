//! `relgraph copy`: give a bug the same relationships as another one.


use clap::Args;
use serde::Serialize;

use relgraph_core::{BugId, RelationshipId};

use crate::context::AppContext;
use crate::output::{fail, render};

#[derive(Args, Debug)]
pub struct CopyArgs {
    /// Bug whose relationships are copied.
    pub from: BugId,

    /// Bug receiving the copies.
    pub to: BugId,
}

#[derive(Debug, Serialize)]
struct CopyOutput {
    from: BugId,
    to: BugId,
    created: Vec<RelationshipId>,
}

pub fn run_copy(args: &CopyArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let store = ctx.store();
    ctx.require_bug(&store, args.from)?;
    ctx.require_bug(&store, args.to)?;
    ctx.check_can_link(&store, args.to, args.from)?;

    let created = store
        .copy_all(args.from, args.to)
        .map_err(|err| fail(ctx.output, &err))?;

    let out = CopyOutput {
        from: args.from,
        to: args.to,
        created,
    };
    render(ctx.output, &out, |o, w| {
        writeln!(
            w,
            "copied {} relationship(s) from {} to {}",
            o.created.len(),
            o.from,
            o.to
        )
    })
}
