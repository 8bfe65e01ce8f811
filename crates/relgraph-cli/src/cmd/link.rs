//! `relgraph link`, `relgraph replace` and `relgraph unlink`.
//!
//! Types are given by code, API name (`parent-of`, `child-of`) or
//! description (`depends-on`, `blocks`). Whatever the direction typed on
//! the command line, the row is stored in canonical direction.

use std::io::Write;

use clap::Args;
use serde::Serialize;

use relgraph_core::model::SameTypeCheck;
use relgraph_core::{BugId, Link, Notify, RelationshipId, RelationshipStore, RelationshipType};

use crate::context::AppContext;
use crate::output::{fail, render};

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Bug the relationship is described from.
    pub source: BugId,

    /// Relationship type: code, name or description.
    pub kind: String,

    pub destination: BugId,
}

#[derive(Args, Debug)]
pub struct ReplaceArgs {
    /// Relationship to rewrite.
    pub id: RelationshipId,

    pub source: BugId,

    /// Relationship type: code, name or description.
    pub kind: String,

    pub destination: BugId,
}

#[derive(Args, Debug)]
pub struct UnlinkArgs {
    pub id: RelationshipId,

    /// Do not notify watchers.
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum LinkAction {
    Added,
    Replaced,
    Unchanged,
}

#[derive(Debug, Serialize)]
struct StoredLink {
    source: BugId,
    destination: BugId,
    kind: String,
}

#[derive(Debug, Serialize)]
struct LinkOutput {
    id: RelationshipId,
    action: LinkAction,
    source: BugId,
    destination: BugId,
    kind: String,
    stored: StoredLink,
}

#[derive(Debug, Serialize)]
struct UnlinkOutput {
    id: RelationshipId,
    source: BugId,
    destination: BugId,
    kind: String,
    notified: bool,
}

fn parse_kind(ctx: &AppContext, raw: &str) -> anyhow::Result<RelationshipType> {
    ctx.registry.parse(raw).map_err(|err| fail(ctx.output, &err))
}

fn link_output(
    ctx: &AppContext,
    store: &RelationshipStore<'_>,
    id: RelationshipId,
    action: LinkAction,
    requested: Link,
) -> anyhow::Result<LinkOutput> {
    let stored = store.get(id).map_err(|err| fail(ctx.output, &err))?;
    let name = |kind| {
        ctx.registry
            .display_name(kind)
            .map(str::to_string)
            .map_err(|err| fail(ctx.output, &err))
    };
    Ok(LinkOutput {
        id,
        action,
        source: requested.source,
        destination: requested.destination,
        kind: name(requested.kind)?,
        stored: StoredLink {
            source: stored.source,
            destination: stored.destination,
            kind: name(stored.kind)?,
        },
    })
}

fn write_link(o: &LinkOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let verb = match o.action {
        LinkAction::Added => "added",
        LinkAction::Replaced => "replaced",
        LinkAction::Unchanged => "kept",
    };
    writeln!(
        w,
        "{verb} relationship {}: {} {} {} (stored as {} {} {})",
        o.id,
        o.source,
        o.kind,
        o.destination,
        o.stored.source,
        o.stored.kind,
        o.stored.destination
    )
}

/// Create the relationship, or retype the one already connecting the bugs.
pub fn run_link(args: &LinkArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let kind = parse_kind(ctx, &args.kind)?;
    let store = ctx.store();
    ctx.require_bug(&store, args.source)?;
    ctx.require_bug(&store, args.destination)?;
    ctx.check_can_link(&store, args.source, args.destination)?;

    let action = match store
        .same_type_exists(args.source, args.destination, kind)
        .map_err(|err| fail(ctx.output, &err))?
    {
        SameTypeCheck::NoRelationship => LinkAction::Added,
        SameTypeCheck::DifferentType(_) => LinkAction::Replaced,
        SameTypeCheck::SameType(_) => LinkAction::Unchanged,
    };
    let id = store
        .upsert(args.source, args.destination, kind, Notify::Both)
        .map_err(|err| fail(ctx.output, &err))?;

    let out = link_output(
        ctx,
        &store,
        id,
        action,
        Link::new(args.source, args.destination, kind),
    )?;
    render(ctx.output, &out, write_link)
}

/// Rewrite an existing relationship in place.
pub fn run_replace(args: &ReplaceArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let kind = parse_kind(ctx, &args.kind)?;
    let store = ctx.store();
    store.get(args.id).map_err(|err| fail(ctx.output, &err))?;
    ctx.require_bug(&store, args.source)?;
    ctx.require_bug(&store, args.destination)?;
    ctx.check_can_link(&store, args.source, args.destination)?;

    store
        .update(args.id, args.source, args.destination, kind, Notify::Both)
        .map_err(|err| fail(ctx.output, &err))?;

    let out = link_output(
        ctx,
        &store,
        args.id,
        LinkAction::Replaced,
        Link::new(args.source, args.destination, kind),
    )?;
    render(ctx.output, &out, write_link)
}

pub fn run_unlink(args: &UnlinkArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let store = ctx.store();
    let row = store.get(args.id).map_err(|err| fail(ctx.output, &err))?;
    ctx.check_can_link(&store, row.source, row.destination)?;

    store
        .delete(args.id, !args.quiet)
        .map_err(|err| fail(ctx.output, &err))?;

    let out = UnlinkOutput {
        id: args.id,
        source: row.source,
        destination: row.destination,
        kind: ctx
            .registry
            .display_name(row.kind)
            .map_or_else(|_| row.kind.to_string(), str::to_string),
        notified: !args.quiet,
    };
    render(ctx.output, &out, |o, w| {
        writeln!(
            w,
            "removed relationship {}: {} {} {}",
            o.id, o.source, o.kind, o.destination
        )
    })
}
