//! `relgraph bug`: minimal bug records for a standalone database.
//!
//! Subcommands:
//! - `relgraph bug new <summary>`: create a bug
//! - `relgraph bug status <bug> <status>`: change status; resolving a bug
//!   that still depends on unresolved bugs needs `--force`
//! - `relgraph bug rm <bug>`: delete the bug and every relationship it has
//! - `relgraph bug show <bug>`: the bug with its relationship summary


use clap::{Args, Subcommand};
use serde::Serialize;

use relgraph_core::db::{NewBug, SqliteBugs};
use relgraph_core::error::ErrorCode;
use relgraph_core::model::status;
use relgraph_core::services::BugService;
use relgraph_core::summary::{RelationshipSummary, summarize};
use relgraph_core::{BugId, BugRecord, ProjectId};

use crate::context::AppContext;
use crate::output::{CliError, fail, fail_with, pretty_kv, pretty_section, render};

#[derive(Args, Debug)]
pub struct BugArgs {
    #[command(subcommand)]
    pub command: BugCommand,
}

#[derive(Subcommand, Debug)]
pub enum BugCommand {
    #[command(
        about = "Create a bug",
        after_help = "EXAMPLES:\n    relgraph bug new \"Login fails\" --project 2"
    )]
    New(BugNewArgs),

    #[command(
        about = "Change a bug's status",
        after_help = "EXAMPLES:\n    relgraph bug status 10 resolved\n\n    # Resolve even though children are open\n    relgraph bug status 10 resolved --force"
    )]
    Status(BugStatusArgs),

    #[command(about = "Delete a bug and all of its relationships")]
    Rm(BugRmArgs),

    #[command(about = "Show a bug and its relationships")]
    Show(BugShowArgs),
}

#[derive(Args, Debug)]
pub struct BugNewArgs {
    /// One-line summary.
    pub summary: String,

    /// Project the bug belongs to.
    #[arg(long, default_value_t = 1)]
    pub project: i64,

    /// Initial status, by name (`new`, `resolved`, ...) or number.
    #[arg(long, default_value = "new")]
    pub status: String,

    /// Assigned handler.
    #[arg(long)]
    pub handler: Option<String>,
}

#[derive(Args, Debug)]
pub struct BugStatusArgs {
    pub bug: BugId,

    /// New status, by name or number.
    pub status: String,

    /// Resolve even while depended-on bugs are unresolved.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct BugRmArgs {
    pub bug: BugId,
}

#[derive(Args, Debug)]
pub struct BugShowArgs {
    pub bug: BugId,
}

#[derive(Debug, Serialize)]
struct BugStatusOutput {
    bug: BugId,
    previous: u16,
    status: u16,
    forced: bool,
}

#[derive(Debug, Serialize)]
struct BugRmOutput {
    bug: BugId,
    relationships_removed: usize,
}

#[derive(Debug, Serialize)]
struct BugShowOutput {
    #[serde(flatten)]
    record: BugRecord,
    can_resolve: bool,
    relationships: RelationshipSummary,
}

pub fn run_bug(args: &BugArgs, ctx: &AppContext) -> anyhow::Result<()> {
    match &args.command {
        BugCommand::New(a) => run_new(a, ctx),
        BugCommand::Status(a) => run_status(a, ctx),
        BugCommand::Rm(a) => run_rm(a, ctx),
        BugCommand::Show(a) => run_show(a, ctx),
    }
}

fn parse_status(ctx: &AppContext, raw: &str) -> anyhow::Result<u16> {
    status::parse(raw).ok_or_else(|| {
        fail_with(
            ctx.output,
            CliError::new(format!(
                "unknown status '{raw}'; use a number or one of new, feedback, acknowledged, confirmed, assigned, resolved, closed"
            )),
        )
    })
}

fn run_new(args: &BugNewArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let value = parse_status(ctx, &args.status)?;
    let mut bug = NewBug::new(ProjectId(args.project), args.summary.clone()).with_status(value);
    if let Some(handler) = &args.handler {
        bug = bug.with_handler(handler.clone());
    }

    let bugs = SqliteBugs::new(&ctx.conn);
    let id = bugs.create(&bug).map_err(|err| fail(ctx.output, &err))?;
    let record = bugs
        .load(id)
        .map_err(|err| fail(ctx.output, &err))?
        .ok_or_else(|| anyhow::anyhow!("bug {id} vanished after insert"))?;

    render(ctx.output, &record, |r, w| writeln!(w, "created bug {}", r.id))
}

fn run_status(args: &BugStatusArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let store = ctx.store();
    let record = ctx.require_bug(&store, args.bug)?;
    let value = parse_status(ctx, &args.status)?;

    let threshold = ctx.config.status.resolved_threshold;
    let resolving = value >= threshold && record.status < threshold;
    let blocked = resolving
        && !args.force
        && !store
            .can_resolve(args.bug)
            .map_err(|err| fail(ctx.output, &err))?;
    if blocked {
        let code = ErrorCode::UnresolvedChildren;
        return Err(fail_with(
            ctx.output,
            CliError::with_details(
                format!("bug {} depends on unresolved bugs", args.bug),
                code.hint().unwrap_or_default(),
                code.code(),
            ),
        ));
    }

    SqliteBugs::new(&ctx.conn)
        .set_status(args.bug, value)
        .map_err(|err| fail(ctx.output, &err))?;
    tracing::info!(bug = %args.bug, from = record.status, to = value, forced = args.force, "status changed");

    let out = BugStatusOutput {
        bug: args.bug,
        previous: record.status,
        status: value,
        forced: args.force && resolving,
    };
    render(ctx.output, &out, |o, w| {
        writeln!(
            w,
            "bug {}: {} -> {}",
            o.bug,
            status::label(o.previous),
            status::label(o.status)
        )
    })
}

fn run_rm(args: &BugRmArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let store = ctx.store();
    ctx.require_bug(&store, args.bug)?;

    let removed = store
        .delete_all(args.bug)
        .map_err(|err| fail(ctx.output, &err))?;
    SqliteBugs::new(&ctx.conn)
        .remove(args.bug)
        .map_err(|err| fail(ctx.output, &err))?;

    let out = BugRmOutput {
        bug: args.bug,
        relationships_removed: removed,
    };
    render(ctx.output, &out, |o, w| {
        writeln!(
            w,
            "deleted bug {} and {} relationship(s)",
            o.bug, o.relationships_removed
        )
    })
}

fn run_show(args: &BugShowArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let store = ctx.store();
    let record = ctx.require_bug(&store, args.bug)?;
    let options = ctx.summary_options();
    let relationships = summarize(&store, &ctx.access(), &options, args.bug)
        .map_err(|err| fail(ctx.output, &err))?;

    let out = BugShowOutput {
        record,
        can_resolve: !relationships.unresolved_blockers,
        relationships,
    };
    let width = options.width;
    let pretty = ctx.output.is_pretty();
    render(ctx.output, &out, |o, w| {
        if pretty {
            pretty_section(w, &format!("Bug {} {}", o.record.id.padded(), o.record.summary))?;
        } else {
            writeln!(w, "{}  {}", o.record.id, o.record.summary)?;
        }
        pretty_kv(w, "Project", o.record.project_id.to_string())?;
        pretty_kv(w, "Status", status::label(o.record.status))?;
        pretty_kv(w, "Handler", o.record.handler.as_deref().unwrap_or("-"))?;
        pretty_kv(w, "Resolvable", if o.can_resolve { "yes" } else { "no" })?;
        if !o.relationships.lines.is_empty() {
            writeln!(w)?;
            write!(w, "{}", o.relationships.to_text(width))?;
        }
        Ok(())
    })
}
