//! `relgraph history`: relationship changes recorded against a bug.


use chrono::{DateTime, Utc};
use clap::Args;

use relgraph_core::BugId;
use relgraph_core::db::{HistoryEntry, SqliteHistory};

use crate::context::AppContext;
use crate::output::{fail, pretty_section, render};

#[derive(Args, Debug)]
pub struct HistoryArgs {
    pub bug: BugId,
}

fn format_timestamp(micros: i64) -> String {
    DateTime::<Utc>::from_timestamp_micros(micros).map_or_else(
        || micros.to_string(),
        |at| at.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

pub fn run_history(args: &HistoryArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let entries: Vec<HistoryEntry> = SqliteHistory::new(&ctx.conn)
        .entries_for(args.bug)
        .map_err(|err| fail(ctx.output, &err))?;

    let pretty = ctx.output.is_pretty();
    let registry = &ctx.registry;
    render(ctx.output, &entries, |entries, w| {
        if pretty {
            pretty_section(w, &format!("History of {}", args.bug.padded()))?;
        }
        if entries.is_empty() {
            return writeln!(w, "no relationship history");
        }
        for entry in entries {
            let kind = registry
                .display_name(entry.kind)
                .map_or_else(|_| entry.kind.to_string(), str::to_string);
            writeln!(
                w,
                "{}  {:<22}{:<12}{}",
                format_timestamp(entry.created_at_us),
                entry.event.as_str(),
                kind,
                entry.other.padded()
            )?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00");
        assert_eq!(format_timestamp(1_700_000_000_000_000), "2023-11-14 22:13:20");
    }
}
