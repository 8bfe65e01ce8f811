//! `relgraph types`: list the registered relationship types.


use clap::Args;
use serde::Serialize;

use relgraph_core::RelationshipType;
use relgraph_core::registry::EdgeStyle;

use crate::context::AppContext;
use crate::output::{pretty_section, render};

#[derive(Args, Debug)]
pub struct TypesArgs {}

#[derive(Debug, Serialize)]
struct TypeRow {
    code: RelationshipType,
    name: String,
    description: String,
    complementary: RelationshipType,
    forward: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    edge_style: Option<EdgeStyle>,
}

pub fn run_types(_args: &TypesArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let mut rows: Vec<TypeRow> = ctx
        .registry
        .iter()
        .map(|(kind, info)| TypeRow {
            code: kind,
            name: info.name.clone(),
            description: info.description.clone(),
            complementary: info.complementary,
            forward: info.forward,
            edge_style: info.edge_style.clone(),
        })
        .collect();
    rows.sort_by_key(|row| i32::from(row.code));

    let pretty = ctx.output.is_pretty();
    render(ctx.output, &rows, |rows, w| {
        if pretty {
            pretty_section(w, "Relationship types")?;
        }
        for row in rows {
            writeln!(
                w,
                "{:>4}  {:<16}{:<16}{:>4}  {}",
                i32::from(row.code),
                row.name,
                row.description,
                i32::from(row.complementary),
                if row.forward { "forward" } else { "reverse" }
            )?;
        }
        Ok(())
    })
}
