#![forbid(unsafe_code)]

mod cmd;
mod context;
mod output;

use std::env;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use output::{OutputMode, resolve_output_mode};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::context::AppContext;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "relgraph: relationships between bugs",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// SQLite database (overrides RELGRAPH_DB and `[database] path`).
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Config file (defaults to ./relgraph.toml, then the user config dir).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format; wins over --json and RELGRAPH_FORMAT.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Bugs",
        about = "Create, update and inspect bugs",
        after_help = "EXAMPLES:\n    relgraph bug new \"Login fails\"\n    relgraph bug show 5"
    )]
    Bug(cmd::bug::BugArgs),

    #[command(
        next_help_heading = "Relationships",
        about = "Relate two bugs",
        long_about = "Relate two bugs. An existing relationship between them is retyped.",
        after_help = "EXAMPLES:\n    # 10 depends on 5 (stored once, read back from both bugs)\n    relgraph link 10 depends-on 5\n\n    # The same relationship phrased from the other side\n    relgraph link 5 blocks 10\n\n    # By numeric code\n    relgraph link 7 0 3 --json"
    )]
    Link(cmd::link::LinkArgs),

    #[command(
        next_help_heading = "Relationships",
        about = "Rewrite an existing relationship",
        after_help = "EXAMPLES:\n    relgraph replace 4 10 related-to 5"
    )]
    Replace(cmd::link::ReplaceArgs),

    #[command(
        next_help_heading = "Relationships",
        about = "Delete a relationship",
        after_help = "EXAMPLES:\n    relgraph unlink 4\n\n    # Without notifying watchers\n    relgraph unlink 4 --quiet"
    )]
    Unlink(cmd::link::UnlinkArgs),

    #[command(
        next_help_heading = "Relationships",
        about = "Copy every relationship of one bug to another",
        after_help = "EXAMPLES:\n    relgraph copy 10 11"
    )]
    Copy(cmd::copy::CopyArgs),

    #[command(
        next_help_heading = "Read",
        about = "List a bug's relationships from its own side",
        after_help = "EXAMPLES:\n    relgraph related 10\n    relgraph related 10 --json"
    )]
    Related(cmd::related::RelatedArgs),

    #[command(
        next_help_heading = "Read",
        about = "Check whether a bug's dependencies are resolved",
        after_help = "EXAMPLES:\n    relgraph can-resolve 10"
    )]
    CanResolve(cmd::related::CanResolveArgs),

    #[command(
        next_help_heading = "Read",
        about = "Export the relationship graph around a bug",
        long_about = "Export the relationship graph around a bug as Graphviz DOT, or nodes and edges with --json.",
        after_help = "EXAMPLES:\n    relgraph graph 10 | dot -Tsvg > bug-10.svg\n\n    # Parent/child links only, three hops out\n    relgraph graph 10 --dependency --depth 3"
    )]
    Graph(cmd::graph::GraphArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show relationship history of a bug",
        after_help = "EXAMPLES:\n    relgraph history 10"
    )]
    History(cmd::history::HistoryArgs),

    #[command(
        next_help_heading = "Read",
        about = "List relationship types",
        after_help = "EXAMPLES:\n    relgraph types --json"
    )]
    Types(cmd::types::TypesArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("RELGRAPH_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "relgraph=debug,relgraph_core=debug,info"
        } else {
            "relgraph=info,relgraph_core=info,warn"
        })
    });

    let format = env::var("RELGRAPH_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = cli.output_mode();
    let ctx = AppContext::open(cli.config.as_deref(), cli.db.as_deref(), output)?;
    debug!(?output, "dispatching command");

    match &cli.command {
        Commands::Bug(args) => cmd::bug::run_bug(args, &ctx),
        Commands::Link(args) => cmd::link::run_link(args, &ctx),
        Commands::Replace(args) => cmd::link::run_replace(args, &ctx),
        Commands::Unlink(args) => cmd::link::run_unlink(args, &ctx),
        Commands::Copy(args) => cmd::copy::run_copy(args, &ctx),
        Commands::Related(args) => cmd::related::run_related(args, &ctx),
        Commands::CanResolve(args) => cmd::related::run_can_resolve(args, &ctx),
        Commands::Graph(args) => cmd::graph::run_graph(args, &ctx),
        Commands::History(args) => cmd::history::run_history(args, &ctx),
        Commands::Types(args) => cmd::types::run_types(args, &ctx),
    }
}
