//! Pyflow CLI entry point

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "pyflow")]
#[command(about = "Dependency graphs of Python projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the code graph of a project into `<output>/code`
    Extract {
        /// Project root
        project: PathBuf,

        /// Output workspace
        #[arg(short, long, default_value = "pyflow-out")]
        output: PathBuf,
    },
    /// Merge `code/` and `additional/` of a workspace into `union/`
    Union {
        workspace: PathBuf,
    },
    /// Compare two graph directories
    Diff {
        old: PathBuf,
        new: PathBuf,
        out: PathBuf,
    },
    /// Collapse architecture elements over their members
    Contract {
        graph: PathBuf,
        out: PathBuf,

        /// Architecture element ids, in contraction order
        #[arg(short = 'e', long = "element", required = true)]
        elements: Vec<String>,

        /// Gather everything left over into a catch-all element
        #[arg(long)]
        combine_remaining: bool,
    },
    /// Everything the given nodes reach
    Used(QueryArgs),
    /// Everything that reaches the given nodes
    Dependents(QueryArgs),
    /// Keep nodes and edges by kind and id pattern
    Filter {
        graph: PathBuf,
        out: PathBuf,

        /// Node kinds to keep (directory, file, class, func, body, arc_elem, use_case)
        #[arg(long, value_delimiter = ',')]
        node_types: Vec<String>,

        /// Edge kinds to keep (contain, use, coupling)
        #[arg(long, value_delimiter = ',')]
        edge_types: Vec<String>,

        /// Node id pattern; `*` matches anything
        #[arg(long)]
        pattern: Option<String>,

        /// Drop what matches instead of keeping it
        #[arg(long)]
        invert: bool,

        /// Project onto files first: one use edge per pair of linked files
        #[arg(long)]
        file_links: bool,
    },
    /// Recompute the hashes of a graph directory in place
    Rehash {
        graph: PathBuf,
    },
}

#[derive(Args)]
struct QueryArgs {
    graph: PathBuf,
    out: PathBuf,

    /// Start node ids
    #[arg(short = 'e', long = "element", required = true)]
    elements: Vec<String>,

    /// Maximum number of hops; 0 is unlimited
    #[arg(long, default_value_t = 0)]
    depth: usize,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("pyflow={}", log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::debug!("Pyflow v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Extract { project, output } => commands::extract(&project, &output),
        Commands::Union { workspace } => commands::union(&workspace),
        Commands::Diff { old, new, out } => commands::diff(&old, &new, &out),
        Commands::Contract { graph, out, elements, combine_remaining } => {
            commands::contract(&graph, &out, &elements, combine_remaining)
        }
        Commands::Used(args) => {
            commands::query(&args.graph, &args.out, &args.elements, args.depth, commands::Walk::Used)
        }
        Commands::Dependents(args) => commands::query(
            &args.graph,
            &args.out,
            &args.elements,
            args.depth,
            commands::Walk::Dependents,
        ),
        Commands::Filter { graph, out, node_types, edge_types, pattern, invert, file_links } => {
            let spec = pyflow_core::FilterSpec::from_tokens(
                &node_types,
                &edge_types,
                pattern.as_deref(),
                invert,
            );
            commands::filter(&graph, &out, &spec, file_links)
        }
        Commands::Rehash { graph } => commands::rehash(&graph),
    }
}
