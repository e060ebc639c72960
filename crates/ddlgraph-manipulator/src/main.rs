//! CLI entry point for ddlgraph-manipulate.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use ddlgraph_manipulator::{follow, history, run, Edit, RunOptions};

#[derive(Parser)]
#[command(name = "ddlgraph-manipulate")]
#[command(about = "Move and rename structures in a ddlgraph schema graph")]
struct Cli {
    /// Schema graph to edit (Turtle or N-Triples).
    #[arg(short, long)]
    graph: Option<PathBuf>,

    /// Base URI relative IRIs resolve against.
    #[arg(long)]
    base_uri: Option<String>,

    /// Move a structure, e.g. main/Users=archive/Users. Repeatable.
    #[arg(long = "move", value_name = "FROM=TO")]
    moves: Vec<String>,

    /// Rename a structure, e.g. main/Users=Customers. Repeatable.
    #[arg(long = "rename", value_name = "PATH=NAME")]
    renames: Vec<String>,

    /// Why these edits are made; stored in the change log.
    #[arg(short, long, default_value = "")]
    intent: String,

    /// Where to write the edited graph (default: overwrite --graph).
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Validate the edited graph against SHACL shapes before writing.
    #[arg(long)]
    validate: bool,

    /// Print the recorded change logs of the graph and exit.
    #[arg(long)]
    history: bool,

    /// Print the IRI a previously held IRI has now, and exit.
    #[arg(long, value_name = "IRI")]
    follow: Option<String>,

    /// Config file prefix (default: ddlgraph).
    #[arg(short, long, default_value = "ddlgraph")]
    config: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ddlgraph_core::config::load(&cli.config)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.json_logs {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }

    let changelog_dir = PathBuf::from(&config.changelog_dir);
    let base_uri = cli.base_uri.clone().unwrap_or_else(|| config.base_uri.clone());
    if let Some(uri) = &cli.follow {
        println!("{}", follow(&changelog_dir, &base_uri, uri)?);
        return Ok(());
    }
    if cli.history {
        for log in history(&changelog_dir, &base_uri)? {
            println!("{} {} {}", log.started_at.to_rfc3339(), log.id, log.intent);
            for change in &log.changes {
                println!("  {change}");
            }
        }
        return Ok(());
    }

    let graph_path = cli
        .graph
        .clone()
        .or_else(|| config.graph_path.as_ref().map(PathBuf::from))
        .ok_or_else(|| anyhow::anyhow!("--graph is required (or set ddlgraph.graph_path)"))?;

    let mut options = RunOptions::from_config(&config, graph_path);
    options.base_uri = base_uri;
    if cli.out.is_some() {
        options.output_path = cli.out;
    }
    options.validate |= cli.validate;
    options.edits = parse_edits(&cli.moves, &cli.renames)?;
    options.intent = if cli.intent.is_empty() {
        options
            .edits
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    } else {
        cli.intent
    };

    if options.edits.is_empty() {
        anyhow::bail!("Specify at least one --move or --rename");
    }

    let log = run(&options)?;
    for change in &log.changes {
        println!("{change}");
    }

    Ok(())
}

fn parse_edits(moves: &[String], renames: &[String]) -> anyhow::Result<Vec<Edit>> {
    let mut edits = Vec::with_capacity(moves.len() + renames.len());
    for raw in moves {
        edits.push(Edit::parse_move(raw)?);
    }
    for raw in renames {
        edits.push(Edit::parse_rename(raw)?);
    }
    Ok(edits)
}
