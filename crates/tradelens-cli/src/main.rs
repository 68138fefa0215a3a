//! TradeLens CLI: table relevance for trading analytics questions
//!
//! Commands: relevance, join-path, suggest, sql, schema, graph, completions

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use tradelens_core::catalog::Catalog;
use tradelens_core::config::Settings;
use tradelens_graph::GraphStore;
use tradelens_query::formatter::{format_records, format_relevance, format_results, ResultSet};
use tradelens_query::{OutputFormat, RelevanceEngine, SchemaDiagram};

#[derive(Parser)]
#[command(name = "tradelens")]
#[command(version)]
#[command(about = "Table relevance and SQL assembly for a trading star schema")]
struct Cli {
    /// Config file (defaults to $TRADELENS_CONFIG, then ./tradelens.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Graph store database, overriding the config file
    #[arg(long, global = true)]
    graph_db: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: FormatArg,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every table against a question
    #[command(alias = "r")]
    Relevance {
        /// The question, e.g. "top traders by pnl"
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Order tables for joining through the fact table
    JoinPath { tables: Vec<String> },
    /// Complete a partially typed question
    Suggest { partial: Vec<String> },
    /// Assemble SQL text for a question
    Sql {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Print the star schema as an ER diagram
    Schema {
        #[arg(long, value_enum, default_value = "mermaid")]
        diagram: DiagramArg,
    },
    /// Manage the graph store
    Graph {
        #[command(subcommand)]
        command: GraphCommands,
    },
    /// Generate shell completions
    Completions { shell: Shell },
}

#[derive(Subcommand)]
enum GraphCommands {
    /// Create a graph store and seed it with the trading schema
    Init { path: PathBuf },
    /// Per-table query telemetry
    Stats,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Table,
    Markdown,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Table => OutputFormat::Table,
            FormatArg::Markdown => OutputFormat::Markdown,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DiagramArg {
    Dot,
    Mermaid,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let format = OutputFormat::from(cli.format);

    match cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "tradelens", &mut io::stdout());
            Ok(())
        }
        Commands::Schema { diagram } => cmd_schema(diagram),
        Commands::Graph {
            command: GraphCommands::Init { path },
        } => cmd_graph_init(&path, format),
        Commands::Graph {
            command: GraphCommands::Stats,
        } => {
            let settings = load_settings(cli.config.as_deref(), cli.graph_db)?;
            cmd_graph_stats(&settings, format)
        }
        Commands::Relevance { query } => {
            let engine = engine(cli.config.as_deref(), cli.graph_db)?;
            let query = query.join(" ");
            let ctx = engine.extract_query_context(&query);
            let scores = engine.score_table_relevance(&ctx);
            tracing::info!(backend = engine.backend_name(), tables = scores.len(), "scored");
            println!("{}", format_relevance(&scores, format).trim_end());
            Ok(())
        }
        Commands::JoinPath { tables } => {
            let engine = engine(cli.config.as_deref(), cli.graph_db)?;
            let path = engine.resolve_join_path(&tables);
            print_list("table", &path, format)
        }
        Commands::Suggest { partial } => {
            let engine = engine(cli.config.as_deref(), cli.graph_db)?;
            let suggestions = engine.get_query_suggestions(&partial.join(" "));
            print_list("suggestion", &suggestions, format)
        }
        Commands::Sql { query } => {
            let engine = engine(cli.config.as_deref(), cli.graph_db)?;
            let assembled = engine.assemble_sql(&query.join(" "));
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&assembled)?);
                }
                OutputFormat::Table => println!("{}", assembled.sql),
                OutputFormat::Markdown => println!("```sql\n{}\n```", assembled.sql),
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_settings(config: Option<&Path>, graph_db: Option<PathBuf>) -> Result<Settings> {
    let mut settings = match config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Settings::load().context("failed to load config")?,
    };
    if graph_db.is_some() {
        settings.graph.path = graph_db;
    }
    Ok(settings)
}

fn engine(config: Option<&Path>, graph_db: Option<PathBuf>) -> Result<RelevanceEngine> {
    let settings = load_settings(config, graph_db)?;
    RelevanceEngine::connect(&settings).context("failed to start relevance engine")
}

fn print_list(column: &str, items: &[String], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
        other => {
            let set = ResultSet {
                columns: vec![column.to_string()],
                rows: items.iter().map(|i| vec![i.clone()]).collect(),
            };
            println!("{}", format_results(&set, other).trim_end());
        }
    }
    Ok(())
}

fn cmd_schema(diagram: DiagramArg) -> Result<()> {
    let catalog = Catalog::trading().context("built-in trading schema is invalid")?;
    let diagram_out = SchemaDiagram::from_schema(&catalog.schema);
    let text = match diagram {
        DiagramArg::Dot => diagram_out.format_dot(),
        DiagramArg::Mermaid => diagram_out.format_mermaid(),
        DiagramArg::Json => diagram_out.format_json(),
    };
    println!("{}", text.trim_end());
    Ok(())
}

fn cmd_graph_init(path: &Path, format: OutputFormat) -> Result<()> {
    let Catalog { schema, weights } =
        Catalog::trading().context("built-in trading catalog is invalid")?;

    let store = GraphStore::create(path)
        .with_context(|| format!("failed to create graph store at {}", path.display()))?;
    store
        .seed(&schema, &weights)
        .context("failed to seed graph store")?;

    let tables = store.table_count()?;
    match format {
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "path": path.display().to_string(),
                "tables": tables,
                "relationships": schema.relationships().len(),
                "keywords": weights.len(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        _ => println!(
            "Initialized graph store at {} ({tables} tables, {} keywords)",
            path.display(),
            weights.len()
        ),
    }
    Ok(())
}

fn cmd_graph_stats(settings: &Settings, format: OutputFormat) -> Result<()> {
    let Some(path) = settings.graph.path.as_deref() else {
        bail!("no graph store configured; pass --graph-db or set [graph] path");
    };
    let store = GraphStore::connect(path, settings.graph.timeout())
        .with_context(|| format!("failed to open graph store at {}", path.display()))?;
    let stats = store.table_stats()?;
    println!("{}", format_records(&stats, format).trim_end());
    Ok(())
}
