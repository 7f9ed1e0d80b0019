//! Research agent engine CLI
//!
//! ## Commands
//!
//! - `demo`: Run the three sample queries in one session, evaluate it and
//!   export the trace
//! - `ask`: Research a single query
//! - `config`: Print the effective engine configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use research_core::{EngineConfig, LogFormat, Orchestrator, QueryRecord};
use research_tools::SimulatedWebSearch;

const DEMO_SESSION: &str = "demo_session_001";

const DEMO_QUERIES: [&str; 3] = [
    "artificial intelligence latest trends 2024",
    "climate change mitigation strategies",
    "quantum computing applications",
];

#[derive(Parser)]
#[command(name = "research")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-agent research pipeline with session memory", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Engine configuration file (TOML)
    #[arg(long, global = true, env = "RESEARCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sample queries, print the evaluation and export the trace
    Demo {
        /// Where to write the exported trace
        #[arg(long, default_value = "research_agent_traces.json")]
        trace_out: PathBuf,
    },

    /// Research a single query
    Ask {
        /// The research question
        query: String,

        /// Session to run in (a fresh one is opened if omitted)
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    research_core::init_tracing(LogFormat::from_json_flag(cli.json), level);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Demo { trace_out } => cmd_demo(config, &trace_out).await,
        Commands::Ask { query, session } => cmd_ask(config, &query, session.as_deref()).await,
        Commands::Config => cmd_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path)),
        None => Ok(EngineConfig::default()),
    }
}

fn build_orchestrator(config: EngineConfig) -> Result<Orchestrator> {
    Orchestrator::new(config, Arc::new(SimulatedWebSearch::new()))
        .context("Invalid engine configuration")
}

fn print_record(record: &QueryRecord) {
    let preview: String = record.answer.chars().take(150).collect();
    println!("Synthesis: {}...", preview);
    println!("  Sources: {}", record.source_count);
    println!("{}", "-".repeat(60));
}

async fn cmd_demo(config: EngineConfig, trace_out: &Path) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let session = orchestrator.sessions().create(DEMO_SESSION);
    info!(session_key = %session, "demo session ready");

    println!("Starting research queries...\n");
    for query in DEMO_QUERIES {
        println!("Query: {}", query);
        let record = orchestrator
            .run(query, &session)
            .await
            .with_context(|| format!("Research failed for query: {}", query))?;
        print_record(&record);
    }

    println!("\nPerformance Evaluation:\n");
    let report = orchestrator.evaluator().evaluate(&session)?;
    println!("{}", report.to_json()?);

    for stage in orchestrator.evaluator().stage_breakdown(&session)? {
        println!(
            "  {:<16} runs={} total_ms={}",
            stage.agent, stage.runs, stage.total_ms
        );
    }

    export_trace(&orchestrator, trace_out)?;
    println!("\nTraces exported to: {}", trace_out.display());

    orchestrator.metrics().flush();
    Ok(())
}

fn export_trace(orchestrator: &Orchestrator, path: &Path) -> Result<()> {
    let snapshot = orchestrator.trace().export_snapshot();
    let json = snapshot.to_json().context("Failed to serialize trace")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write trace to {:?}", path))?;
    info!(
        path = %path.display(),
        events = snapshot.events.len(),
        "trace exported"
    );
    Ok(())
}

async fn cmd_ask(config: EngineConfig, query: &str, session: Option<&str>) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    let session = match session {
        Some(key) => orchestrator.sessions().create(key),
        None => orchestrator.open_session(),
    };

    let record = orchestrator.run(query, &session).await?;
    println!("Session: {}", session);
    println!("{}", record.answer);
    println!("Sources: {}", record.source_count);
    for source in &record.sources {
        println!("  - {}", source);
    }
    Ok(())
}

fn cmd_config(config: &EngineConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render config")?;
    print!("{}", rendered);
    Ok(())
}
