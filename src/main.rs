//! noema CLI: knowledge-graph activation and confidence fusion.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use noema::engine::{Engine, EngineConfig};
use noema::search::HitSource;
use noema::seeds::SeedRegistry;

#[derive(Parser)]
#[command(name = "noema", version, about = "Knowledge-graph activation and confidence fusion")]
struct Cli {
    /// Data directory for persistent storage.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// TOML configuration file (fields of EngineConfig).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a data directory and apply the seed pack.
    Init,

    /// Process a query through the full pipeline.
    Query {
        /// The query text.
        text: String,

        /// Print the full outcome as JSON.
        #[arg(long)]
        json: bool,

        /// Skip the learning step.
        #[arg(long)]
        no_learn: bool,
    },

    /// Run only the recursive concept search.
    Search {
        /// The query text.
        text: String,

        /// Maximum recursion depth.
        #[arg(long, default_value = "3")]
        depth: usize,
    },

    /// Show the nodes a query activates.
    Activate {
        /// The query text.
        text: String,
    },

    /// List domains with their concept counts.
    Domains,

    /// Show recent interactions.
    History {
        /// Number of interactions to show.
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// List available seed packs.
    Seeds,

    /// Show engine info and statistics.
    Info,

    /// Export engine data as JSON.
    Export {
        #[command(subcommand)]
        action: ExportAction,
    },
}

#[derive(Subcommand)]
enum ExportAction {
    /// Export the whole knowledge store.
    Snapshot,
    /// Export the interaction log, oldest first.
    Log,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => EngineConfig::default(),
    };
    if cli.data_dir.is_some() {
        config.data_dir = cli.data_dir.clone();
    }

    match cli.command {
        Commands::Init => {
            let data_dir = config
                .data_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(".noema"));
            config.data_dir = Some(data_dir.clone());
            let engine = Engine::new(config)?;
            engine.persist()?;
            println!("Initialized noema at {}", data_dir.display());
            println!("{}", engine.info());
        }

        Commands::Query {
            text,
            json,
            no_learn,
        } => {
            if no_learn {
                config.learning_enabled = false;
            }
            let engine = Engine::new(config)?;
            let outcome = engine.process(&text)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome).into_diagnostic()?);
            } else {
                print!("{outcome}");
            }
            engine.persist()?;
        }

        Commands::Search { text, depth } => {
            let engine = Engine::new(config)?;
            let hits = engine.search(&text, depth)?;
            if hits.is_empty() {
                println!("No concepts found.");
            }
            for (i, hit) in hits.iter().enumerate() {
                let via = match &hit.source {
                    HitSource::Direct => "direct".to_string(),
                    HitSource::Association { via, weight } => format!("via {via} ({weight:.2})"),
                    HitSource::Sibling { via, depth } => {
                        format!("sibling of \"{via}\" (depth {depth})")
                    }
                };
                println!(
                    "  {}. {} / \"{}\" relevance={:.2} [{}]",
                    i + 1,
                    hit.domain,
                    hit.concept,
                    hit.relevance,
                    via
                );
            }
        }

        Commands::Activate { text } => {
            let engine = Engine::new(config)?;
            let activated = engine.activate(&text)?;
            if activated.is_empty() {
                println!("Nothing activated.");
            }
            for a in &activated {
                println!("  {:<24} {:<10} {:.4}", a.node.id, a.node.kind, a.activation);
            }
        }

        Commands::Domains => {
            let engine = Engine::new(config)?;
            let domains = engine.domains();
            println!("Domains ({}):", domains.len());
            for d in &domains {
                println!(
                    "  {:<20} \"{}\" concepts={} interactions={}",
                    d.id,
                    d.name,
                    d.concepts.len(),
                    d.interaction_count
                );
            }
        }

        Commands::History { limit } => {
            let engine = Engine::new(config)?;
            let records = engine.recent_interactions(limit);
            if records.is_empty() {
                println!("No interactions recorded.");
            }
            for r in &records {
                println!(
                    "  [{}] \"{}\" confidence={:.2} domains={}",
                    r.timestamp,
                    r.query,
                    r.confidence,
                    r.domains_used.join(",")
                );
            }
        }

        Commands::Seeds => {
            let registry = match &config.data_dir {
                Some(dir) => SeedRegistry::discover(&dir.join("seeds")),
                None => SeedRegistry::bundled(),
            };
            for pack in registry.list() {
                println!("  {:<16} v{:<8} {}", pack.id, pack.version, pack.description);
            }
        }

        Commands::Info => {
            let engine = Engine::new(config)?;
            println!("{}", engine.info());
        }

        Commands::Export { action } => {
            let engine = Engine::new(config)?;
            let json = match action {
                ExportAction::Snapshot => engine.export_snapshot_json()?,
                ExportAction::Log => engine.export_log_json()?,
            };
            println!("{json}");
        }
    }

    Ok(())
}
