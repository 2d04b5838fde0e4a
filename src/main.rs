use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tkgraph::config::{Config, LoggingConfig};

mod cli;

#[derive(Parser)]
#[command(name = "tkgraph")]
#[command(author = "Intent Project Team")]
#[command(version = "0.1.0")]
#[command(about = "Temporal knowledge graph of a repository's code, history and decisions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Repository root
    #[arg(short, long, global = true, default_value = ".")]
    project: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the full commit history
    Index {
        /// Ignore stored file hashes and re-parse every changed file
        #[arg(long)]
        no_cache: bool,

        /// Drop the graph and index from scratch
        #[arg(short, long)]
        rebuild: bool,
    },

    /// Index a single commit on top of the existing graph
    Commit {
        /// Commit hash
        hash: String,
    },

    /// Show the version history of a code element
    History {
        /// Stable identifier, e.g. src/app.py:class:App
        element: String,

        /// Maximum number of commits to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format: json, text
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Record a decision, optionally linking it to an element
    Decide {
        /// Decision title
        title: String,

        /// Decision body
        #[arg(short, long, default_value = "")]
        content: String,

        /// Stable identifier of the element to link
        #[arg(short, long)]
        element: Option<String>,

        /// Author email
        #[arg(long)]
        author_email: Option<String>,

        /// Author name
        #[arg(long)]
        author_name: Option<String>,
    },

    /// Link an existing decision to the latest version of an element
    Link {
        /// Decision id or title
        decision: String,

        /// Stable identifier of the element
        element: String,
    },

    /// Print the repository element graph
    Graph {
        /// Output format: json, text
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Show graph statistics
    Stats {
        /// List commits and decisions as well
        #[arg(long)]
        detailed: bool,
    },

    /// Checkpoint and vacuum the graph database
    Compact,

    /// List supported languages
    Languages,
}

fn init_logging(debug: bool, verbose: bool, logging: &LoggingConfig) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.format == "pretty" {
        builder.pretty().init();
    } else {
        builder.compact().init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_project_dir(&cli.project);
    init_logging(cli.debug, cli.verbose, &config.logging);

    info!("tkgraph v0.1.0 starting...");

    match cli.command {
        Commands::Index { no_cache, rebuild } => {
            cli::index::index_history(&cli.project, config, no_cache, rebuild).await?;
        }

        Commands::Commit { hash } => {
            cli::index::index_commit(&cli.project, config, &hash).await?;
        }

        Commands::History { element, limit, format } => {
            cli::history::show_history(&cli.project, &config, &element, limit, &format)?;
        }

        Commands::Decide {
            title,
            content,
            element,
            author_email,
            author_name,
        } => {
            let author = cli::decide::author_from_args(author_name, author_email);
            cli::decide::record_decision(&cli.project, &config, &title, &content, element.as_deref(), author)?;
        }

        Commands::Link { decision, element } => {
            cli::decide::link_decision(&cli.project, &config, &decision, &element)?;
        }

        Commands::Graph { format } => {
            cli::graph::print_graph(&cli.project, &config, &format)?;
        }

        Commands::Stats { detailed } => {
            cli::stats::show_stats(&cli.project, &config, detailed)?;
        }

        Commands::Compact => {
            cli::stats::compact(&cli.project, &config)?;
        }

        Commands::Languages => {
            cli::languages::list_languages();
        }
    }

    Ok(())
}
