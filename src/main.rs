use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wikidelta::cli::commands;
use wikidelta::cli::util::require_local;
use wikidelta::cli::{CommandContext, resolve_repo};
use wikidelta::config::RenderFormat;
use wikidelta::types::redact_secrets;
use wikidelta::{ExportLayout, WikiError};

#[derive(Parser)]
#[command(name = "wikidelta")]
#[command(
    version,
    about = "Keep a generated repository wiki in step with its source and with hand edits"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root whose .wikidelta/config.toml applies
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

/// Repository selection shared by cache-facing commands
#[derive(clap::Args)]
struct RepoArgs {
    /// Local path or https URL of the repository
    #[arg(long, default_value = ".")]
    repo: String,

    /// Access token for private remote repositories
    #[arg(long, env = "WIKIDELTA_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Wiki language (defaults to cache.language)
    #[arg(long, short)]
    language: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize wikidelta in the project root
    Init {
        #[arg(long, short, help = "Overwrite existing configuration")]
        force: bool,
    },

    /// Fingerprint the files of a local checkout
    Snapshot {
        #[arg(long, default_value = ".")]
        repo: String,
        #[arg(long, short, help = "Also write the snapshot JSON to this file")]
        out: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// List new, changed and deleted files since a baseline
    Diff {
        #[arg(long, default_value = ".")]
        repo: String,
        #[arg(long, help = "Snapshot file to compare against (default: cached snapshot)")]
        baseline: Option<PathBuf>,
        #[arg(long, short)]
        language: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Show which cached pages need regenerating
    Plan {
        #[arg(long, default_value = ".")]
        repo: String,
        #[arg(long, short)]
        language: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Inspect and clean the wiki cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Export a cached wiki as an editable Markdown workspace
    Export {
        #[command(flatten)]
        repo: RepoArgs,
        #[arg(long, short, help = "Workspace directory")]
        out: PathBuf,
        #[arg(long, help = "single-file or multi-file (default: workspace.layout)")]
        layout: Option<ExportLayout>,
    },

    /// Write edits from an exported workspace back into the cache
    Sync {
        #[arg(default_value = ".", help = "Workspace directory or manifest file")]
        target: PathBuf,
        #[arg(long = "file", help = "Only check these files")]
        files: Vec<PathBuf>,
        #[arg(long)]
        json: bool,
    },

    /// Sync a workspace continuously as files are saved
    Watch {
        #[arg(default_value = ".", help = "Workspace directory or manifest file")]
        target: PathBuf,
        #[arg(long, help = "Debounce window in milliseconds (default: workspace.debounce_ms)")]
        debounce_ms: Option<u64>,
    },

    /// Find exported workspaces below a directory
    Manifests {
        #[arg(default_value = ".")]
        dir: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cache entries and statistics
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one cache entry
    Show {
        #[command(flatten)]
        repo: RepoArgs,
        #[arg(long)]
        json: bool,
    },
    /// Remove quarantined and stale-schema files
    Clean {
        #[arg(long, help = "Remove every cache file")]
        all: bool,
        #[arg(long, help = "Only remove quarantined files")]
        quarantined: bool,
        #[arg(long, help = "Only remove entries from other schema versions")]
        stale: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(short = 'f', long, default_value = "toml", help = "Output format: toml, yaml, json")]
        format: RenderFormat,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

fn main() -> ExitCode {
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red(), redact_secrets(&format!("{:#}", e)));
            if let Some(hint) = e.downcast_ref::<WikiError>().and_then(WikiError::remediation) {
                eprintln!("  {}", style(hint).dim());
            }
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let root = cli.root;

    match cli.command {
        Commands::Init { force } => commands::init::run(&root, force)?,
        Commands::Snapshot { repo, out, json } => {
            let ctx = CommandContext::load(&root)?;
            commands::snapshot::run(&ctx, &require_local(&repo)?, out.as_deref(), json)?;
        }
        Commands::Diff {
            repo,
            baseline,
            language,
            json,
        } => {
            let ctx = CommandContext::load(&root)?;
            commands::diff::run(
                &ctx,
                &require_local(&repo)?,
                baseline.as_deref(),
                language.as_deref(),
                json,
            )?;
        }
        Commands::Plan {
            repo,
            language,
            json,
        } => {
            let ctx = CommandContext::load(&root)?;
            commands::plan::run(&ctx, &require_local(&repo)?, language.as_deref(), json)?;
        }
        Commands::Cache { action } => {
            let ctx = CommandContext::load(&root)?;
            match action {
                CacheAction::List { json } => commands::cache::list(&ctx, json)?,
                CacheAction::Show { repo, json } => {
                    let identity = resolve_repo(&repo.repo, repo.token)?;
                    commands::cache::show(&ctx, &identity, repo.language.as_deref(), json)?;
                }
                CacheAction::Clean {
                    all,
                    quarantined,
                    stale,
                } => commands::cache::clean(&ctx, all, quarantined, stale)?,
            }
        }
        Commands::Export { repo, out, layout } => {
            let ctx = CommandContext::load(&root)?;
            let identity = resolve_repo(&repo.repo, repo.token)?;
            commands::export::run(&ctx, &identity, repo.language.as_deref(), &out, layout)?;
        }
        Commands::Sync {
            target,
            files,
            json,
        } => {
            let ctx = CommandContext::load(&root)?;
            commands::sync::run(&ctx, &target, &files, json)?;
        }
        Commands::Watch {
            target,
            debounce_ms,
        } => {
            let ctx = CommandContext::load(&root)?;
            commands::watch::run(&ctx, &target, debounce_ms)?;
        }
        Commands::Manifests { dir, json } => commands::manifests::run(&dir, json)?,
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => commands::config::show(&root, global, format)?,
            ConfigAction::Path => commands::config::path(&root)?,
            ConfigAction::Init { global, force } => commands::config::init(&root, global, force)?,
        },
    }

    Ok(())
}
