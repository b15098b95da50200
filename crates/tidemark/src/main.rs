//! tidemark CLI
//!
//! Command-line tool for generating schema migrations.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tidemark::prelude::*;
use tidemark::tidemark_core::dialect::DialectKind;
use tidemark::tidemark_core::planner::MigrationPlan;
use tidemark::tidemark_core::rename::{FixedAnswer, RenameOracle};

/// Upgrade/downgrade SQL migrations generated from model snapshots.
#[derive(Parser)]
#[command(name = "tidemark")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./tidemark.json when present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Application name.
    #[arg(short, long)]
    app: Option<String>,

    /// Migrations directory.
    #[arg(short, long)]
    location: Option<PathBuf>,

    /// SQL dialect (sqlite, postgres, mysql).
    #[arg(long, env = "TIDEMARK_DIALECT")]
    dialect: Option<DialectKind>,

    /// SQLite URL of the migration history database.
    #[arg(short, long, env = "DATABASE_URL")]
    database: Option<String>,

    /// JSON snapshot of the current models.
    #[arg(short, long)]
    models: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the first migration from the current models.
    Init,

    /// Write the next migration from model changes.
    Migrate {
        /// Migration name.
        #[arg(short, long, default_value = "update")]
        name: String,

        /// Show SQL without writing files (dry run).
        #[arg(long)]
        dry_run: bool,

        /// How to answer rename questions.
        #[arg(long, value_enum, default_value_t = RenameMode::Ask)]
        renames: RenameMode,
    },

    /// List migration versions.
    History,
}

#[derive(Clone, Copy, ValueEnum)]
enum RenameMode {
    /// Prompt on the terminal.
    Ask,
    /// Accept every rename.
    Yes,
    /// Reject every rename (drop and add).
    No,
}

impl RenameMode {
    fn oracle(self) -> Box<dyn RenameOracle> {
        match self {
            Self::Ask => Box::new(PromptOracle::new(
                std::io::stdin().lock(),
                std::io::stderr(),
            )),
            Self::Yes => Box::new(FixedAnswer(true)),
            Self::No => Box::new(FixedAnswer(false)),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(app) = cli.app {
        settings.app = app;
    }
    if let Some(location) = cli.location {
        settings.location = location;
    }
    if let Some(dialect) = cli.dialect {
        settings.dialect = dialect;
    }
    if cli.database.is_some() {
        settings.database = cli.database;
    }
    if cli.models.is_some() {
        settings.models = cli.models;
    }
    settings.validate()?;

    let dialect = settings.dialect.build();
    let store = settings.store();
    let generator = MigrationGenerator::new(dialect.as_ref(), store.clone());

    match cli.command {
        Commands::Init => {
            let current = settings.load_models()?;
            let generated = generator.init(&current)?;
            info!("Created migration: {}", generated.path.display());
        }

        Commands::Migrate {
            name,
            dry_run,
            renames,
        } => {
            let current = settings.load_models()?;
            let mut oracle = renames.oracle();

            if dry_run {
                info!("Dry run mode - SQL will be printed but not written.");
                let plan = generator.preview(&current, oracle.as_mut())?;
                print_plan(&plan);
                return Ok(());
            }

            let generated = match &settings.database {
                Some(url) => {
                    let history = MigrationHistory::connect(url).await?;
                    generator
                        .migrate(&history, &current, &name, oracle.as_mut())
                        .await?
                }
                None => {
                    generator
                        .migrate(&store, &current, &name, oracle.as_mut())
                        .await?
                }
            };

            match generated {
                Some(generated) => info!("Created migration: {}", generated.path.display()),
                None => info!("No changes detected."),
            }
        }

        Commands::History => {
            let versions = store.list_versions()?;
            if versions.is_empty() {
                info!("No migrations found in {}.", store.root().display());
                return Ok(());
            }

            let history = match &settings.database {
                Some(url) => Some(MigrationHistory::connect(url).await?),
                None => None,
            };

            println!("\n{}:", store.app());
            println!("{:-<60}", "");
            for version in &versions {
                match &history {
                    Some(history) => {
                        let mark = if history.is_applied(store.app(), version).await? {
                            "X"
                        } else {
                            " "
                        };
                        println!(" [{mark}] {version}");
                    }
                    None => println!(" {version}"),
                }
            }
            println!();
        }
    }

    Ok(())
}

fn print_plan(plan: &MigrationPlan) {
    if plan.is_empty() {
        println!("-- No changes detected");
        return;
    }
    println!("-- upgrade");
    for sql in plan.upgrade_sql() {
        println!("{sql};");
    }
    println!("\n-- downgrade");
    for sql in plan.downgrade_sql() {
        println!("{sql};");
    }
}
