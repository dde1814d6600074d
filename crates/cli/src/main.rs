use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use calctree_core::CalculationId;
use calctree_engine::{CalculationService, ServiceConfig};
use calctree_storage::SqliteStore;

#[derive(Parser)]
#[clap(author, version, about = "Build shared trees of calculations")]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(short, long, env = "CALCTREE_DB", default_value = "calctree.db", global = true)]
    database: PathBuf,
    #[clap(long, env = "CALCTREE_MAX_DEPTH", global = true)]
    max_depth: Option<usize>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage users
    User {
        #[clap(subcommand)]
        command: UserCommand,
    },
    /// Start a new tree
    Root {
        #[clap(short, long)]
        user: String,
        #[clap(allow_negative_numbers = true)]
        value: f64,
    },
    /// Derive a child calculation from a parent
    Apply {
        #[clap(short, long)]
        user: String,
        parent: i64,
        operation: String,
        #[clap(allow_negative_numbers = true)]
        operand: f64,
    },
    /// Print the tree containing a calculation
    Tree { id: i64 },
    /// Print every tree
    Trees,
    /// Report records that cannot be placed in any tree
    Verify,
}

#[derive(Subcommand)]
enum UserCommand {
    Add { name: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let store = SqliteStore::open(&cli.database)
        .with_context(|| format!("opening {}", cli.database.display()))?;
    let mut config = ServiceConfig::default();
    if let Some(max_depth) = cli.max_depth {
        config.max_depth = max_depth;
    }
    let mut service = CalculationService::with_config(store, config);

    run(cli, &mut service)
}

fn run(cli: Cli, service: &mut CalculationService<SqliteStore>) -> Result<()> {
    match cli.command {
        Command::User { command: UserCommand::Add { name } } => {
            let user = service.register_user(&name)?;
            info!("Registered user {} ({})", user.username, user.id);
            print_json(&user)?;
        }
        Command::Root { user, value } => {
            let user = service.require_user(&user)?;
            let view = service.create_root(user.id, value)?;
            info!("Created root {} = {}", view.id(), view.value());
            print_json(&view)?;
        }
        Command::Apply { user, parent, operation, operand } => {
            let user = service.require_user(&user)?;
            let view =
                service.add_operation(user.id, CalculationId::new(parent), &operation, operand)?;
            info!("Created {} = {}", view.id(), view.value());
            print_json(&view)?;
        }
        Command::Tree { id } => match service.get_tree(CalculationId::new(id))? {
            Some(tree) => print_json(&tree)?,
            None => bail!("calculation {id} not found"),
        },
        Command::Trees => {
            let trees = service.get_all_trees()?;
            info!("Loaded {} trees", trees.len());
            print_json(&trees)?;
        }
        Command::Verify => {
            let forest = service.all_forest()?;
            let orphans = forest.orphans();
            for id in &orphans {
                warn!("Calculation {id} is not reachable from any root");
            }
            info!(
                "{} roots, {} calculations placed, {} orphaned",
                forest.root_count(),
                forest.len(),
                orphans.len()
            );
            if !orphans.is_empty() {
                bail!("{} orphaned calculations", orphans.len());
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_deref()
        .unwrap_or("info")
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level.to_string()))
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
