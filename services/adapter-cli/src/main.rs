// services/adapter-cli/src/main.rs
//
// scylla-adapter - connection check and materialized view index planning
// against a ScyllaDB profile
//

use adapterkit::config::{self, AdapterConfig};
use adapterkit::database::{Connection, ScyllaConnectionManager};
use adapterkit::relation::{MaterializedViewModel, ScyllaRelation};
use anyhow::Result;
use clap::{Parser, Subcommand};
use prometheus::{Encoder, TextEncoder};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "scylla-adapter")]
#[command(about = "ScyllaDB adapter: connection debugging and materialized view index planning")]
struct Args {
    /// Path to the connection profile
    #[arg(short, long, default_value = "config/profiles.yaml")]
    profile: String,

    /// Print Prometheus metrics before exiting
    #[arg(long, default_value = "false")]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a connection and run a probe query
    Debug,

    /// Show index changes needed to reconcile a materialized view with its model
    Plan {
        /// Path to the materialized view model
        #[arg(short, long)]
        model: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = config::load_config(&args.profile)?;

    // Initialize tracing
    let level = config.observability.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("adapterkit={level},scylla_adapter={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Using profile {}", args.profile);

    let manager = ScyllaConnectionManager::default();
    let result = match &args.command {
        Command::Debug => debug_connection(&manager, &config).await,
        Command::Plan { model } => plan(&manager, &config, model).await,
    };

    if args.metrics {
        print_metrics()?;
    }

    result
}

async fn debug_connection(manager: &ScyllaConnectionManager, config: &AdapterConfig) -> Result<()> {
    println!("  type: {}", config.credentials.adapter_type());
    for (key, value) in config.credentials.connection_info() {
        println!("  {}: {}", key, value);
    }

    let mut connection = Connection::new("debug", config.credentials.clone());
    manager.open(&mut connection).await?;
    let response = manager
        .execute(&mut connection, "SELECT now() FROM system.local")
        .await;
    manager.cancel(&mut connection).await;

    let response = response?;
    println!("Connection test: [OK connection ok] ({})", response.message);
    Ok(())
}

async fn plan(manager: &ScyllaConnectionManager, config: &AdapterConfig, model_path: &str) -> Result<()> {
    let model = MaterializedViewModel::load(model_path)?;
    let relation = ScyllaRelation::materialized_view(&model.keyspace, &model.name)?;

    let mut connection = Connection::new(format!("plan.{}", relation), config.credentials.clone());
    manager.open(&mut connection).await?;
    let results = manager
        .get_relation_results(&mut connection, &model.keyspace, &model.name)
        .await;
    manager.cancel(&mut connection).await;

    match relation.get_materialized_view_config_change_collection(&results?, &model)? {
        None => println!("{}: no configuration changes", relation),
        Some(changes) => {
            info!(
                "{} change(s) for {} (full refresh: {})",
                changes.indexes.len(),
                relation,
                changes.requires_full_refresh()
            );
            println!("{}", serde_json::to_string_pretty(&changes.ordered())?);
        }
    }
    Ok(())
}

fn print_metrics() -> Result<()> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    println!("{}", String::from_utf8(buffer)?);
    Ok(())
}
