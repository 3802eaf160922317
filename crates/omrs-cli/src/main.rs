mod cli;
mod commands;
mod config;
mod observability;
mod output;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::Colorize;
use omrs_db_postgres::PostgresOrderStore;
use tracing::info;

use cli::{Cli, Commands, ConfigCommands, OrderCommands};
use config::AppConfig;
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    observability::init_tracing_with_level("warn");

    let mut cfg = config::loader::load_config(cli.config.as_deref())
        .map_err(|e| anyhow!(e))
        .context("failed to load configuration")?;
    cfg.apply_overrides(cli.locale.as_deref())
        .map_err(|e| anyhow!(e))
        .context("invalid command-line option")?;
    observability::apply_logging_level(&cfg.logging.level);

    let format = cli.format.unwrap_or_default();

    match &cli.command {
        Commands::Config(args) => match &args.command {
            ConfigCommands::Show => show_config(&cfg),
        },
        Commands::Order(args) => {
            let store = connect(&cfg).await?;
            let result = match &args.command {
                OrderCommands::Expand(expand) => {
                    commands::order::expand(&store, expand, format).await
                }
                OrderCommands::Get(get) => commands::order::get(&store, get.id, format).await,
                OrderCommands::List(list) => {
                    commands::order::list(&store, list, &cfg.paging, format).await
                }
                OrderCommands::Drugs(query) => {
                    commands::order::drugs(&store, query, &cfg.paging, format).await
                }
            };
            store.close().await;
            result?;
        }
    }

    Ok(())
}

async fn connect(cfg: &AppConfig) -> Result<PostgresOrderStore> {
    let pg = &cfg.storage.postgres;
    info!(url = %pg.display_url(), "connecting to OpenMRS database");
    PostgresOrderStore::new(&pg.to_postgres_config(), cfg.enrichment.clone())
        .await
        .with_context(|| format!("failed to connect to {}", pg.display_url()))
}

fn show_config(cfg: &AppConfig) {
    let pg = &cfg.storage.postgres;
    println!("{}: {}", "Database".cyan(), pg.display_url());
    println!("{}: {}", "Pool size".cyan(), pg.pool_size);
    println!("{}: {}", "Locale".cyan(), cfg.enrichment.locale);
    println!(
        "{}: {}",
        "Drug order type".cyan(),
        cfg.enrichment
            .drug_order_type_id
            .map(|id| id.to_string())
            .as_deref()
            .unwrap_or("(not set)")
    );
    println!(
        "{}: {}",
        "Fallback expansion".cyan(),
        if cfg.enrichment.fallback_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "{}: default {}, max {}",
        "Paging".cyan(),
        cfg.paging.default_limit,
        cfg.paging.max_limit
    );
    println!("{}: {}", "Log level".cyan(), cfg.logging.level);
    output::print_success("configuration is valid");
}
