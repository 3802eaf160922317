use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "omrs")]
#[command(about = "OMRS Bridge CLI: read OpenMRS orders with their clinical context")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./omrs.toml when present)
    #[arg(short, long, global = true, env = "OMRS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Locale for concept names (overrides enrichment.locale)
    #[arg(long, global = true)]
    pub locale: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read enriched orders
    Order(OrderArgs),
    /// Inspect CLI configuration
    Config(ConfigArgs),
}

#[derive(clap::Args)]
pub struct OrderArgs {
    #[command(subcommand)]
    pub command: OrderCommands,
}

#[derive(Subcommand)]
pub enum OrderCommands {
    /// Read one order with its panel members or parent panel
    Expand(ExpandArgs),
    /// Read one order with orderer, patient and concept details
    Get(GetArgs),
    /// List orders matching a filter
    List(ListArgs),
    /// List drug orders with their prescription details
    Drugs(QueryArgs),
}

#[derive(clap::Args)]
pub struct ExpandArgs {
    /// Order id
    #[arg(long)]
    pub id: Option<i32>,
    /// Order uuid
    #[arg(long)]
    pub uuid: Option<String>,
}

#[derive(clap::Args)]
pub struct GetArgs {
    /// Order id
    pub id: i32,
}

#[derive(clap::Args)]
pub struct QueryArgs {
    /// Filter as key=value, repeatable (e.g. --filter patient_id=85 --filter urgency=STAT)
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub filters: Vec<(String, String)>,
    /// Number of orders to skip
    #[arg(long, default_value_t = 0)]
    pub skip: u32,
    /// Maximum number of orders (defaults to paging.default_limit)
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(clap::Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub query: QueryArgs,
    /// Include panel members, parent panel and concept answers
    #[arg(long)]
    pub expand: bool,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("patient_id=85").unwrap(),
            ("patient_id".to_string(), "85".to_string())
        );
        assert_eq!(
            parse_key_value("instructions=a=b").unwrap(),
            ("instructions".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("patient_id").is_err());
        assert!(parse_key_value("=85").is_err());
    }

    #[test]
    fn test_parse_order_list() {
        let cli = Cli::try_parse_from([
            "omrs",
            "order",
            "list",
            "--filter",
            "patient_id=85",
            "--filter",
            "urgency=STAT",
            "--limit",
            "5",
            "--expand",
            "--format",
            "table",
        ])
        .unwrap();

        assert_eq!(cli.format, Some(OutputFormat::Table));
        let Commands::Order(OrderArgs {
            command: OrderCommands::List(args),
        }) = cli.command
        else {
            panic!("expected order list");
        };
        assert!(args.expand);
        assert_eq!(args.query.limit, Some(5));
        assert_eq!(args.query.skip, 0);
        assert_eq!(args.query.filters.len(), 2);
    }

    #[test]
    fn test_parse_order_expand_by_uuid() {
        let cli = Cli::try_parse_from([
            "omrs",
            "order",
            "expand",
            "--uuid",
            "90009000-0000-4000-8000-000000009000",
        ])
        .unwrap();

        let Commands::Order(OrderArgs {
            command: OrderCommands::Expand(args),
        }) = cli.command
        else {
            panic!("expected order expand");
        };
        assert_eq!(args.id, None);
        assert_eq!(
            args.uuid.as_deref(),
            Some("90009000-0000-4000-8000-000000009000")
        );
    }

    #[test]
    fn test_rejects_malformed_filter() {
        assert!(Cli::try_parse_from(["omrs", "order", "drugs", "--filter", "oops"]).is_err());
    }
}
