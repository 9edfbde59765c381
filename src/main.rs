use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use clap::{Args, Parser, Subcommand};
use shop_countdown::OutputFormat;
use shop_countdown::commands::{self, Source};
use shop_countdown::config;
use shop_countdown::platform;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cdt")]
#[command(about = "Preview and follow storefront countdown and low-stock widgets")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.shop-countdown/config.toml)
    #[arg(long, global = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RecordArgs {
    #[arg(help = "Record JSON file (as returned by the config endpoint)")]
    file: Option<PathBuf>,
    #[arg(long, help = "Fetch the published record by id instead")]
    id: Option<String>,
}

impl RecordArgs {
    fn source(&self) -> Result<Source> {
        Source::from_args(self.file.clone(), self.id.clone())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a countdown timer once
    Preview {
        #[command(flatten)]
        record: RecordArgs,
        #[arg(long, help = "Evaluate at this instant (RFC 3339) instead of now")]
        at: Option<String>,
        #[arg(long, help = "Storefront path the widget is mounted on")]
        page: Option<String>,
        #[arg(long, help = "Do not read or write the persisted fixed-timer target")]
        no_persist: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Follow a countdown timer tick by tick
    Watch {
        #[command(flatten)]
        record: RecordArgs,
        #[arg(long, help = "Storefront path the widget is mounted on")]
        page: Option<String>,
        #[arg(long, help = "Stop after this many ticks")]
        ticks: Option<u64>,
    },
    /// Decide what the low-stock widget shows for a variant
    Stock {
        #[command(flatten)]
        record: RecordArgs,
        #[arg(long, help = "Variant id or gid")]
        variant: String,
        #[arg(long, help = "Inventory quantity of the variant")]
        quantity: Option<i64>,
        #[arg(long, conflicts_with = "quantity", help = "Look the quantity up for this product id")]
        product: Option<String>,
        #[arg(long, help = "Storefront path the widget is mounted on")]
        page: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Inspect persisted fixed-timer targets
    State(StateArgs),
    /// Show configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct StateArgs {
    #[command(subcommand)]
    action: StateAction,
}

#[derive(Subcommand)]
enum StateAction {
    List {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    Clear {
        key: Option<String>,
    },
}

#[derive(Parser)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Subcommand)]
enum ConfigAction {
    List,
    Get { key: String },
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_at(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid --at '{}', expected RFC 3339", value))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config_file {
        Some(path) => path.clone(),
        None => platform::config_path()?,
    };
    let config = config::load_or_default(&config_path)?;
    init_tracing(&config.log.filter);
    if !config_path.exists() {
        tracing::warn!("No config found at {}. Using defaults.", config_path.display());
    }

    match &cli.command {
        Commands::Preview {
            record,
            at,
            page,
            no_persist,
            format,
        } => {
            let at = at.as_deref().map(parse_at).transpose()?;
            commands::preview::preview(
                &config,
                &record.source()?,
                at,
                page.as_deref(),
                !*no_persist,
                *format,
            )?;
        }
        Commands::Watch { record, page, ticks } => {
            commands::watch::watch(&config, &record.source()?, page.as_deref(), *ticks)?;
        }
        Commands::Stock {
            record,
            variant,
            quantity,
            product,
            page,
            format,
        } => {
            let quantity = match (quantity, product) {
                (Some(quantity), _) => commands::stock::Quantity::Given(*quantity),
                (None, Some(product_id)) => commands::stock::Quantity::Inventory {
                    product_id: product_id.clone(),
                },
                (None, None) => anyhow::bail!("Pass --quantity or --product"),
            };
            commands::stock::stock(
                &config,
                &record.source()?,
                variant,
                quantity,
                page.as_deref(),
                *format,
            )?;
        }
        Commands::State(args) => match &args.action {
            StateAction::List { format } => commands::state::list(&config, *format)?,
            StateAction::Clear { key } => commands::state::clear(&config, key.as_deref())?,
        },
        Commands::Config(args) => match &args.action {
            ConfigAction::List => commands::config::list(&config)?,
            ConfigAction::Get { key } => commands::config::get(key, &config)?,
        },
    }

    Ok(())
}
