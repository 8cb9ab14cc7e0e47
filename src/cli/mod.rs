use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::application::WatchService;
use crate::domain::{
    AddressView, DisplayBalance, MultiAddressView, TransactionView, format_btc, format_signed_btc,
    signed_to_base_unit, to_base_unit,
};
use crate::explorer::{ClientConfig, DEFAULT_BASE_URL, ExplorerClient, LedgerClient};
use crate::telemetry::{LogFormat, TelemetryConfig, init_tracing};

/// satwatch - Bitcoin address watch lists
#[derive(Parser)]
#[command(name = "satwatch")]
#[command(about = "Watch Bitcoin addresses and look up their balances and history")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "SATWATCH_DB", default_value = "satwatch.db")]
    pub database: String,

    /// Explorer API base URL
    #[arg(long, env = "SATWATCH_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_url: String,

    /// Per-request explorer timeout in seconds
    #[arg(long, env = "SATWATCH_TIMEOUT_SECS", default_value = "10")]
    pub timeout_secs: u64,

    /// Owner of the watch list
    #[arg(short, long, env = "SATWATCH_USER", default_value = "default", global = true)]
    pub user: String,

    /// Print the normalized JSON payload instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log format on stderr
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Watch-list management commands
    #[command(subcommand)]
    Address(AddressCommands),

    /// Show balance and recent transactions for a watched address
    Show {
        /// Watched address
        address: String,

        /// Maximum number of transactions (explorer caps this at 50)
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Number of transactions to skip
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Combined balances and transactions across all watched addresses
    Portfolio {
        /// Maximum number of transactions
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Number of transactions to skip
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Show balances for all watched addresses
    Balances,

    /// Show the explorer's current chain tip
    Status,

    /// Export the watch list or live balances
    Export {
        /// What to export: addresses, balances
        #[arg(default_value = "addresses")]
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json (json only applies to addresses)
        #[arg(short, long, default_value = "csv")]
        format: String,
    },

    /// Import addresses from CSV or JSON
    Import {
        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Format: csv, json
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Validate without importing
        #[arg(long)]
        dry_run: bool,

        /// Skip addresses that are already watched
        #[arg(long)]
        skip_duplicates: bool,
    },
}

#[derive(Subcommand)]
pub enum AddressCommands {
    /// Start watching an address
    Add {
        /// Bitcoin address
        address: String,

        /// Human-readable label
        #[arg(short, long)]
        label: Option<String>,
    },

    /// List watched addresses
    List,

    /// Set or clear the label of a watched address
    Label {
        /// Watched address
        address: String,

        /// New label (omit to clear)
        label: Option<String>,
    },

    /// Stop watching an address
    Remove {
        /// Watched address
        address: String,
    },
}

impl Cli {
    fn client(&self) -> Result<Arc<dyn LedgerClient>> {
        let client = ExplorerClient::new(ClientConfig {
            base_url: self.api_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        })?;
        Ok(Arc::new(client))
    }

    pub async fn run(self) -> Result<()> {
        init_tracing(TelemetryConfig {
            log_format: self.log_format,
            ..TelemetryConfig::default().verbose(self.verbose)
        })?;

        let client = self.client()?;

        if matches!(self.command, Commands::Init) {
            WatchService::init(&self.database, client).await?;
            println!("Database initialized: {}", self.database);
            return Ok(());
        }

        let service = WatchService::connect(&self.database, client)
            .await
            .with_context(|| {
                format!(
                    "Cannot open database '{}'. Run 'satwatch init' first",
                    self.database
                )
            })?;
        let user = self.user.as_str();
        let json = self.json;

        match self.command {
            Commands::Init => {}

            Commands::Address(cmd) => run_address_command(&service, user, cmd).await?,

            Commands::Show {
                address,
                limit,
                offset,
            } => {
                let view = service.address_view(user, &address, limit, offset).await?;
                if json {
                    print_json(&view)?;
                } else {
                    print_address_view(&view);
                }
            }

            Commands::Portfolio { limit, offset } => {
                let view = service.portfolio_view(user, limit, offset).await?;
                if json {
                    print_json(&view)?;
                } else {
                    print_portfolio(&view);
                }
            }

            Commands::Balances => run_balances_command(&service, user, json).await?,

            Commands::Status => {
                let status = service.status().await?;
                if json {
                    print_json(&status)?;
                } else {
                    println!("Height: {}", status.height);
                    println!("Hash:   {}", status.hash);
                    println!("Time:   {}", status.timestamp);
                }
            }

            Commands::Export {
                export_type,
                output,
                format,
            } => run_export_command(&service, user, &export_type, output, &format).await?,

            Commands::Import {
                input,
                format,
                dry_run,
                skip_duplicates,
            } => {
                run_import_command(&service, user, input, &format, dry_run, skip_duplicates)
                    .await?
            }
        }

        Ok(())
    }
}

async fn run_address_command(
    service: &WatchService,
    user: &str,
    cmd: AddressCommands,
) -> Result<()> {
    match cmd {
        AddressCommands::Add { address, label } => {
            let entry = service.register_address(user, &address, label).await?;
            match &entry.label {
                Some(label) => println!("Watching {} ({})", entry.address, label),
                None => println!("Watching {}", entry.address),
            }
        }

        AddressCommands::List => {
            let addresses = service.list_addresses(user).await?;
            if addresses.is_empty() {
                println!("No watched addresses.");
            } else {
                println!("{:<64} {:<20} {:<10}", "ADDRESS", "LABEL", "ADDED");
                println!("{}", "-".repeat(96));
                for entry in addresses {
                    println!(
                        "{:<64} {:<20} {:<10}",
                        entry.address,
                        truncate(entry.label.as_deref().unwrap_or("-"), 20),
                        entry.created_at.format("%Y-%m-%d")
                    );
                }
            }
        }

        AddressCommands::Label { address, label } => {
            let entry = service.relabel_address(user, &address, label).await?;
            match &entry.label {
                Some(label) => println!("Labeled {} as '{}'", entry.address, label),
                None => println!("Cleared label of {}", entry.address),
            }
        }

        AddressCommands::Remove { address } => {
            service.remove_address(user, &address).await?;
            println!("Stopped watching {}", address.trim());
        }
    }
    Ok(())
}

async fn run_balances_command(service: &WatchService, user: &str, json: bool) -> Result<()> {
    let balances = service.balances_view(user).await?;
    if json {
        return print_json(&balances);
    }

    if balances.is_empty() {
        println!("No watched addresses.");
        return Ok(());
    }

    println!("{:<64} {:>18} {:>8}", "ADDRESS", "BALANCE (BTC)", "TXS");
    println!("{}", "-".repeat(92));
    for (address, balance) in &balances {
        match balance {
            Some(b) => println!(
                "{:<64} {:>18} {:>8}",
                address,
                format_display(b.final_balance),
                b.transaction_count
            ),
            None => println!("{:<64} {:>18} {:>8}", address, "unknown", "-"),
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &WatchService,
    user: &str,
    export_type: &str,
    output: Option<String>,
    format: &str,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create '{}'", path))?,
        ),
        None => Box::new(stdout()),
    };

    let exporter = Exporter::new(service, user);
    let count = match (export_type, format) {
        ("addresses", "csv") => exporter.export_addresses_csv(writer).await?,
        ("addresses", "json") => exporter.export_json(writer).await?.addresses.len(),
        ("balances", "csv") => exporter.export_balances_csv(writer).await?,
        _ => anyhow::bail!(
            "Unsupported export '{}' as '{}'. Use: addresses (csv, json), balances (csv)",
            export_type,
            format
        ),
    };

    if let Some(path) = output {
        eprintln!("Exported {} entries to {}", count, path);
    }
    Ok(())
}

async fn run_import_command(
    service: &WatchService,
    user: &str,
    input: Option<String>,
    format: &str,
    dry_run: bool,
    skip_duplicates: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{Read, stdin};

    let reader: Box<dyn Read> = match &input {
        Some(path) => {
            Box::new(File::open(path).with_context(|| format!("Failed to open '{}'", path))?)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions {
        dry_run,
        skip_duplicates,
    };
    let importer = Importer::new(service, user);
    let result = match format {
        "csv" => importer.import_addresses_csv(reader, options).await?,
        "json" => importer.import_json(reader, options).await?,
        other => anyhow::bail!("Unsupported import format '{}'. Use: csv, json", other),
    };

    let verb = if dry_run { "Validated" } else { "Imported" };
    println!(
        "{} {} addresses ({} skipped, {} errors)",
        verb,
        result.imported,
        result.skipped,
        result.errors.len()
    );
    for err in &result.errors {
        match &err.field {
            Some(field) => eprintln!("  line {}: {}: {}", err.line, field, err.error),
            None => eprintln!("  line {}: {}", err.line, err.error),
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_balance(balance: &DisplayBalance) {
    println!("  Balance:        {} BTC", format_display(balance.final_balance));
    println!("  Total received: {} BTC", format_display(balance.total_received));
    println!("  Total sent:     {} BTC", format_display(balance.total_sent));
    println!("  Transactions:   {}", balance.transaction_count);
}

fn print_address_view(view: &AddressView) {
    println!("Address: {}", view.address);
    print_balance(&view.balance);
    println!();
    print_transactions(&view.transactions);
}

fn print_portfolio(view: &MultiAddressView) {
    if view.addresses.is_empty() {
        println!("No watched addresses.");
        return;
    }
    for entry in &view.addresses {
        println!("Address: {}", entry.address);
        print_balance(&entry.balance);
    }
    println!();
    print_transactions(&view.transactions);
}

fn print_transactions(transactions: &[TransactionView]) {
    if transactions.is_empty() {
        println!("No transactions.");
        return;
    }

    println!(
        "{:<19} {:<16} {:>18} {:>7}  {}",
        "TIME", "HASH", "NET (BTC)", "CONF", "DIRECTION"
    );
    println!("{}", "-".repeat(76));
    for tx in transactions {
        let time = DateTime::from_timestamp(tx.timestamp, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let net_sats = signed_to_base_unit(tx.net_amount);
        let confirmations = if tx.is_confirmed() {
            tx.confirmations.to_string()
        } else {
            "pending".to_string()
        };
        println!(
            "{:<19} {:<16} {:>18} {:>7}  {:?}",
            time,
            truncate(&tx.hash, 16),
            format_signed_btc(net_sats),
            confirmations,
            tx.direction
        );
    }
}

/// Render a BTC display value with fixed 8 decimals.
fn format_display(btc: f64) -> String {
    format_btc(to_base_unit(btc))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
