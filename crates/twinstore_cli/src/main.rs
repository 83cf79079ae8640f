//! Operator CLI over `twinstore_core`.
//!
//! # Responsibility
//! - Provide a smoke probe for core linkage (`ping`).
//! - List and inspect customers from either store using the same read
//!   routing the service layer uses.
//!
//! Store locations and the primary kind come from the `TWINSTORE_*`
//! environment variables. Output is JSON on stdout; errors go to stderr with
//! exit code 1.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use twinstore_core::{AppConfig, CustomerPublic, StoreHandles};

/// Inspect customers kept in the relational and document stores.
#[derive(Debug, Parser)]
#[command(name = "twinstore_cli")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Command {
    /// Check that the core library links and report its version.
    Ping,
    /// List customers as their public projection.
    Customers {
        /// Store to read from: `secondary` or a backend name.
        #[arg(long)]
        storage: Option<String>,
        /// Include soft-deleted customers.
        #[arg(long)]
        all: bool,
    },
    /// Show one customer as its public projection.
    Customer {
        id: String,
        /// Store to read from: `secondary` or a backend name.
        #[arg(long)]
        storage: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), String> {
    if command == Command::Ping {
        println!("twinstore_core ping={}", twinstore_core::ping());
        println!("twinstore_core version={}", twinstore_core::core_version());
        return Ok(());
    }

    let config = AppConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        twinstore_core::init_logging(&config.log_level, log_dir)?;
    }
    let handles = StoreHandles::open(&config.sqlite_path, &config.document_path, config.primary)
        .map_err(|err| err.to_string())?;
    let customers = handles.customers().map_err(|err| err.to_string())?;
    let policy = handles.read_policy();
    log::info!(
        "event=cli_command module=cli status=start primary={}",
        policy.primary()
    );

    match command {
        Command::Ping => Ok(()),
        Command::Customers { storage, all } => {
            let source = policy.resolve(storage.as_deref());
            let records = if all {
                customers.admin_get(source)
            } else {
                customers.get(source)
            }
            .map_err(|err| err.to_string())?;
            let public: Vec<CustomerPublic> = records.iter().map(|c| c.to_public()).collect();
            print_json(&public)
        }
        Command::Customer { id, storage } => {
            let source = policy.resolve(storage.as_deref());
            let customer = customers
                .get_one(&id, source)
                .map_err(|err| err.to_string())?;
            print_json(&customer.to_public())
        }
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_listing_with_storage_hint() {
        let cli =
            Cli::try_parse_from(["twinstore_cli", "customers", "--storage", "mongo", "--all"])
                .unwrap();
        assert_eq!(
            cli.command,
            Command::Customers {
                storage: Some("mongo".to_string()),
                all: true,
            }
        );
    }

    #[test]
    fn parses_single_customer_lookup() {
        let cli = Cli::try_parse_from(["twinstore_cli", "customer", "abc"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Customer {
                id: "abc".to_string(),
                storage: None,
            }
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(Cli::try_parse_from(["twinstore_cli"]).is_err());
        assert!(Cli::try_parse_from(["twinstore_cli", "customer"]).is_err());
        assert!(Cli::try_parse_from(["twinstore_cli", "customers", "--storage"]).is_err());
        assert!(Cli::try_parse_from(["twinstore_cli", "customers", "--verbose"]).is_err());
        assert!(Cli::try_parse_from(["twinstore_cli", "customer", "abc", "--all"]).is_err());
        assert_eq!(
            Cli::try_parse_from(["twinstore_cli", "ping"]).unwrap().command,
            Command::Ping
        );
    }
}
