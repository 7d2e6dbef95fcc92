pub mod ops;

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::Address;

#[derive(Parser)]
#[command(name = "layer")]
#[command(about = "Smart-account platform CLI", long_about = None)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "layer.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CastFlavor {
    M1,
    Flashloan,
    Beta,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy the platform into a fresh database
    Init {
        #[arg(long)]
        master: Address,
    },
    /// Create an account for an owner
    Build {
        #[arg(long)]
        owner: Address,
        #[arg(long, default_value_t = 1)]
        version: u64,
        /// Caller; defaults to the owner
        #[arg(long)]
        sender: Option<Address>,
        /// Attribution address; defaults to the sender
        #[arg(long)]
        origin: Option<Address>,
    },
    /// Run a spell batch on an account
    Cast {
        #[arg(long)]
        account: Address,
        #[arg(long)]
        sender: Address,
        /// JSON array of {"connector", "method", "args"}
        #[arg(long)]
        spells: String,
        #[arg(long, default_value_t = 0)]
        value: u64,
        #[arg(long)]
        origin: Option<Address>,
        #[arg(long, value_enum, default_value_t = CastFlavor::M1)]
        flavor: CastFlavor,
    },
    /// Add an auth through the auth connector
    Enable {
        #[arg(long)]
        account: Address,
        #[arg(long)]
        sender: Address,
        #[arg(long)]
        user: Address,
    },
    /// Remove an auth through the auth connector
    Disable {
        #[arg(long)]
        account: Address,
        #[arg(long)]
        sender: Address,
        #[arg(long)]
        user: Address,
    },
    /// Platform summary and state root
    Status,
    /// Linked-list view of an owner or an account
    Links {
        #[arg(long)]
        owner: Option<Address>,
        #[arg(long)]
        account: Option<Address>,
    },
    /// Print ledger logs as JSON lines
    Logs {
        #[arg(long)]
        last: Option<usize>,
    },
    /// Connectors bound to a version
    Connectors {
        #[arg(long, default_value_t = 1)]
        version: u64,
    },
}
