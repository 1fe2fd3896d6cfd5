use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dss",
    about = "Delegated Slot Store: storage layouts, slot derivation and upgradeable delegation",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Router configuration (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the planned layout of a sample module
    Layout(LayoutArgs),
    /// Derive mapping, nested mapping and array element slots
    Slot(SlotArgs),
    /// Run a scripted scenario
    Demo(DemoArgs),
    /// Save or verify owner snapshots
    Snapshot(SnapshotArgs),
    /// Show the effective router configuration
    Config,
}

#[derive(Args)]
pub struct LayoutArgs {
    /// Module label; all sample modules when omitted
    pub module: Option<String>,
    /// Compare against another module's layout
    #[arg(long)]
    pub against: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum KeyType {
    Address,
    Uint,
    Bool,
    Bytes32,
}

#[derive(Args)]
pub struct SlotArgs {
    #[command(subcommand)]
    pub action: SlotAction,
}

#[derive(Subcommand)]
pub enum SlotAction {
    /// keccak256(pad32(key) || base)
    Mapping {
        /// Base slot (decimal or 0x hex)
        #[arg(long, default_value = "0")]
        base: String,
        key: String,
        #[arg(long, value_enum, default_value = "address")]
        key_type: KeyType,
    },
    /// keccak256(pad32(inner) || keccak256(pad32(outer) || base))
    Nested {
        #[arg(long, default_value = "0")]
        base: String,
        outer: String,
        inner: String,
        #[arg(long, value_enum, default_value = "address")]
        outer_type: KeyType,
        #[arg(long, value_enum, default_value = "address")]
        inner_type: KeyType,
    },
    /// keccak256(base) + index
    Array {
        #[arg(long, default_value = "0")]
        base: String,
        index: String,
    },
}

#[derive(Args)]
pub struct DemoArgs {
    #[command(subcommand)]
    pub scenario: Demo,
}

#[derive(Subcommand, Clone, Copy)]
pub enum Demo {
    /// Counter v1 upgraded to v2 with data preserved
    Upgrade,
    /// Rebinding to a module that overwrites the binding slot
    Broken,
    /// Receive/fallback routing across handler sets (fallback outranks receive)
    Fallback,
    /// Slot packing by declaration order
    Packing,
    /// Mapping and nested mapping entry slots
    Mapping,
}

#[derive(Args)]
pub struct SnapshotArgs {
    #[command(subcommand)]
    pub action: SnapshotAction,
}

#[derive(Subcommand)]
pub enum SnapshotAction {
    /// Deploy a sample counter, drive it, and save its snapshot
    Save {
        path: PathBuf,
        #[arg(long, default_value = "counter-v1")]
        module: String,
        #[arg(short = 'n', long, default_value = "3")]
        increments: u64,
    },
    /// Load a snapshot, check its digest and import it
    Verify { path: PathBuf },
}
