//! CLI definitions for iot-console.

use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "iot-console",
    version,
    about = "Schema-driven IoT device configuration console",
    infer_subcommands = true,
    after_help = "Examples:\n  iot-console                                  # interactive console\n  iot-console schemas\n  iot-console show power\n  iot-console submit sensor-config --set sensorId=TEMP_07\n  iot-console check-config --config ./console.toml"
)]
pub struct Cli {
    /// Show debug logging.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    /// Console configuration file (defaults to ./console.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Message type catalog (TOML); the built-in catalog is used otherwise.
    #[arg(long, global = true)]
    pub schemas: Option<PathBuf>,
    /// Skip the simulated device latency.
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub instant: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the available message types.
    Schemas {
        /// Print the catalog as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Describe the fields of one message type.
    Show {
        /// Message type id.
        schema: String,
    },
    /// Submit one configuration and print the device feedback.
    #[command(
        after_help = "Exit codes:\n  0  the device answered (any outcome)\n  1  usage or configuration error\n  2  rejected locally by validation"
    )]
    Submit {
        /// Message type id.
        schema: String,
        /// Field assignment `name=value` (repeatable).
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,
        /// Persisted session file to restore from and save to.
        #[arg(long)]
        state: Option<PathBuf>,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
        /// Print lifecycle events as JSON lines.
        #[arg(long)]
        events: bool,
    },
    /// Interactive line-oriented console (default).
    Console {
        /// Persisted session file to restore from and save to.
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Validate configuration and catalog files.
    CheckConfig,
    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}
