//! `check-config` command.

use std::path::Path;

use iot_console::config::DEFAULT_CONFIG_FILE;
use iot_console::{ConsoleConfig, SchemaRegistry};

use crate::style;

pub fn run_check(config: Option<&Path>, schemas: Option<&Path>) -> anyhow::Result<()> {
    let config_path = config.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    if config.is_some() || config_path.is_file() {
        let loaded = ConsoleConfig::load(config_path)?;
        println!(
            "{}",
            style::success(format!(
                "{}: ok ({} scenarios, feedback capacity {})",
                config_path.display(),
                loaded.simulation.scenarios.len(),
                loaded.feedback_capacity
            ))
        );
    } else {
        println!("{}: not found, using defaults", config_path.display());
    }

    let registry = match schemas {
        Some(path) => {
            let registry = SchemaRegistry::load(path)?;
            println!(
                "{}",
                style::success(format!(
                    "{}: ok ({} message types)",
                    path.display(),
                    registry.len()
                ))
            );
            registry
        }
        None => SchemaRegistry::builtin()?,
    };
    if registry.is_empty() {
        println!("{}", style::warning("Warning: catalog defines no message types"));
    }
    Ok(())
}
