//! CLI entrypoint for the IoT configuration console.

#[path = "iot-console/catalog.rs"]
mod catalog;
#[path = "iot-console/check.rs"]
mod check;
#[path = "iot-console/cli.rs"]
mod cli;
#[path = "iot-console/completions.rs"]
mod completions;
#[path = "iot-console/console.rs"]
mod console;
#[path = "iot-console/render.rs"]
mod render;
#[path = "iot-console/setup.rs"]
mod setup;
#[path = "iot-console/style.rs"]
mod style;
#[path = "iot-console/submit.rs"]
mod submit;

use clap::Parser;

use cli::{Cli, Command};
use setup::Setup;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{}", style::error(format!("Error: {err:#}")));
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Some(Command::CheckConfig) => {
            check::run_check(cli.config.as_deref(), cli.schemas.as_deref())?;
            return Ok(0);
        }
        Some(Command::Completions { shell }) => {
            completions::run_completions(shell)?;
            return Ok(0);
        }
        _ => {}
    }

    let setup = Setup::load(cli.config.as_deref(), cli.schemas.as_deref())?;
    setup.init_logging(cli.verbose);

    match cli.command {
        Some(Command::Schemas { json }) => catalog::run_schemas(&setup.registry, json)?,
        Some(Command::Show { schema }) => catalog::run_show(&setup.registry, &schema)?,
        Some(Command::Submit {
            schema,
            set,
            state,
            json,
            events,
        }) => {
            return submit::run_submit(
                &setup,
                cli.instant,
                submit::SubmitArgs {
                    schema: &schema,
                    assignments: &set,
                    state: state.as_ref(),
                    json,
                    events,
                },
            )
            .await;
        }
        Some(Command::Console { state }) => {
            console::run_console(&setup, cli.instant, state.as_ref()).await?;
        }
        None => console::run_console(&setup, cli.instant, None).await?,
        Some(Command::CheckConfig | Command::Completions { .. }) => {}
    }
    Ok(0)
}
