//! Interactive line-oriented console.

use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use iot_console::connection::ConnectionMonitor;
use iot_console::store::SessionStore;
use iot_console::{ConsoleError, ConsoleSession, Submission, SubmissionEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use crate::render;
use crate::setup::{restore_state, save_state, Setup};
use crate::style;

const PROMPT: &str = "iot> ";

struct Console {
    session: ConsoleSession,
    store: Option<SessionStore>,
    monitor: Arc<ConnectionMonitor>,
}

pub async fn run_console(
    setup: &Setup,
    instant: bool,
    state: Option<&PathBuf>,
) -> anyhow::Result<()> {
    let mut session = setup.session(instant);
    let store = restore_state(&mut session, state)?;
    let monitor = Arc::new(ConnectionMonitor::new(setup.config.connection));
    let checks = tokio::spawn({
        let monitor = Arc::clone(&monitor);
        async move { monitor.run(None).await }
    });
    let mut console = Console {
        session,
        store,
        monitor,
    };

    let interactive = std::io::stdin().is_terminal();
    if interactive {
        println!(
            "{}",
            style::accent("IoT configuration console. Type help for commands.")
        );
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if interactive {
            print!("{PROMPT}");
            std::io::stdout().flush()?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match console.execute(&line).await {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => eprintln!("{}", style::error(format!("Error: {err:#}"))),
        }
    }

    checks.abort();
    save_state(&console.session, console.store.as_ref())
}

impl Console {
    /// Run one command line; `Ok(true)` asks the loop to stop.
    async fn execute(&mut self, input: &str) -> anyhow::Result<bool> {
        let raw = input.trim();
        if raw.is_empty() {
            return Ok(false);
        }
        let cmd = raw.strip_prefix('/').unwrap_or(raw);
        let (head, rest) = cmd
            .split_once(char::is_whitespace)
            .map_or((cmd, ""), |(head, rest)| (head, rest.trim()));

        match head {
            "help" | "h" => print_lines(help_lines()),
            "schemas" => print_lines(render::schema_list(self.session.registry())),
            "select" => {
                if rest.is_empty() {
                    println!("Usage: select <message-type>");
                    return Ok(false);
                }
                let name = self.session.select_schema(rest)?.name.clone();
                self.persist()?;
                println!("{}", style::success(format!("Selected {name}.")));
            }
            "set" => {
                if rest.is_empty() {
                    println!("Usage: set <field> <value>");
                    return Ok(false);
                }
                let (name, text) = rest
                    .split_once(char::is_whitespace)
                    .map_or((rest, ""), |(name, text)| (name, text.trim()));
                self.session.set_field_text(name, text)?;
                self.persist()?;
                println!("{name} = {}", render::display_value(self.session.values().get(name)));
            }
            "show" => {
                let schema = self
                    .session
                    .selected_schema()
                    .ok_or(ConsoleError::NoSchemaSelected)?;
                print_lines(render::schema_fields(schema, &self.session.effective_values()));
            }
            "reset" => {
                self.session.reset()?;
                self.persist()?;
                println!("Values reset to defaults.");
            }
            "submit" => self.submit().await?,
            "feedback" => {
                let entries = self.session.feedback();
                if entries.is_empty() {
                    println!("No feedback yet.");
                }
                for entry in &entries {
                    print_lines(render::feedback_entry(entry));
                }
            }
            "clear" => {
                self.session.clear_feedback();
                println!("Feedback cleared.");
            }
            "status" => {
                println!("Device link: {}", self.monitor.status().as_str());
                match self.session.selected_schema() {
                    Some(schema) => println!("Message type: {} ({})", schema.name, schema.id),
                    None => println!("Message type: none"),
                }
            }
            "stats" => print_lines(stats_lines(&self.session)),
            "quit" | "exit" | "q" => return Ok(true),
            other => println!(
                "{}",
                style::warning(format!(
                    "Unknown command '{other}'. Type help for a list of commands."
                ))
            ),
        }
        Ok(false)
    }

    async fn submit(&mut self) -> anyhow::Result<()> {
        let mut events = self.session.subscribe();
        let (submission, announced) = {
            let submit = self.session.submit();
            let announce = announce_dispatch(&mut events);
            tokio::pin!(submit, announce);
            tokio::select! {
                result = &mut submit => (result, false),
                () = &mut announce => (submit.await, true),
            }
        };
        if !announced {
            while let Ok(event) = events.try_recv() {
                print_dispatch_notice(&event);
            }
        }
        match submission? {
            Submission::Invalid(validation) => print_lines(render::rejection(&validation)),
            Submission::Settled { entry, .. } => print_lines(render::feedback_entry(&entry)),
        }
        Ok(())
    }

    fn persist(&self) -> anyhow::Result<()> {
        save_state(&self.session, self.store.as_ref())
    }
}

/// Resolves once the orchestrator reports that the payload left for the device.
async fn announce_dispatch(events: &mut broadcast::Receiver<SubmissionEvent>) {
    while let Ok(event) = events.recv().await {
        if print_dispatch_notice(&event) {
            return;
        }
    }
}

fn print_dispatch_notice(event: &SubmissionEvent) -> bool {
    let started = matches!(event, SubmissionEvent::DispatchStarted { .. });
    if started {
        println!("Sending configuration...");
    }
    started
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

fn help_lines() -> Vec<String> {
    [
        "schemas                 list message types",
        "select <id>             choose a message type (loads its defaults)",
        "set <field> <value>     enter a field value",
        "show                    show fields and current values",
        "reset                   restore the defaults",
        "submit                  validate and send to the device",
        "feedback                list device feedback, newest first",
        "clear                   clear the feedback list",
        "status                  device link and selection",
        "stats                   submission counters",
        "quit                    leave the console",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn stats_lines(session: &ConsoleSession) -> Vec<String> {
    let metrics = session.metrics();
    let mut lines = vec![
        format!(
            "submissions: {} (success {}, device errors {}, channel failures {}, rejected {})",
            metrics.submissions,
            metrics.success,
            metrics.device_error,
            metrics.channel_failure,
            metrics.invalid
        ),
        format!(
            "dispatch ms: min {:.0} avg {:.0} max {:.0} last {:.0}",
            metrics.dispatch.min_ms,
            metrics.dispatch.avg_ms,
            metrics.dispatch.max_ms,
            metrics.dispatch.last_ms
        ),
    ];
    lines.extend(
        metrics
            .per_schema
            .iter()
            .map(|(id, count)| format!("  {id}: {count}")),
    );
    lines
}
