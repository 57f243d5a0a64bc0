//! `submit` command: one non-interactive round trip.

use std::path::PathBuf;

use anyhow::bail;
use iot_console::{Submission, SubmitState};
use serde_json::json;

use crate::render;
use crate::setup::{restore_state, save_state, Setup};

pub const EXIT_REJECTED: i32 = 2;

pub struct SubmitArgs<'a> {
    pub schema: &'a str,
    pub assignments: &'a [String],
    pub state: Option<&'a PathBuf>,
    pub json: bool,
    pub events: bool,
}

/// Returns the process exit code: 0 once the device answered, 2 when the
/// values were rejected locally.
pub async fn run_submit(setup: &Setup, instant: bool, args: SubmitArgs<'_>) -> anyhow::Result<i32> {
    let mut session = setup.session(instant);
    let store = restore_state(&mut session, args.state)?;
    if session.selected_schema().map(|schema| schema.id.as_str()) != Some(args.schema) {
        session.select_schema(args.schema)?;
    }
    for assignment in args.assignments {
        let Some((name, text)) = assignment.split_once('=') else {
            bail!("invalid assignment '{assignment}', expected NAME=VALUE");
        };
        session.set_field_text(name.trim(), text)?;
    }

    let mut events = session.subscribe();
    let submission = session.submit().await?;
    save_state(&session, store.as_ref())?;

    if args.events {
        while let Ok(event) = events.try_recv() {
            println!("{}", serde_json::to_string(&event)?);
        }
    }

    if args.json {
        let report = match &submission {
            Submission::Invalid(validation) => json!({
                "state": SubmitState::Invalid,
                "validation": validation,
            }),
            Submission::Settled { state, entry } => json!({
                "state": state,
                "entry": entry,
            }),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let lines = match &submission {
            Submission::Invalid(validation) => render::rejection(validation),
            Submission::Settled { entry, .. } => render::feedback_entry(entry),
        };
        for line in lines {
            println!("{line}");
        }
    }

    Ok(match submission {
        Submission::Invalid(_) => EXIT_REJECTED,
        Submission::Settled { .. } => 0,
    })
}
