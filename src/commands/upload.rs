use std::collections::BTreeSet;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use owo_colors::OwoColorize;

use bday_core::{compare, Config, DuplicatePolicy, Event, RemoteEvent, Signature};
use bday_provider_google::CalendarApi;

use crate::render;
use crate::utils::tui;

/// Reconcile, show the plan, confirm, then apply it.
///
/// There is no rollback: a failure mid-batch leaves the operations already
/// applied in place, and the next run starts from the new remote state.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    api: &CalendarApi,
    file_events: &[Event],
    remote_events: &[Event],
    config: &Config,
    force: bool,
    yes: bool,
    today: NaiveDate,
) -> Result<()> {
    let result = compare(file_events, remote_events, DuplicatePolicy::Fail)?;

    println!("---------------------------------");
    render::print_reconciliation(
        &result,
        file_events.len(),
        remote_events.len(),
        config.verbose,
        today,
    );
    println!("---------------------------------");

    let generated_at = Utc::now();

    if force {
        println!(
            "{}",
            format!(
                "Performing force upload.\n\
                 All events in '{}' will be deleted and replaced with events from the file.",
                config.calendar_name
            )
            .yellow()
        );

        let deletions: Vec<RemoteEvent> = remote_events
            .iter()
            .filter_map(|event| event.remote_payload().cloned())
            .collect();
        let creations = file_events
            .iter()
            .map(|event| event.to_remote(generated_at))
            .collect::<Result<Vec<_>, _>>()?;

        api.delete_events(&deletions).await?;
        api.create_events(&creations).await?;
        println!("{}", "Events uploaded successfully!".green());
        return Ok(());
    }

    if !result.has_changes() {
        println!(
            "{}",
            "No differences found. Nothing to upload.".green()
        );
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "{} events will be deleted,\n{} events will be updated,\n{} events will be created.",
            result.remote_only.len(),
            result.updated.len(),
            result.file_only.len(),
        )
        .yellow()
    );
    if !yes {
        println!(
            "{}",
            "Do you want to upload events from the file to Google Calendar?".yellow()
        );
        if !tui::confirm()? {
            println!("{}", "Upload cancelled.".yellow());
            return Ok(());
        }
    }

    // Pair each updated signature with exactly one event on each side. The
    // duplicate checks above make anything else unreachable; refuse to guess
    // if it happens anyway.
    let mut updates = Vec::new();
    for updated in &result.updated {
        let signature = updated.signature();
        let file_matches: Vec<&Event> = file_events
            .iter()
            .filter(|event| event.signature() == signature)
            .collect();
        let remote_matches: Vec<&Event> = remote_events
            .iter()
            .filter(|event| event.signature() == signature)
            .collect();
        if file_matches.len() != 1 || remote_matches.len() != 1 {
            bail!(
                "'{}' matches {} file event(s) and {} remote event(s), updating is not possible",
                signature,
                file_matches.len(),
                remote_matches.len()
            );
        }

        let remote_id = remote_matches[0]
            .remote_payload()
            .and_then(|payload| payload.id.clone())
            .with_context(|| format!("Remote event '{}' has no id", signature))?;
        let mut payload = file_matches[0].to_remote(generated_at)?;
        payload.id = Some(remote_id);
        updates.push(payload);
    }

    let remote_only: BTreeSet<Signature> =
        result.remote_only.iter().map(|e| e.signature()).collect();
    let deletions: Vec<RemoteEvent> = remote_events
        .iter()
        .filter(|event| remote_only.contains(&event.signature()))
        .filter_map(|event| event.remote_payload().cloned())
        .collect();

    let file_only: BTreeSet<Signature> =
        result.file_only.iter().map(|e| e.signature()).collect();
    let creations = file_events
        .iter()
        .filter(|event| file_only.contains(&event.signature()))
        .map(|event| event.to_remote(generated_at))
        .collect::<Result<Vec<_>, _>>()?;

    api.delete_events(&deletions).await?;
    api.update_events(&updates).await?;
    api.create_events(&creations).await?;
    println!("{}", "Events uploaded successfully!".green());
    Ok(())
}
