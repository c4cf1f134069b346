//! Edit command for changing an entry's description or times.
//!
//! Times are given in the edit representation (`MM/DD/YYYY h:mm AM|PM`) in
//! the local time zone. Text that does not parse leaves the stored value in
//! place.

use std::io::Write;

use aika_core::edit_text;
use aika_core::{EntryController, EntryId, EntryPatch, EntryStore};
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use clap::Args;

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Entry ID (see `aika list`).
    pub id: String,

    /// New description.
    #[arg(long)]
    pub description: Option<String>,

    /// New start time, e.g. "03/05/2024 9:30 AM".
    #[arg(long)]
    pub start: Option<String>,

    /// New end time. Ignored for an entry that is still running.
    #[arg(long)]
    pub end: Option<String>,
}

pub async fn run<W, S, Tz>(
    writer: &mut W,
    controller: &mut EntryController<S>,
    args: &EditArgs,
    tz: &Tz,
) -> Result<()>
where
    W: Write,
    S: EntryStore,
    Tz: TimeZone,
{
    let id = EntryId::new(args.id.as_str())?;
    let entry = controller
        .entry(&id)
        .cloned()
        .with_context(|| format!("No entry with ID {id}"))?;

    let mut patch = EntryPatch {
        description: args
            .description
            .clone()
            .filter(|description| *description != entry.description),
        ..EntryPatch::default()
    };

    if let Some(text) = &args.start {
        let start = parse_time(writer, "start", text, entry.start_time, tz)?;
        if start != entry.start_time {
            patch.start_time = Some(start);
        }
    }

    if let Some(text) = &args.end {
        match entry.end_time {
            Some(end) => {
                let parsed = parse_time(writer, "end", text, end, tz)?;
                if parsed != end {
                    patch.end_time = Some(Some(parsed));
                }
            }
            None => writeln!(
                writer,
                "Warning: entry {id} is still running; stop it before editing its end time"
            )?,
        }
    }

    if patch.is_empty() {
        writeln!(writer, "Nothing to change.")?;
        return Ok(());
    }

    controller.update_entry(&id, &patch).await?;
    writeln!(writer, "Updated entry {id}")?;
    Ok(())
}

/// Reads edit text against the stored instant, viewed in `tz`.
fn parse_time<W, Tz>(
    writer: &mut W,
    field: &str,
    text: &str,
    stored: DateTime<Utc>,
    tz: &Tz,
) -> Result<DateTime<Utc>>
where
    W: Write,
    Tz: TimeZone,
{
    if let Err(err) = edit_text::validate(text) {
        tracing::warn!(field, text, %err, "ignoring malformed edit text");
        writeln!(
            writer,
            "Warning: ignoring {field} time {text:?} ({err}); expected MM/DD/YYYY h:mm AM|PM"
        )?;
    }
    let local = stored.with_timezone(tz);
    Ok(edit_text::parse(text, &local).with_timezone(&Utc))
}
