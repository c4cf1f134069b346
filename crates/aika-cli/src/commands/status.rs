//! Status command for showing the running timer.

use std::fmt::Display;
use std::io::Write;

use aika_core::display::format_elapsed;
use aika_core::edit_text;
use aika_core::{EntryController, EntryId, EntryStore, Reconciliation};
use anyhow::Result;
use chrono::TimeZone;

pub fn run<W, S, Tz>(
    writer: &mut W,
    controller: &EntryController<S>,
    report: &Reconciliation,
    tz: &Tz,
) -> Result<()>
where
    W: Write,
    S: EntryStore,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    writeln!(writer, "Scope: {}", controller.session().scope())?;

    match (controller.current_entry_id(), controller.engine().anchor()) {
        (Some(id), Some(anchor)) => {
            writeln!(writer, "Running: {}", controller.description())?;
            writeln!(writer, "Elapsed: {}", format_elapsed(controller.elapsed()))?;
            writeln!(
                writer,
                "Started: {}",
                edit_text::format(&anchor.with_timezone(tz))
            )?;
            writeln!(writer, "Entry:   {id}")?;
        }
        _ => writeln!(writer, "No timer running.")?,
    }

    if !report.stranded.is_empty() {
        let ids: Vec<&str> = report.stranded.iter().map(EntryId::as_str).collect();
        writeln!(
            writer,
            "Warning: other open entries are ignored: {}",
            ids.join(", ")
        )?;
    }

    Ok(())
}
