//! List command for showing recorded entries.

use std::fmt::Display;
use std::io::Write;

use aika_core::display::format_duration;
use aika_core::edit_text;
use aika_core::{EntryController, EntryStore, TimeEntry};
use anyhow::Result;
use chrono::TimeZone;
use clap::Args;

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W, S, Tz>(
    writer: &mut W,
    controller: &EntryController<S>,
    args: &ListArgs,
    tz: &Tz,
) -> Result<()>
where
    W: Write,
    S: EntryStore,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let entries = controller.entries();

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(entries)?)?;
        return Ok(());
    }

    if entries.is_empty() {
        writeln!(writer, "No work logs yet. Start tracking your time!")?;
        return Ok(());
    }

    let shared = controller.session().scope().is_shared();
    for entry in entries {
        write_line(writer, entry, controller, shared, tz)?;
    }
    Ok(())
}

fn write_line<W, S, Tz>(
    writer: &mut W,
    entry: &TimeEntry,
    controller: &EntryController<S>,
    shared: bool,
    tz: &Tz,
) -> Result<()>
where
    W: Write,
    S: EntryStore,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let start = edit_text::format(&entry.start_time.with_timezone(tz));
    let duration = format_duration(entry.start_time, entry.end_time);
    write!(
        writer,
        "{}  {start:<19}  {duration:>11}  {}",
        entry.id, entry.description
    )?;
    if shared {
        if entry.created_by == controller.session().user {
            write!(writer, " (You)")?;
        } else {
            write!(writer, " ({})", entry.created_by)?;
        }
    }
    writeln!(writer)?;
    Ok(())
}
