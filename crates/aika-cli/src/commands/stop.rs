//! Stop command for closing the running entry.

use std::io::Write;

use aika_core::display::format_elapsed;
use aika_core::timer::elapsed_seconds;
use aika_core::{EntryController, EntryStore};
use anyhow::Result;

pub async fn run<W: Write, S: EntryStore>(
    writer: &mut W,
    controller: &mut EntryController<S>,
) -> Result<()> {
    let Some(id) = controller.stop_timer().await? else {
        writeln!(writer, "No timer running.")?;
        return Ok(());
    };

    match controller.entry(&id) {
        Some(entry) => {
            let seconds = entry
                .end_time
                .map_or(0, |end| elapsed_seconds(entry.start_time, end));
            writeln!(
                writer,
                "Stopped \"{}\" after {}",
                entry.description,
                format_elapsed(seconds)
            )?;
        }
        None => writeln!(writer, "Stopped entry {id}")?,
    }
    Ok(())
}
