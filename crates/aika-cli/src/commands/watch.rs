//! Watch command for a live elapsed-time display.

use std::future::Future;
use std::io::Write;

use aika_core::display::format_elapsed;
use aika_core::{EntryController, EntryStore};
use anyhow::Result;

/// Redraws the running timer's elapsed time on every change until `shutdown`
/// resolves.
pub async fn run<W, S, F>(writer: &mut W, controller: &EntryController<S>, shutdown: F) -> Result<()>
where
    W: Write,
    S: EntryStore,
    F: Future<Output = ()>,
{
    if !controller.is_running() {
        writeln!(writer, "No timer running.")?;
        return Ok(());
    }

    writeln!(writer, "{}", controller.description())?;
    let mut rx = controller.subscribe();
    let elapsed = *rx.borrow_and_update();
    write!(writer, "\r{}", format_elapsed(elapsed))?;
    writer.flush()?;

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let elapsed = *rx.borrow_and_update();
                write!(writer, "\r{}", format_elapsed(elapsed))?;
                writer.flush()?;
            }
        }
    }

    writeln!(writer)?;
    Ok(())
}
