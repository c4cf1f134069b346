//! Delete command for removing an entry.

use std::io::Write;

use aika_core::{EntryController, EntryId, EntryStore};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Entry ID (see `aika list`).
    pub id: String,
}

pub async fn run<W: Write, S: EntryStore>(
    writer: &mut W,
    controller: &mut EntryController<S>,
    args: &DeleteArgs,
) -> Result<()> {
    let id = EntryId::new(args.id.as_str())?;
    controller.delete_entry(&id).await?;
    writeln!(writer, "Deleted entry {id}")?;
    Ok(())
}
