//! Start command for opening a new entry.

use std::io::Write;

use aika_core::{EntryController, EntryStore};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct StartArgs {
    /// What you are working on.
    #[arg(required = true, num_args = 1..)]
    words: Vec<String>,
}

impl StartArgs {
    /// The description, with the words joined by single spaces.
    pub fn description(&self) -> String {
        self.words.join(" ")
    }
}

pub async fn run<W: Write, S: EntryStore>(
    writer: &mut W,
    controller: &mut EntryController<S>,
    args: &StartArgs,
) -> Result<()> {
    let entry = controller.start_timer(&args.description()).await?;
    writeln!(writer, "Started \"{}\" ({})", entry.description, entry.id)?;
    Ok(())
}
