//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::delete::DeleteArgs;
use crate::commands::edit::EditArgs;
use crate::commands::list::ListArgs;
use crate::commands::start::StartArgs;

/// Work timer.
///
/// Start a named activity, stop it when done, and edit or delete the
/// recorded intervals afterwards.
#[derive(Debug, Parser)]
#[command(name = "aika", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Work in an organization's shared entries instead of personal ones.
    #[arg(long, global = true, value_name = "ORG_ID")]
    pub org: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create (or rename) the local user identity.
    Init {
        /// Display name; defaults to the host name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Start a timer for a new activity.
    Start(StartArgs),

    /// Stop the running timer.
    Stop,

    /// Show the running timer, if any.
    Status,

    /// Show the running timer's elapsed time live until interrupted.
    Watch,

    /// List recorded entries, newest first.
    List(ListArgs),

    /// Edit an entry's description or start/end time.
    Edit(EditArgs),

    /// Delete an entry.
    Delete(DeleteArgs),
}
