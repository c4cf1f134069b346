//! Work timer CLI library.
//!
//! This crate provides the `aika` command-line interface over the timer
//! controller and its SQLite store.

mod cli;
pub mod commands;
mod config;
pub mod identity;

pub use cli::{Cli, Commands};
pub use config::Config;
