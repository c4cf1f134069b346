//! CLI subcommand implementations.

pub mod delete;
pub mod edit;
pub mod init;
pub mod list;
pub mod start;
pub mod status;
pub mod stop;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_support;
