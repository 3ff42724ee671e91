//! CLI subcommands

pub mod fetch;
pub mod list;
