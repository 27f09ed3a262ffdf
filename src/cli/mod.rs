//! CLI module for the user cache
//!
//! Provides admin subcommands that build the cache and store from
//! configuration, run one operation, and print JSON to stdout:
//! - `health`: ping the cache and the store
//! - `user`: read and write users through the cache coordinator

pub mod health;
pub mod user;

use clap::{Parser, Subcommand};
use serde::Serialize;

/// User cache - cache-aside user store administration
#[derive(Parser)]
#[command(name = "user-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check cache and store connectivity
    Health,

    /// Manage users
    #[command(subcommand)]
    User(user::UserCommand),
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
