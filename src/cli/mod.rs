//! CLI module - Command-line interface for Warden
//!
//! Server startup, schema migrations and user administration.

mod commands;

use clap::{Parser, Subcommand};

/// Warden - JWT-authenticated user API
#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server
    #[command(alias = "daemon", alias = "-d", alias = "--daemon")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Manage the database schema
    Migrate {
        #[command(subcommand)]
        command: MigrateCommands,
    },

    /// Manage users
    #[command(alias = "u")]
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
pub enum MigrateCommands {
    /// Apply all pending migrations
    Up,

    /// Roll back applied migrations
    Down {
        /// Number of migrations to roll back
        #[arg(long, default_value = "1")]
        steps: u32,
    },

    /// Show applied and pending migrations
    Status,

    /// Drop every table and re-apply all migrations
    Fresh,
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user
    #[command(alias = "a")]
    Add {
        name: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// List all users
    #[command(alias = "ls", alias = "l")]
    List,

    /// Delete a user
    #[command(alias = "rm", alias = "r")]
    Remove {
        name: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Set a new password
    Passwd {
        name: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Replace the user's auth key with a fresh random one
    RotateKey { name: String },

    /// Check a candidate auth key against the stored one
    VerifyKey { name: String, key: String },

    /// Check a password without issuing a token
    VerifyPassword {
        name: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
}

pub use commands::*;
