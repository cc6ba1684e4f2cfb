//! CLI - Command-line argument parsing
//!
//! Defines the CLI structure using clap. Keeps argument parsing
//! separate from execution logic.

use clap::{Parser, Subcommand};

/// Dao tracker CLI
#[derive(Parser)]
#[command(name = "daoctl")]
#[command(about = "Dao Tracker - Cultivation-themed practice tracking", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Data directory (overrides $DAOTRACK_DATA_DIR and the config file)
    #[arg(long, global = true)]
    pub data_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// List all cultivation paths
    Paths,

    /// Begin a new cultivation path
    Begin {
        /// Name of the pursuit (e.g. "Calligraphy")
        dao_name: String,
    },

    /// Show one path: realm, state, densities, time on path
    Show {
        /// Path id or dao name
        path: String,
    },

    /// Log a practiced day for today
    Log {
        /// Path id or dao name
        path: String,

        /// Practice duration in minutes
        #[arg(long)]
        minutes: Option<u32>,
    },

    /// Log an explicit rest day for today
    Rest {
        /// Path id or dao name
        path: String,
    },

    /// Practice history: density, trend, and the day grid
    History {
        /// Path id or dao name
        path: String,

        /// Trailing window in days
        #[arg(long, default_value_t = 90)]
        window: u32,
    },

    /// Attempt a breakthrough to the next stage
    Breakthrough {
        /// Path id or dao name
        path: String,
    },

    /// Delete a path (its practice records are kept)
    Remove {
        /// Path id or dao name
        path: String,
    },

    /// Seed the default paths into an empty store
    Seed,
}
