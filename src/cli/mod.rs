//! Command-line surface.

mod commands;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::db::MovementType;
use crate::transfer::ImportMode;

pub use commands::execute;

pub const DATA_DIR_ENV: &str = "WATCHDRIFT_HOME";
pub const DATABASE_FILE: &str = "watchdrift.sqlite3";
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Parser)]
#[command(
    name = "watchdrift",
    about = "Track how many seconds a day your watches gain or lose",
    version
)]
pub struct Cli {
    /// Directory holding the database and settings.
    /// Defaults to $WATCHDRIFT_HOME, then the platform data directory.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Register, inspect and edit watches.
    Watch {
        #[command(subcommand)]
        action: WatchCommand,
    },

    /// Record what the watch dial shows right now.
    Measure {
        /// Watch id or name.
        watch: String,

        /// Dial reading as HH:MM or HH:MM:SS (24-hour).
        time: String,

        /// Start a new tracking period with this reading.
        #[arg(long)]
        baseline: bool,
    },

    /// Start a new tracking period, e.g. after setting the watch.
    Baseline {
        /// Watch id or name.
        watch: String,

        /// Dial reading as HH:MM or HH:MM:SS (24-hour).
        time: String,
    },

    /// List measurements, newest first, with drift since their baseline.
    History {
        /// Watch id or name.
        watch: String,

        /// Show at most this many entries.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Rate, trend and confidence for the current tracking period.
    Stats {
        /// Watch id or name.
        watch: String,
    },

    /// Chart series for the current tracking period.
    Chart {
        /// Watch id or name.
        watch: String,
    },

    /// Remove a single measurement by id.
    DeleteMeasurement {
        id: String,
    },

    /// Write every watch and measurement as JSON.
    Export {
        /// Output file; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load a file produced by `export`.
    Import {
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = ImportModeArg::Merge)]
        mode: ImportModeArg,
    },

    /// Delete every watch and measurement.
    Reset {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },

    /// Show the reference-time settings and where captures get their time.
    Settings,
}

#[derive(Debug, Subcommand)]
pub enum WatchCommand {
    /// Register a watch.
    Add {
        name: String,

        #[arg(long)]
        brand: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long, value_enum, default_value_t = MovementArg::Automatic)]
        movement: MovementArg,
    },

    /// All watches with their current rate.
    List,

    /// One watch with its full statistics.
    Show {
        /// Watch id or name.
        watch: String,
    },

    /// Change watch details.
    Edit {
        /// Watch id or name.
        watch: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, conflicts_with = "clear_brand")]
        brand: Option<String>,

        #[arg(long, conflicts_with = "clear_model")]
        model: Option<String>,

        #[arg(long, value_enum)]
        movement: Option<MovementArg>,

        #[arg(long)]
        clear_brand: bool,

        #[arg(long)]
        clear_model: bool,
    },

    /// Delete a watch and all of its measurements.
    Remove {
        /// Watch id or name.
        watch: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MovementArg {
    Automatic,
    Manual,
    Quartz,
}

impl From<MovementArg> for MovementType {
    fn from(arg: MovementArg) -> Self {
        match arg {
            MovementArg::Automatic => MovementType::Automatic,
            MovementArg::Manual => MovementType::Manual,
            MovementArg::Quartz => MovementType::Quartz,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImportModeArg {
    /// Keep existing data, skip anything already present.
    Merge,
    /// Delete everything before importing.
    Replace,
}

impl From<ImportModeArg> for ImportMode {
    fn from(arg: ImportModeArg) -> Self {
        match arg {
            ImportModeArg::Merge => ImportMode::Merge,
            ImportModeArg::Replace => ImportMode::Replace,
        }
    }
}

/// `--data-dir`, else `$WATCHDRIFT_HOME`, else `<data dir>/watchdrift`.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }

    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    dirs::data_dir()
        .map(|dir| dir.join("watchdrift"))
        .ok_or_else(|| anyhow!("no data directory found; pass --data-dir or set {DATA_DIR_ENV}"))
}
