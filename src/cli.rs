use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fieldcal", version, about = "Terminal month calendar for field-work schedules")]
pub struct Cli {
    /// Use this calendar file instead of searching for one
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a project calendar in the current directory
    Init {
        /// Optional calendar name
        #[arg(long)]
        name: Option<String>,
    },
    /// Print a six-week month grid with event markers
    Month {
        /// Month in YYYY-MM format (defaults to the selected date's month)
        month: Option<String>,
    },
    /// List the events on one day
    Day {
        /// Date in YYYY-MM-DD format (defaults to the selected date)
        date: Option<String>,
    },
    /// Add an event
    Add {
        /// Title of the event
        title: String,
        /// Date in YYYY-MM-DD format (defaults to the selected date)
        #[arg(long)]
        date: Option<String>,
        /// Optional details
        #[arg(long, default_value = "")]
        details: String,
    },
    /// Remove an event by id
    Remove {
        /// Event id
        id: String,
    },
    /// Load events from a JSON array of {id, date, title, details}
    Import {
        /// Path to the JSON file
        path: PathBuf,
        /// Keep existing events and add the imported ones after them
        #[arg(long)]
        append: bool,
    },
    /// Launch the interactive TUI
    Tui,
}
