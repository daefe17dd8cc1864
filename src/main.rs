mod cli;
mod commands;
mod logging;
mod ui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    if let Ok(dir) = fieldcal::storage::global_data_dir() {
        logging::init(&dir);
    }
    let file = args.file;
    let command = args.command.unwrap_or(cli::Command::Tui);
    match command {
        cli::Command::Init { name } => commands::init(name),
        cli::Command::Month { month } => commands::month(file, month),
        cli::Command::Day { date } => commands::day(file, date),
        cli::Command::Add {
            title,
            date,
            details,
        } => commands::add(file, title, date, details),
        cli::Command::Remove { id } => commands::remove(file, id),
        cli::Command::Import { path, append } => commands::import(file, &path, append),
        cli::Command::Tui => commands::tui(file),
    }
}
