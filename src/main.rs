mod commands;
mod prompt;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "icsport")]
#[command(about = "Convert iCalendar files and import them into Google Calendar")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an .ics file into newline-delimited JSON import records
    Convert {
        /// The .ics file to convert
        file: PathBuf,

        /// Write records here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Ask for email addresses of organizers/attendees that can't be resolved
    Prepare {
        /// The .ics file to scan
        file: PathBuf,
    },
    /// Import an .ics or .jsonl file, resuming where the last run stopped
    Import {
        /// The .ics or .jsonl file to import
        file: PathBuf,

        /// Target calendar (defaults to calendar_id from config)
        #[arg(short, long)]
        calendar: Option<String>,

        /// Google account to use (defaults to account from config)
        #[arg(short, long)]
        account: Option<String>,

        /// Skip events whose iCalUID already exists in the calendar
        #[arg(long)]
        check_duplicates: bool,

        /// Keep going when an event fails to import
        #[arg(long)]
        continue_on_error: bool,
    },
    /// Forget import progress for a file, so the next import starts over
    Reset {
        /// The file whose checkpoint should be removed
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert { file, output } => commands::convert::run(&file, output.as_deref()),
        Commands::Prepare { file } => commands::prepare::run(&file),
        Commands::Import {
            file,
            calendar,
            account,
            check_duplicates,
            continue_on_error,
        } => {
            commands::import::run(commands::import::ImportArgs {
                file,
                calendar,
                account,
                check_duplicates,
                continue_on_error,
            })
            .await
        }
        Commands::Reset { file } => commands::reset::run(&file),
    }
}
