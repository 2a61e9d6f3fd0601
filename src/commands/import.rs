use std::path::PathBuf;

use anyhow::{Context, Result};
use icsport_core::delivery::diagnose;
use icsport_core::{CheckpointStore, Delivery, DeliveryOutcome, IcsPortError, Settings};
use icsport_google::GoogleCalendar;
use owo_colors::OwoColorize;

use crate::commands::load_records;
use crate::render;
use crate::utils::tui::{create_progress_bar, create_spinner};

pub struct ImportArgs {
    pub file: PathBuf,
    pub calendar: Option<String>,
    pub account: Option<String>,
    pub check_duplicates: bool,
    pub continue_on_error: bool,
}

pub async fn run(args: ImportArgs) -> Result<()> {
    let settings = Settings::load()?;

    let account = args
        .account
        .or_else(|| settings.account.clone())
        .context(
            "No Google account configured.\n\n\
            Pass --account <email> or set `account` in the icsport config file.",
        )?;
    let calendar_id = args
        .calendar
        .unwrap_or_else(|| settings.calendar_id.clone());

    let mut options = settings.delivery_options();
    options.check_duplicates |= args.check_duplicates;
    options.continue_on_error |= args.continue_on_error;

    let records = load_records(&args.file, &settings)?;
    log::debug!("Loaded {} records from {}", records.len(), args.file.display());
    let checkpoint = CheckpointStore::for_document(&args.file);
    let resume_from = checkpoint.load()?;

    if let Some(k) = resume_from {
        println!(
            "Resuming {} after event #{} (run `icsport reset` to start over)",
            args.file.display(),
            k
        );
    }

    let spinner = create_spinner(format!("Connecting to {}", calendar_id));
    let remote = GoogleCalendar::connect(&account, &calendar_id).await;
    spinner.finish_and_clear();
    let remote = remote.with_context(|| format!("Failed to connect to Google as {}", account))?;

    let bar = create_progress_bar(records.len() as u64);
    let result = Delivery::new(&remote, &checkpoint, options)
        .with_progress(|index, record, outcome| {
            bar.set_position(index as u64 + 1);
            bar.set_message(record.metadata.original_summary.clone());
            if let DeliveryOutcome::Failed(err) = outcome {
                bar.println(format!(
                    "   {} #{} {}: {}",
                    "✗".red(),
                    index,
                    record.metadata.original_summary,
                    err.to_string().red()
                ));
                if let Some(hint) = diagnose(err) {
                    bar.println(format!("     {}", hint.dimmed()));
                }
            }
        })
        .deliver(&records, resume_from)
        .await;
    bar.finish_and_clear();

    let stats = match result {
        Ok(stats) => stats,
        Err(IcsPortError::DeliveryStopped {
            index,
            ical_uid,
            source,
        }) => {
            anyhow::bail!(
                "Import stopped at event #{} ({}): {}\n\n\
                Fix the problem and run the same command again to resume, \
                or pass --continue-on-error to skip failing events.",
                index,
                ical_uid,
                source
            );
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", render::render_stats(&stats));
    if stats.failed > 0 {
        println!(
            "{}",
            format!(
                "Progress is kept in {}; later runs retry from the first failure.",
                checkpoint.path().display()
            )
            .yellow()
        );
    }

    Ok(())
}
