//! Batch delivery of converted events to a remote calendar.
//!
//! Records are delivered one at a time, in order. After every confirmed
//! delivery the checkpoint is moved to that record's index, so an interrupted
//! run can be resumed without creating anything twice.

use crate::checkpoint::CheckpointStore;
use crate::converted::ConvertedEvent;
use crate::error::{IcsPortError, IcsPortResult};
use crate::interchange::ImportRecord;
use crate::remote::{CalendarRemote, RemoteError, RemoteEvent, RemoteResult};

pub const DEFAULT_MAX_SEQUENCE_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOptions {
    /// Look each event up by iCalUID before creating it
    pub check_duplicates: bool,
    /// Skip failed events instead of stopping the run
    pub continue_on_error: bool,
    /// Attempts for the fetch-increment-submit cycle
    pub max_sequence_retries: u32,
}

impl Default for DeliveryOptions {
    fn default() -> Self {
        DeliveryOptions {
            check_duplicates: false,
            continue_on_error: false,
            max_sequence_retries: DEFAULT_MAX_SEQUENCE_RETRIES,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryStats {
    pub succeeded: usize,
    pub duplicates_skipped: usize,
    pub resumed: usize,
    pub failed: usize,
}

impl DeliveryStats {
    pub fn total(&self) -> usize {
        self.succeeded + self.duplicates_skipped + self.resumed + self.failed
    }
}

/// What happened to a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// At or before the checkpoint; nothing sent
    Resumed,
    /// Already on the remote (duplicate check)
    Duplicate,
    Created,
    /// Identifier already existed; the remote copy was overwritten
    Updated,
    /// A modified occurrence replaced its slot in the series
    Rescheduled,
    Failed(RemoteError),
}

type ProgressFn<'a> = Box<dyn FnMut(usize, &ImportRecord, &DeliveryOutcome) + 'a>;

pub struct Delivery<'a, R: CalendarRemote> {
    remote: &'a R,
    checkpoint: &'a CheckpointStore,
    options: DeliveryOptions,
    on_progress: Option<ProgressFn<'a>>,
}

impl<'a, R: CalendarRemote> Delivery<'a, R> {
    pub fn new(remote: &'a R, checkpoint: &'a CheckpointStore, options: DeliveryOptions) -> Self {
        Delivery {
            remote,
            checkpoint,
            options,
            on_progress: None,
        }
    }

    /// Called once per record, after it has been handled.
    pub fn with_progress(
        mut self,
        f: impl FnMut(usize, &ImportRecord, &DeliveryOutcome) + 'a,
    ) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Deliver `records` in order, skipping indices `<= resume_from`.
    ///
    /// In the default mode the first failure stops the run with
    /// [`IcsPortError::DeliveryStopped`]. With `continue_on_error` failures are
    /// counted and the run goes on, but the checkpoint stays at the last index
    /// confirmed before the first failure.
    pub async fn deliver(
        &mut self,
        records: &[ImportRecord],
        resume_from: Option<usize>,
    ) -> IcsPortResult<DeliveryStats> {
        let mut stats = DeliveryStats::default();
        let mut checkpoint_frozen = false;

        if let Some(k) = resume_from {
            log::info!("Resuming after event #{}", k);
        }

        for (index, record) in records.iter().enumerate() {
            if resume_from.is_some_and(|k| index <= k) {
                stats.resumed += 1;
                self.report(index, record, &DeliveryOutcome::Resumed);
                continue;
            }

            match self.deliver_one(record).await {
                Ok(outcome) => {
                    if outcome == DeliveryOutcome::Duplicate {
                        stats.duplicates_skipped += 1;
                    } else {
                        stats.succeeded += 1;
                    }
                    if !checkpoint_frozen {
                        self.checkpoint.save(index)?;
                    }
                    self.report(index, record, &outcome);
                }
                Err(err) => {
                    log::error!(
                        "Failed to deliver event #{} '{}' ({}): {}",
                        index,
                        record.metadata.original_summary,
                        record.event.ical_uid,
                        err
                    );
                    if let Some(hint) = diagnose(&err) {
                        log::error!("{}", hint);
                    }
                    self.report(index, record, &DeliveryOutcome::Failed(err.clone()));

                    if !self.options.continue_on_error {
                        return Err(IcsPortError::DeliveryStopped {
                            index,
                            ical_uid: record.event.ical_uid.clone(),
                            source: err,
                        });
                    }
                    stats.failed += 1;
                    checkpoint_frozen = true;
                }
            }
        }

        if stats.failed == 0 {
            self.checkpoint.clear()?;
            log::info!("All events delivered, checkpoint removed");
        } else {
            log::warn!(
                "{} events failed; checkpoint kept at the last index confirmed before the first failure",
                stats.failed
            );
        }

        Ok(stats)
    }

    async fn deliver_one(&self, record: &ImportRecord) -> RemoteResult<DeliveryOutcome> {
        let event = &record.event;

        if self.options.check_duplicates {
            let existing = self.remote.find_by_ical_uid(&event.ical_uid).await?;
            if let Some(copy) = existing.iter().find(|e| e.is_copy_of(event)) {
                log::debug!("{} already exists as {}", event.ical_uid, copy.id);
                return Ok(DeliveryOutcome::Duplicate);
            }
        }

        if record.metadata.is_recurrence_exception {
            return self.deliver_exception(event).await;
        }

        match self.remote.create(event).await {
            Ok(created) => {
                log::debug!("Created {} as {}", event.ical_uid, created.id);
                if record.needs_recurrence_update() {
                    self.remote.update(&created.id, event).await?;
                }
                Ok(DeliveryOutcome::Created)
            }
            Err(err) if err.is_duplicate_identifier() => {
                let existing = self.remote.find_by_ical_uid(&event.ical_uid).await?;
                let Some(target) = existing.into_iter().find(|e| e.is_copy_of(event)) else {
                    return Err(err);
                };
                if !target.can_be_replaced_by(event) {
                    return Err(RemoteError::new(
                        err.status,
                        format!(
                            "{} already exists as {} with a different recurrence shape; not overwriting it",
                            event.ical_uid, target.id
                        ),
                    ));
                }
                log::debug!(
                    "{} already exists as {}, updating it instead",
                    event.ical_uid,
                    target.id
                );
                update_with_sequence_retry(
                    self.remote,
                    &target.id,
                    event,
                    self.options.max_sequence_retries,
                )
                .await?;
                Ok(DeliveryOutcome::Updated)
            }
            Err(err) => Err(err),
        }
    }

    /// Write a modified occurrence over its slot in the already delivered series.
    ///
    /// An exception shares its iCalUID with the series master, so it is never
    /// created on its own: the occurrence is looked up through the master and
    /// replaced.
    async fn deliver_exception(&self, event: &ConvertedEvent) -> RemoteResult<DeliveryOutcome> {
        let Some(original_start) = event.original_start_time.as_ref() else {
            return Err(RemoteError::new(
                None,
                format!("Modified occurrence of {} has no original start time", event.ical_uid),
            ));
        };

        let existing = self.remote.find_by_ical_uid(&event.ical_uid).await?;
        let Some(series) = existing
            .iter()
            .find(|e| e.recurring && e.original_start_time.is_none())
        else {
            return Err(RemoteError::new(
                None,
                format!(
                    "Series {} is not on the remote calendar; its master event must be delivered first",
                    event.ical_uid
                ),
            ));
        };

        let Some(instance) = self.remote.find_instance(&series.id, original_start).await? else {
            return Err(RemoteError::new(
                None,
                format!("Series {} has no occurrence at {}", event.ical_uid, original_start),
            ));
        };

        log::debug!(
            "Replacing occurrence {} of {} ({})",
            instance.id,
            event.ical_uid,
            original_start
        );
        update_with_sequence_retry(
            self.remote,
            &instance.id,
            event,
            self.options.max_sequence_retries,
        )
        .await?;
        Ok(DeliveryOutcome::Rescheduled)
    }

    fn report(&mut self, index: usize, record: &ImportRecord, outcome: &DeliveryOutcome) {
        if let Some(f) = self.on_progress.as_mut() {
            f(index, record, outcome);
        }
    }
}

/// Update `id`, coordinating on the remote's revision counter.
///
/// Each attempt fetches the current counter (absent counts as 0) and submits
/// counter + 1. Sequence conflicts are retried until `max_attempts` attempts
/// have been made; the last conflict is returned then. Any other error is
/// returned immediately.
pub async fn update_with_sequence_retry<R: CalendarRemote>(
    remote: &R,
    id: &str,
    event: &ConvertedEvent,
    max_attempts: u32,
) -> RemoteResult<RemoteEvent> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let current = remote.fetch_sequence(id).await?.unwrap_or(0);

        match remote.update_with_sequence(id, event, current + 1).await {
            Ok(updated) => return Ok(updated),
            Err(err) if err.is_sequence_conflict() && attempt < max_attempts => {
                log::warn!(
                    "Sequence conflict updating {} (attempt {}/{}), retrying",
                    id,
                    attempt,
                    max_attempts
                );
            }
            Err(err) => return Err(err),
        }
    }
}

/// A hint for the user about what usually causes `err`.
pub fn diagnose(err: &RemoteError) -> Option<&'static str> {
    if err.is_bad_request() {
        Some(
            "The event was rejected as malformed. Check its start/end times, time zone names and recurrence rule.",
        )
    } else if err.is_permission_denied() {
        Some(
            "Access was denied. Check that the session is still valid and that the account can write to the target calendar.",
        )
    } else {
        None
    }
}
