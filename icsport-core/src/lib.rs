//! Core of icsport: turn iCalendar documents into remote calendar events and
//! deliver them with resumable, idempotent batches.
//!
//! Pipeline:
//! - `ics` reads VEVENTs into [`CalendarEvent`]s
//! - `convert` maps them to [`ConvertedEvent`]s (wrapped in [`ImportRecord`]s)
//! - `interchange` stores records as newline-delimited JSON
//! - `delivery` uploads records through a [`CalendarRemote`], tracking
//!   progress in a [`CheckpointStore`]

pub mod aliases;
pub mod checkpoint;
pub mod config;
pub mod convert;
pub mod converted;
pub mod delivery;
pub mod error;
pub mod event;
pub mod ics;
pub mod identity;
pub mod interchange;
pub mod recurrence;
pub mod remote;
pub mod timezone;

pub use aliases::{AliasStore, PrepareSummary, Prompter};
pub use checkpoint::CheckpointStore;
pub use config::Settings;
pub use convert::EventConverter;
pub use converted::{Attendee, ConvertedEvent, EventDateTime, Organizer, ResponseStatus};
pub use delivery::{Delivery, DeliveryOptions, DeliveryOutcome, DeliveryStats};
pub use error::{IcsPortError, IcsPortResult};
pub use event::{CalendarEvent, Identity, SourceTime};
pub use identity::{IdentityResolver, ResolvedIdentity};
pub use interchange::{ImportMetadata, ImportRecord};
pub use recurrence::RecurrenceRule;
pub use remote::{CalendarRemote, RemoteError, RemoteEvent, RemoteResult};
