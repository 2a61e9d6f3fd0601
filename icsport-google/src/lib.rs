//! Google Calendar remote for icsport.
//!
//! Credentials live under `~/.config/icsport/google/`:
//!   app_config.toml          OAuth client id and secret
//!   session/<account>.toml   access/refresh tokens per account

pub mod app_config;
pub mod calendar;
pub mod google_event;
pub mod session;

pub use calendar::{DEFAULT_CALENDAR_ID, GoogleCalendar};
pub use google_event::ToGoogle;
