//! hwwatch — homework review status watcher.
//!
//! Single Rust binary. Polls the Practicum review API on a fixed interval,
//! renders status changes as human-readable chat lines, and forwards them to
//! a Telegram chat. One sequential loop; the interesting parts are the error
//! taxonomy and the once-per-streak failure reporting.
//!
//! See `DESIGN.md` for the full design notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod logging;
pub mod practicum;
pub mod status;
pub mod telegram;
pub mod watcher;
