//! Paceline — a 12-week goal pacing and reminder engine.
//!
//! Tasks under a goal hierarchy carry a weekday schedule and a daily quota.
//! A minute-tick scheduler pushes reminders over Telegram; done/skip button
//! presses feed a progress ledger, and skips trigger redistribution of the
//! remaining target across the remaining scheduled days.

pub mod config;
pub mod db;
pub mod error;
pub mod indicators;
pub mod ledger;
mod migrations;
pub mod pacing;
pub mod redistribution;
pub mod responder;
pub mod schedule;
pub mod scheduler;
pub mod telegram;
pub mod types;

pub use error::TrackerError;
