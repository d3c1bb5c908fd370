//! Runtime configuration, read from the environment.
//!
//! Everything has a sensible default except the bot token: without
//! `PACELINE_TELEGRAM_TOKEN` the process still runs, it just drops outbound
//! messages and receives nothing.

use std::path::PathBuf;

use chrono_tz::Tz;

use crate::error::TrackerError;

const DEFAULT_TZ: Tz = chrono_tz::UTC;

#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token; `None` disables the channel.
    pub telegram_token: Option<String>,
    /// Database file override; defaults to `~/.paceline/paceline.db`.
    pub db_path: Option<PathBuf>,
    /// Timezone reminders are evaluated in.
    pub timezone: Tz,
    /// Chat ids to pre-register as recipients at startup.
    pub bootstrap_chat_ids: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, TrackerError> {
        let telegram_token = non_empty(std::env::var("PACELINE_TELEGRAM_TOKEN").ok());
        let db_path = non_empty(std::env::var("PACELINE_DB").ok()).map(PathBuf::from);

        let timezone = match non_empty(std::env::var("PACELINE_TZ").ok()) {
            Some(name) => name.parse::<Tz>().map_err(|_| {
                TrackerError::InvalidConfiguration(format!("Invalid timezone: {}", name))
            })?,
            None => DEFAULT_TZ,
        };

        let bootstrap_chat_ids = non_empty(std::env::var("PACELINE_CHAT_IDS").ok())
            .map(|ids| {
                ids.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            telegram_token,
            db_path,
            timezone,
            bootstrap_chat_ids,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
