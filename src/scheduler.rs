//! Minute-tick reminder scheduler.
//!
//! Stateless between ticks: every minute it asks the store which tasks are
//! due right now (active period, scheduled weekday, reminder time equals the
//! current minute, no ledger entry yet today) and pushes a reminder with
//! done/skip controls to every registered recipient. A tick that fails or is
//! missed is lost, not retried; the next day's reminder is the catch-up.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::db::TrackerDb;
use crate::error::TrackerError;
use crate::indicators;
use crate::telegram::{InlineKeyboard, Messenger};
use crate::types::TaskContext;

/// Pause between messages to consecutive recipients.
const INTER_MESSAGE_DELAY_MS: u64 = 250;

pub struct ReminderScheduler {
    db_path: PathBuf,
    messenger: Arc<dyn Messenger>,
    tz: Tz,
}

impl ReminderScheduler {
    pub fn new(db_path: PathBuf, messenger: Arc<dyn Messenger>, tz: Tz) -> Self {
        Self {
            db_path,
            messenger,
            tz,
        }
    }

    /// Run forever, ticking once per wall-clock minute.
    pub async fn run(&self) {
        log::info!("Reminder scheduler started ({})", self.tz);
        loop {
            tokio::time::sleep(until_next_minute()).await;

            let now_local = Utc::now().with_timezone(&self.tz);
            let today = now_local.date_naive();
            let minute = now_local.time();

            if let Err(e) = self.tick(today, minute).await {
                log::warn!("Reminder tick failed: {}", e);
            }
        }
    }

    /// One tick: dispatch reminders for every task due at `minute` on `today`.
    ///
    /// Per-task and per-recipient failures are logged and skipped; one bad
    /// task or recipient never aborts the rest of the batch.
    pub async fn tick(&self, today: NaiveDate, minute: NaiveTime) -> Result<(), TrackerError> {
        let db = TrackerDb::open_at(&self.db_path)?;

        let due = db.due_reminder_tasks(today, minute)?;
        if due.is_empty() {
            return Ok(());
        }

        let recipients = db.active_recipients()?;
        if recipients.is_empty() {
            log::debug!("{} task(s) due but no recipients registered", due.len());
            return Ok(());
        }

        log::info!(
            "Dispatching {} reminder(s) to {} recipient(s)",
            due.len(),
            recipients.len()
        );

        for ctx in due {
            let text = match build_reminder_text(&db, &ctx, today) {
                Ok(t) => t,
                Err(e) => {
                    log::warn!("Skipping reminder for task {}: {}", ctx.task.id, e);
                    continue;
                }
            };
            let keyboard = InlineKeyboard::reminder_controls(ctx.task.id, today);

            for recipient in &recipients {
                match self
                    .messenger
                    .send_message(&recipient.chat_id, &text, Some(&keyboard))
                    .await
                {
                    Ok(handle) => {
                        if let Err(e) = db.record_dispatch(
                            &handle.chat_id,
                            &handle.message_id,
                            ctx.task.id,
                            today,
                        ) {
                            log::warn!("Failed to record dispatch: {}", e);
                        }
                    }
                    Err(e) => {
                        log::warn!(
                            "Dispatch to {} failed for task {}: {}",
                            recipient.chat_id,
                            ctx.task.id,
                            e
                        );
                    }
                }
                tokio::time::sleep(Duration::from_millis(INTER_MESSAGE_DELAY_MS)).await;
            }
        }

        Ok(())
    }

}

fn build_reminder_text(
    db: &TrackerDb,
    ctx: &TaskContext,
    today: NaiveDate,
) -> Result<String, TrackerError> {
    let mut text = format!(
        "⏰ <b>{}</b>\n{} → {}",
        ctx.task.title, ctx.goal_title, ctx.tactic_title
    );

    if let Some(quota) = ctx.task.daily_target {
        let unit = ctx.task.unit.as_deref().unwrap_or("");
        text.push_str(&format!("\n\nToday: {:.1} {}", quota, unit));
    }

    if let Some(total) = ctx.task.total_target {
        let progress = db.max_progress(ctx.task.id)?;
        text.push_str(&format!("\nProgress: {:.1} / {:.1}", progress, total));
    }

    let week = ctx.period.week_number(today);
    let lead = indicators::lead_indicator(db, ctx.period.id, week)?;
    text.push_str(&format!("\nWeek {}: {:.0}% on pace", week, lead));

    Ok(text)
}

/// Duration until the next wall-clock minute boundary.
fn until_next_minute() -> Duration {
    let now = Utc::now();
    let seconds_into_minute = now.second() as u64;
    let subsec = now.timestamp_subsec_millis() as u64;
    let elapsed_ms = seconds_into_minute * 1000 + subsec;
    Duration::from_millis(60_000 - elapsed_ms.min(59_999))
}
