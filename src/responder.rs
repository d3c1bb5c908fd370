//! Inbound response handling: the done/skip state machine.
//!
//! A pressed control resolves to exactly one ledger write, an acknowledgment
//! toast, a follow-up message, and an edit that disables the original
//! controls. Re-presses are prevented by the disabled-control edit, not by
//! server-side state; the upsert makes a raced duplicate harmless anyway.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::sync::mpsc;

use crate::db::TrackerDb;
use crate::error::TrackerError;
use crate::indicators;
use crate::ledger;
use crate::pacing;
use crate::telegram::{
    pick_encouragement, pick_warning, BotCommand, ControlAction, ControlPress, InboundEvent,
    InlineKeyboard, MessageHandle, Messenger,
};
use crate::types::Period;

pub struct Responder {
    db_path: PathBuf,
    messenger: Arc<dyn Messenger>,
    tz: Tz,
}

impl Responder {
    pub fn new(db_path: PathBuf, messenger: Arc<dyn Messenger>, tz: Tz) -> Self {
        Self {
            db_path,
            messenger,
            tz,
        }
    }

    /// Consume inbound events until the channel closes.
    pub async fn run(&self, mut rx: mpsc::Receiver<InboundEvent>) {
        log::info!("Responder started");
        while let Some(event) = rx.recv().await {
            let result = match event {
                InboundEvent::Press(press) => self.handle_press(press).await,
                InboundEvent::Start { chat_id, username } => {
                    self.handle_start(&chat_id, username.as_deref()).await
                }
                InboundEvent::Command { command, chat_id } => {
                    self.handle_command(command, &chat_id).await
                }
            };
            if let Err(e) = result {
                log::warn!("Failed to handle inbound event: {}", e);
            }
        }
        log::info!("Responder stopped: inbound channel closed");
    }

    async fn handle_press(&self, press: ControlPress) -> Result<(), TrackerError> {
        let db = TrackerDb::open_at(&self.db_path)?;
        let payload = press.payload;

        let outcome = match payload.action {
            ControlAction::Done => {
                ledger::record_completion(&db, payload.task_id, payload.date, None)
            }
            ControlAction::Skip => {
                let today = Utc::now().with_timezone(&self.tz).date_naive();
                ledger::record_skip(&db, payload.task_id, payload.date, today)
            }
        };

        if let Err(e) = outcome {
            log::warn!(
                "Ledger write failed for task {} on {}: {}",
                payload.task_id,
                payload.date,
                e
            );
            self.messenger
                .answer_callback(&press.callback_id, "Something went wrong, try again.")
                .await?;
            return Ok(());
        }

        // Keep the presser's recipient row fresh, same upsert as /start.
        if let Err(e) = db.upsert_recipient(&press.chat_id, press.username.as_deref()) {
            log::warn!("Failed to refresh recipient {}: {}", press.chat_id, e);
        }

        let (toast, follow_up, resolved_label) = match payload.action {
            ControlAction::Done => ("Logged ✅", pick_encouragement(), "Done ✅"),
            ControlAction::Skip => ("Skipped", pick_warning(), "Skipped ❌"),
        };

        self.messenger
            .answer_callback(&press.callback_id, toast)
            .await?;
        self.messenger
            .send_message(&press.chat_id, follow_up, None)
            .await?;

        let handle = MessageHandle {
            chat_id: press.chat_id,
            message_id: press.message_id,
        };
        self.messenger
            .edit_reply_markup(&handle, &InlineKeyboard::resolved(resolved_label))
            .await?;

        Ok(())
    }

    async fn handle_start(
        &self,
        chat_id: &str,
        username: Option<&str>,
    ) -> Result<(), TrackerError> {
        let db = TrackerDb::open_at(&self.db_path)?;
        let recipient = db.upsert_recipient(chat_id, username)?;
        log::info!(
            "Recipient registered: chat {} ({})",
            recipient.chat_id,
            recipient.username.as_deref().unwrap_or("no username")
        );

        self.messenger
            .send_message(
                chat_id,
                "You're in! 🎯 You'll get a reminder for every scheduled task. \
                 Answer with the buttons to log your progress.",
                None,
            )
            .await?;
        Ok(())
    }

    async fn handle_command(
        &self,
        command: BotCommand,
        chat_id: &str,
    ) -> Result<(), TrackerError> {
        let db = TrackerDb::open_at(&self.db_path)?;
        let today = Utc::now().with_timezone(&self.tz).date_naive();

        let text = match db.active_period()? {
            Some(period) => match command {
                BotCommand::Today => build_today_text(&db, &period, today)?,
                BotCommand::Week => build_week_text(&db, &period, today)?,
                BotCommand::Progress => build_progress_text(&db, &period)?,
            },
            None => "No active period. Create one to start tracking.".to_string(),
        };

        self.messenger.send_message(chat_id, &text, None).await?;
        Ok(())
    }
}

/// `/hoje`: today's scheduled tasks with their status, quota, and banked
/// progress against the pro-rata expectation.
fn build_today_text(
    db: &TrackerDb,
    period: &Period,
    today: NaiveDate,
) -> Result<String, TrackerError> {
    let mut lines = vec![format!("📅 <b>{}</b>", today.format("%A, %d %b"))];
    let mut scheduled = 0;

    for task in db.tasks_for_period(period.id)? {
        if !task.weekdays.is_active_on(today) {
            continue;
        }
        scheduled += 1;

        let status = match db.get_log(task.id, today)? {
            Some(log) if log.completed => "✅",
            Some(_) => "❌",
            None => "⬜",
        };
        let mut line = format!("{} {}", status, task.title);
        if let Some(quota) = task.daily_target {
            let unit = task.unit.as_deref().unwrap_or("");
            line.push_str(&format!(" — {:.1} {}", quota, unit));
        }
        if let Some(expected) = pacing::expected_progress(&task, period, today) {
            let banked = db.max_progress(task.id)?;
            line.push_str(&format!(" ({:.1} done, {:.1} expected)", banked, expected));
        }
        lines.push(line);
    }

    if scheduled == 0 {
        lines.push("Nothing scheduled today.".to_string());
    }
    Ok(lines.join("\n"))
}

/// `/semana`: current-week pace, days remaining, and the week-by-week chart.
fn build_week_text(
    db: &TrackerDb,
    period: &Period,
    today: NaiveDate,
) -> Result<String, TrackerError> {
    let summary = indicators::period_summary(db, period, today)?;
    let chart = indicators::weekly_chart(db, period.id)?;

    let mut text = format!(
        "📊 <b>{}</b> — week {} of 12, {} days remaining\n\
         This week: {:.0}% done\nOverall: {:.0}% of target\n",
        summary.period_name,
        summary.current_week,
        summary.days_remaining,
        summary.lead_percent,
        summary.lag_percent
    );

    for (i, pct) in chart
        .iter()
        .enumerate()
        .take(usize::from(summary.current_week))
    {
        let filled = ((pct / 10.0).round() as usize).min(10);
        text.push_str(&format!(
            "\nW{:02} {}{} {:.0}%",
            i + 1,
            "▰".repeat(filled),
            "▱".repeat(10 - filled),
            pct
        ));
    }
    Ok(text)
}

/// `/progresso`: per-goal lag breakdown plus the period-wide mean.
fn build_progress_text(db: &TrackerDb, period: &Period) -> Result<String, TrackerError> {
    let goals = indicators::goals_progress(db, period.id)?;
    if goals.is_empty() {
        return Ok("No goals yet.".to_string());
    }

    let overall = indicators::lag_indicator(db, period.id)?;
    let mut lines = vec![format!("🎯 <b>Progress</b> — {:.0}% overall", overall)];
    for goal in goals {
        let plural = if goal.task_count == 1 { "task" } else { "tasks" };
        lines.push(format!(
            "• {} — {:.0}% ({} {})",
            goal.title, goal.lag_percent, goal.task_count, plural
        ));
    }
    Ok(lines.join("\n"))
}
