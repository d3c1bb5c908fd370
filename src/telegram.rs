//! Telegram Bot API client: outbound reminders with inline response
//! controls, plus a long-polling inbound stream of button presses.
//!
//! Uses reqwest against `https://api.telegram.org/bot<token>`. The
//! [`Messenger`] trait is the seam the scheduler and responder talk through,
//! so tests can swap in a recording fake and a missing token degrades to a
//! no-op channel instead of a crash.

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::TrackerError;

/// Identifies a dispatched message for later editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHandle {
    pub chat_id: String,
    pub message_id: String,
}

/// One inline button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

/// Telegram's inline keyboard layout: rows of buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    /// The two-control row attached to every reminder.
    pub fn reminder_controls(task_id: i64, date: NaiveDate) -> Self {
        Self {
            inline_keyboard: vec![vec![
                InlineButton {
                    text: "Done ✅".to_string(),
                    callback_data: CallbackPayload::encode(ControlAction::Done, task_id, date),
                },
                InlineButton {
                    text: "Skip ❌".to_string(),
                    callback_data: CallbackPayload::encode(ControlAction::Skip, task_id, date),
                },
            ]],
        }
    }

    /// Replace every button with a single disabled label after a press.
    pub fn resolved(label: &str) -> Self {
        Self {
            inline_keyboard: vec![vec![InlineButton {
                text: label.to_string(),
                callback_data: "noop".to_string(),
            }]],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Done,
    Skip,
}

/// The wire format of a control press: `done_{task_id}_{date}` or
/// `skip_{task_id}_{date}`, date in ISO `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackPayload {
    pub action: ControlAction,
    pub task_id: i64,
    pub date: NaiveDate,
}

impl CallbackPayload {
    pub fn encode(action: ControlAction, task_id: i64, date: NaiveDate) -> String {
        let verb = match action {
            ControlAction::Done => "done",
            ControlAction::Skip => "skip",
        };
        format!("{}_{}_{}", verb, task_id, date.format("%Y-%m-%d"))
    }

    /// Parse a callback payload. Returns `None` for the disabled-control
    /// sentinel ("noop") and anything else malformed.
    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.splitn(3, '_');
        let action = match parts.next()? {
            "done" => ControlAction::Done,
            "skip" => ControlAction::Skip,
            _ => return None,
        };
        let task_id = parts.next()?.parse().ok()?;
        let date = NaiveDate::parse_from_str(parts.next()?, "%Y-%m-%d").ok()?;
        Some(Self {
            action,
            task_id,
            date,
        })
    }
}

/// A button press with enough context to answer and edit the source message.
#[derive(Debug, Clone)]
pub struct ControlPress {
    pub payload: CallbackPayload,
    pub callback_id: String,
    pub chat_id: String,
    pub message_id: String,
    pub username: Option<String>,
}

/// Query commands a chat can send alongside button presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// `/hoje` — today's scheduled tasks with their status and quota.
    Today,
    /// `/semana` — current week's pace summary and the weekly chart.
    Week,
    /// `/progresso` — per-goal progress toward target.
    Progress,
}

impl BotCommand {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "/hoje" => Some(BotCommand::Today),
            "/semana" => Some(BotCommand::Week),
            "/progresso" => Some(BotCommand::Progress),
            _ => None,
        }
    }
}

/// Inbound events from the channel.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// A reminder control was pressed.
    Press(ControlPress),
    /// `/start` from a chat that wants reminders.
    Start {
        chat_id: String,
        username: Option<String>,
    },
    /// A query command from a chat.
    Command {
        command: BotCommand,
        chat_id: String,
    },
}

/// Outbound messaging seam.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageHandle, TrackerError>;

    async fn edit_reply_markup(
        &self,
        handle: &MessageHandle,
        keyboard: &InlineKeyboard,
    ) -> Result<(), TrackerError>;

    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), TrackerError>;
}

// ---------------------------------------------------------------------------
// Telegram API client
// ---------------------------------------------------------------------------

pub struct TelegramApi {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Deserialize)]
struct Update {
    update_id: i64,
    callback_query: Option<CallbackQuery>,
    message: Option<IncomingMessage>,
}

#[derive(Deserialize)]
struct CallbackQuery {
    id: String,
    data: Option<String>,
    from: TelegramUser,
    message: Option<IncomingMessage>,
}

#[derive(Deserialize)]
struct IncomingMessage {
    message_id: i64,
    chat: Chat,
    text: Option<String>,
    from: Option<TelegramUser>,
}

#[derive(Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Deserialize)]
struct TelegramUser {
    username: Option<String>,
}

impl TelegramApi {
    pub fn new(token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("https://api.telegram.org/bot{}", token),
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, TrackerError> {
        let url = format!("{}/{}", self.base_url, method);
        let resp = self.client.post(&url).json(body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(TrackerError::Channel(format!(
                "Telegram API error {}: {}",
                status, text
            )));
        }

        let parsed: ApiResponse<T> = resp.json().await?;
        if !parsed.ok {
            return Err(TrackerError::Channel(format!(
                "Telegram {} rejected: {}",
                method,
                parsed.description.unwrap_or_default()
            )));
        }
        parsed
            .result
            .ok_or_else(|| TrackerError::Channel(format!("Telegram {}: empty result", method)))
    }

    /// Long-poll getUpdates and forward presses and /start commands to `tx`.
    /// Runs until the receiving side hangs up.
    pub async fn poll_updates(&self, tx: mpsc::Sender<InboundEvent>) {
        let mut offset: i64 = 0;
        loop {
            let body = serde_json::json!({
                "offset": offset,
                "timeout": 30,
                "allowed_updates": ["message", "callback_query"],
            });
            let updates: Vec<Update> = match self.call("getUpdates", &body).await {
                Ok(u) => u,
                Err(e) => {
                    log::warn!("getUpdates failed: {}", e);
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                if let Some(event) = Self::classify(update) {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    fn classify(update: Update) -> Option<InboundEvent> {
        if let Some(cq) = update.callback_query {
            let payload = CallbackPayload::parse(cq.data.as_deref()?)?;
            let message = cq.message?;
            return Some(InboundEvent::Press(ControlPress {
                payload,
                callback_id: cq.id,
                chat_id: message.chat.id.to_string(),
                message_id: message.message_id.to_string(),
                username: cq.from.username,
            }));
        }

        let message = update.message?;
        let text = message.text.as_deref()?.trim();
        if text == "/start" {
            return Some(InboundEvent::Start {
                chat_id: message.chat.id.to_string(),
                username: message.from.and_then(|u| u.username),
            });
        }
        let command = BotCommand::parse(text)?;
        Some(InboundEvent::Command {
            command,
            chat_id: message.chat.id.to_string(),
        })
    }
}

#[async_trait]
impl Messenger for TelegramApi {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageHandle, TrackerError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(kb) = keyboard {
            body["reply_markup"] = serde_json::to_value(kb)
                .map_err(|e| TrackerError::Channel(format!("keyboard encode failed: {}", e)))?;
        }

        let sent: SentMessage = self.call("sendMessage", &body).await?;
        Ok(MessageHandle {
            chat_id: chat_id.to_string(),
            message_id: sent.message_id.to_string(),
        })
    }

    async fn edit_reply_markup(
        &self,
        handle: &MessageHandle,
        keyboard: &InlineKeyboard,
    ) -> Result<(), TrackerError> {
        let body = serde_json::json!({
            "chat_id": handle.chat_id,
            "message_id": handle.message_id.parse::<i64>().unwrap_or_default(),
            "reply_markup": keyboard,
        });
        // editMessageReplyMarkup returns either the message or `true`; we
        // only care that the call was accepted.
        let _: serde_json::Value = self.call("editMessageReplyMarkup", &body).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), TrackerError> {
        let body = serde_json::json!({
            "callback_query_id": callback_id,
            "text": text,
        });
        let _: serde_json::Value = self.call("answerCallbackQuery", &body).await?;
        Ok(())
    }
}

/// Stand-in when no bot token is configured: logs and drops everything.
pub struct DisabledChannel;

#[async_trait]
impl Messenger for DisabledChannel {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        _keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageHandle, TrackerError> {
        log::debug!("Channel disabled, dropping message to {}: {}", chat_id, text);
        Ok(MessageHandle {
            chat_id: chat_id.to_string(),
            message_id: "0".to_string(),
        })
    }

    async fn edit_reply_markup(
        &self,
        _handle: &MessageHandle,
        _keyboard: &InlineKeyboard,
    ) -> Result<(), TrackerError> {
        Ok(())
    }

    async fn answer_callback(&self, _callback_id: &str, _text: &str) -> Result<(), TrackerError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Response message pools
// ---------------------------------------------------------------------------

const ENCOURAGEMENTS: &[&str] = &[
    "Great work! One more step toward the goal. 💪",
    "Done and dusted. Keep the streak alive! 🔥",
    "Nice. Consistency is what gets you there. ✅",
    "Another brick in the wall. Well done! 🧱",
    "That's the way. See you tomorrow! 🚀",
];

const WARNINGS: &[&str] = &[
    "Skipped. The remaining days just got a little heavier. ⚠️",
    "Noted. Tomorrow's quota goes up to cover it. 📈",
    "Okay, but the goal doesn't move. The plan does. 🔁",
    "One day off. Don't let it become two. ⏳",
];

pub fn pick_encouragement() -> &'static str {
    let mut rng = rand::rng();
    ENCOURAGEMENTS.choose(&mut rng).copied().unwrap_or("Done! ✅")
}

pub fn pick_warning() -> &'static str {
    let mut rng = rand::rng();
    WARNINGS.choose(&mut rng).copied().unwrap_or("Skipped. ⚠️")
}
