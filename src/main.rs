use std::sync::Arc;

use tokio::sync::mpsc;

use paceline::config::Config;
use paceline::db::TrackerDb;
use paceline::responder::Responder;
use paceline::scheduler::ReminderScheduler;
use paceline::telegram::{DisabledChannel, InboundEvent, Messenger, TelegramApi};
use paceline::TrackerError;

#[tokio::main]
async fn main() -> Result<(), TrackerError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;

    let db = match &config.db_path {
        Some(path) => TrackerDb::open_at(path)?,
        None => TrackerDb::open()?,
    };
    let db_path = db.path().to_path_buf();
    log::info!("Store ready at {}", db_path.display());

    for chat_id in &config.bootstrap_chat_ids {
        db.upsert_recipient(chat_id, None)?;
    }
    drop(db);

    let messenger: Arc<dyn Messenger> = match &config.telegram_token {
        Some(token) => Arc::new(TelegramApi::new(token)),
        None => {
            log::warn!("PACELINE_TELEGRAM_TOKEN not set, reminders will be dropped");
            Arc::new(DisabledChannel)
        }
    };

    let scheduler = ReminderScheduler::new(
        db_path.clone(),
        Arc::clone(&messenger),
        config.timezone,
    );
    tokio::spawn(async move { scheduler.run().await });

    // The sender stays alive even without a poller so the responder (and the
    // process) keep running on the scheduler alone.
    let (tx, rx) = mpsc::channel::<InboundEvent>(64);
    if let Some(token) = &config.telegram_token {
        let api = TelegramApi::new(token);
        let poll_tx = tx.clone();
        tokio::spawn(async move { api.poll_updates(poll_tx).await });
    }

    let responder = Responder::new(db_path, messenger, config.timezone);
    responder.run(rx).await;

    Ok(())
}
