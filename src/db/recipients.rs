//! Registered reminder recipients and the dispatch audit log.

use chrono::NaiveDate;
use rusqlite::{params, Row};

use super::TrackerDb;
use crate::error::TrackerError;
use crate::types::Recipient;

impl TrackerDb {
    /// Register a chat as a delivery target, reactivating it if it was
    /// previously deactivated.
    pub fn upsert_recipient(
        &self,
        chat_id: &str,
        username: Option<&str>,
    ) -> Result<Recipient, TrackerError> {
        self.conn.execute(
            "INSERT INTO recipients (chat_id, username, is_active)
             VALUES (?1, ?2, 1)
             ON CONFLICT (chat_id) DO UPDATE SET
               is_active = 1,
               username = COALESCE(excluded.username, recipients.username)",
            params![chat_id, username],
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT id, chat_id, username, is_active FROM recipients WHERE chat_id = ?1",
        )?;
        let recipient = stmt.query_row(params![chat_id], Self::map_recipient_row)?;
        Ok(recipient)
    }

    pub fn deactivate_recipient(&self, chat_id: &str) -> Result<(), TrackerError> {
        self.conn.execute(
            "UPDATE recipients SET is_active = 0 WHERE chat_id = ?1",
            params![chat_id],
        )?;
        Ok(())
    }

    pub fn active_recipients(&self) -> Result<Vec<Recipient>, TrackerError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, chat_id, username, is_active
             FROM recipients WHERE is_active = 1 ORDER BY id",
        )?;
        let rows = stmt.query_map([], Self::map_recipient_row)?;

        let mut recipients = Vec::new();
        for row in rows {
            recipients.push(row?);
        }
        Ok(recipients)
    }

    /// Record the external id of a dispatched reminder message.
    pub fn record_dispatch(
        &self,
        chat_id: &str,
        message_id: &str,
        task_id: i64,
        log_date: NaiveDate,
    ) -> Result<(), TrackerError> {
        self.conn.execute(
            "INSERT INTO dispatch_log (chat_id, message_id, task_id, log_date)
             VALUES (?1, ?2, ?3, ?4)",
            params![chat_id, message_id, task_id, log_date],
        )?;
        Ok(())
    }

    fn map_recipient_row(row: &Row<'_>) -> rusqlite::Result<Recipient> {
        Ok(Recipient {
            id: row.get(0)?,
            chat_id: row.get(1)?,
            username: row.get(2)?,
            is_active: row.get(3)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;

    #[test]
    fn test_upsert_recipient_registers_once() {
        let db = test_db();

        let first = db.upsert_recipient("12345", Some("ada")).expect("insert");
        let second = db.upsert_recipient("12345", None).expect("upsert");

        assert_eq!(first.id, second.id);
        assert_eq!(second.username.as_deref(), Some("ada"));

        let active = db.active_recipients().expect("query");
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn test_deactivate_and_reactivate() {
        let db = test_db();
        db.upsert_recipient("12345", Some("ada")).expect("insert");
        db.deactivate_recipient("12345").expect("deactivate");
        assert!(db.active_recipients().expect("query").is_empty());

        db.upsert_recipient("12345", Some("ada")).expect("reactivate");
        assert_eq!(db.active_recipients().expect("query").len(), 1);
    }

    #[test]
    fn test_record_dispatch() {
        let db = test_db();
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        db.record_dispatch("12345", "678", 1, day).expect("record");

        let count: i64 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM dispatch_log", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 1);
    }
}
