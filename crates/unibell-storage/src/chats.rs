//! Notification subscribers backed by the `chats` table.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::params;
use std::sync::Arc;

use unibell_core::error::{Result, UnibellError};
use unibell_core::traits::SubscriptionSource;
use unibell_core::types::{NotifyOffset, Subscription};

use crate::database::Database;

#[derive(Clone)]
pub struct ChatStore {
    db: Arc<Database>,
}

impl ChatStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create or update a subscriber. Re-subscribing clears the inaccessible flag.
    pub fn upsert_chat(&self, subscription: &Subscription, enabled: bool) -> Result<()> {
        self.db
            .lock()?
            .execute(
                "INSERT INTO chats (chat_id, group_id, language_code, notify_offset, notifications_enabled, inaccessible, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
                 ON CONFLICT(chat_id) DO UPDATE SET
                    group_id = excluded.group_id,
                    language_code = excluded.language_code,
                    notify_offset = excluded.notify_offset,
                    notifications_enabled = excluded.notifications_enabled,
                    inaccessible = 0,
                    updated_at = excluded.updated_at",
                params![
                    subscription.chat_id,
                    subscription.group_id,
                    subscription.language_code,
                    subscription.offset.label(),
                    enabled as i32,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| UnibellError::Storage(format!("Save chat: {e}")))?;
        Ok(())
    }

    pub fn is_inaccessible(&self, chat_id: i64) -> Result<bool> {
        self.db
            .lock()?
            .query_row(
                "SELECT inaccessible FROM chats WHERE chat_id = ?1",
                params![chat_id],
                |row| row.get::<_, i32>(0),
            )
            .map(|flag| flag != 0)
            .map_err(|e| UnibellError::Storage(format!("Read chat: {e}")))
    }
}

#[async_trait]
impl SubscriptionSource for ChatStore {
    async fn active_subscriptions(&self, offset: NotifyOffset) -> Result<Vec<Subscription>> {
        let conn = self.db.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT chat_id, group_id, language_code FROM chats
                 WHERE notify_offset = ?1 AND notifications_enabled = 1 AND inaccessible = 0
                 ORDER BY chat_id",
            )
            .map_err(|e| UnibellError::Storage(format!("Prepare subscriptions: {e}")))?;
        let rows = stmt
            .query_map(params![offset.label()], |row| {
                Ok(Subscription {
                    chat_id: row.get(0)?,
                    group_id: row.get(1)?,
                    language_code: row.get(2)?,
                    offset,
                })
            })
            .map_err(|e| UnibellError::Storage(format!("Load subscriptions: {e}")))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| UnibellError::Storage(format!("Read subscription: {e}")))
    }

    async fn mark_inaccessible(&self, chat_id: i64) -> Result<()> {
        self.db
            .lock()?
            .execute(
                "UPDATE chats SET inaccessible = 1, updated_at = ?2 WHERE chat_id = ?1",
                params![chat_id, Utc::now().to_rfc3339()],
            )
            .map_err(|e| UnibellError::Storage(format!("Flag chat: {e}")))?;
        tracing::info!(chat_id, "🚫 Chat marked inaccessible");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(chat_id: i64, offset: NotifyOffset) -> Subscription {
        Subscription {
            chat_id,
            group_id: 42,
            language_code: "en".into(),
            offset,
        }
    }

    fn store() -> ChatStore {
        ChatStore::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_active_subscriptions_by_offset() {
        let store = store();
        store.upsert_chat(&sub(1, NotifyOffset::FifteenMinutes), true).unwrap();
        store.upsert_chat(&sub(2, NotifyOffset::OneMinute), true).unwrap();
        store.upsert_chat(&sub(3, NotifyOffset::FifteenMinutes), false).unwrap();

        let subs = store.active_subscriptions(NotifyOffset::FifteenMinutes).await.unwrap();
        assert_eq!(subs, vec![sub(1, NotifyOffset::FifteenMinutes)]);
        let subs = store.active_subscriptions(NotifyOffset::OneMinute).await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].chat_id, 2);
    }

    #[tokio::test]
    async fn test_mark_inaccessible_excludes_chat() {
        let store = store();
        store.upsert_chat(&sub(1, NotifyOffset::OneMinute), true).unwrap();
        store.mark_inaccessible(1).await.unwrap();

        assert!(store.is_inaccessible(1).unwrap());
        assert!(store.active_subscriptions(NotifyOffset::OneMinute).await.unwrap().is_empty());

        // Subscribing again makes the chat reachable
        store.upsert_chat(&sub(1, NotifyOffset::OneMinute), true).unwrap();
        assert!(!store.is_inaccessible(1).unwrap());
    }
}
