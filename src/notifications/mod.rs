use std::sync::Arc;

use chrono::Utc;
use log::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Category, Notification};
use crate::storage::Storage;

pub const RECENT_LIMIT: i64 = 20;

/// Per-account inbox of short messages about application progress.
pub struct NotificationFeed {
    storage: Arc<dyn Storage>,
}

impl NotificationFeed {
    pub fn new(storage: Arc<dyn Storage>) -> NotificationFeed {
        NotificationFeed { storage }
    }

    /// Never fails the caller. A lost notification is logged and forgotten.
    pub fn emit(&self, account_id: Uuid, title: &str, message: &str, category: Category) {
        let notification = Notification {
            id: Uuid::new_v4(),
            account_id,
            title: title.to_string(),
            message: message.to_string(),
            category,
            is_read: false,
            created_at: Utc::now(),
        };

        match self.storage.insert_notification(notification) {
            Ok(stored) => debug!("[NotificationFeed] {} -> {}", stored.title, account_id),
            Err(e) => warn!(
                "[NotificationFeed] could not store notification for {}: {}",
                account_id, e
            ),
        }
    }

    pub fn list_recent(&self, account_id: Uuid) -> Result<Vec<Notification>> {
        self.storage.list_notifications(account_id, RECENT_LIMIT)
    }

    pub fn mark_read(&self, id: Uuid) -> Result<Notification> {
        self.storage.mark_notification_read(id)
    }
}
