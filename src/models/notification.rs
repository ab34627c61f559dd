use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Outbox delivery state. Rows are written inside the business transaction
/// and pushed to the optional webhook by a worker after commit, so a push
/// failure can never roll back the mutation that produced the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
pub enum DeliveryStatus {
    Pending = 0,
    Delivered = 1,
    Failed = 2,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: Uuid,
    pub message: String,
    pub is_read: bool,
    pub delivery: DeliveryStatus,
    pub created_at: Option<DateTime<Utc>>,
}
