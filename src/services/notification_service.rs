use crate::error::Result;
use crate::models::notification::{DeliveryStatus, Notification};
use reqwest::Client;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

/// Notification outbox. `notify` appends the row on the caller's transaction
/// so the message is durable exactly when the business mutation commits;
/// `run_once` is the delivery worker that pushes committed rows to the
/// optional webhook. Push failures are recorded and logged, never surfaced.
#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
    client: Client,
    target_url: Option<String>,
}

impl NotificationService {
    pub fn new(pool: PgPool, target_url: Option<String>) -> Self {
        Self {
            pool,
            client: Client::new(),
            target_url,
        }
    }

    pub async fn notify(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        recipient_id: Uuid,
        message: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO notifications (recipient_id, message, delivery) VALUES ($1, $2, $3)"#,
        )
        .bind(recipient_id)
        .bind(message)
        .bind(DeliveryStatus::Pending)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn list_for(&self, recipient_id: Uuid) -> Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            r#"SELECT id, recipient_id, message, is_read, delivery, created_at
               FROM notifications WHERE recipient_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn unread_count(&self, recipient_id: Uuid) -> Result<i64> {
        let row = sqlx::query(
            r#"SELECT COUNT(*) AS count FROM notifications WHERE recipient_id = $1 AND is_read = FALSE"#,
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("count")?)
    }

    pub async fn mark_read(&self, recipient_id: Uuid, id: i64) -> Result<()> {
        let res = sqlx::query(
            r#"UPDATE notifications SET is_read = TRUE WHERE id = $1 AND recipient_id = $2"#,
        )
        .bind(id)
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(crate::error::Error::NotFound(
                "Notification not found".into(),
            ));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64> {
        let res = sqlx::query(
            r#"UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND is_read = FALSE"#,
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    /// Claims one pending notification and attempts delivery. The claim and
    /// the outcome update share one transaction, so the row stays locked for
    /// the whole attempt and concurrent workers skip past it. Returns false
    /// when the outbox is drained.
    pub async fn run_once(&self) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let row_opt = sqlx::query(
            r#"SELECT id, recipient_id, message FROM notifications
               WHERE delivery = $1
               ORDER BY created_at ASC
               FOR UPDATE SKIP LOCKED
               LIMIT 1"#,
        )
        .bind(DeliveryStatus::Pending)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row_opt else { return Ok(false) };
        let id: i64 = row.try_get("id")?;
        let recipient_id: Uuid = row.try_get("recipient_id")?;
        let message: String = row.try_get("message")?;

        let delivery = match &self.target_url {
            // No push transport configured: the in-app row is the delivery.
            None => DeliveryStatus::Delivered,
            Some(url) => {
                let res = self
                    .client
                    .post(url)
                    .timeout(std::time::Duration::from_secs(10))
                    .json(&serde_json::json!({
                        "recipient_id": recipient_id,
                        "message": message,
                    }))
                    .send()
                    .await;
                match res {
                    Ok(resp) if resp.status().is_success() => DeliveryStatus::Delivered,
                    Ok(resp) => {
                        tracing::warn!(
                            notification_id = id,
                            status = %resp.status(),
                            "Notification push rejected"
                        );
                        DeliveryStatus::Failed
                    }
                    Err(err) => {
                        tracing::warn!(notification_id = id, error = %err, "Notification push failed");
                        DeliveryStatus::Failed
                    }
                }
            }
        };

        sqlx::query(r#"UPDATE notifications SET delivery = $1 WHERE id = $2"#)
            .bind(delivery)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(true)
    }
}
