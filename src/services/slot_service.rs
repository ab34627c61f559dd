use crate::dto::slot_dto::{CreateSlotsPayload, SlotInput};
use crate::error::{Error, Result};
use crate::models::application::{ApplicationStatus, InternshipApplication};
use crate::models::slot::InterviewSlot;
use crate::services::notification_service::NotificationService;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const SLOT_COLUMNS: &str =
    "id, offer_id, date, start_time, end_time, location, is_booked, created_at";

#[derive(Clone)]
pub struct SlotService {
    pool: PgPool,
}

impl SlotService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates interview slots for an offer the company owns. Overlapping
    /// windows are deliberately permitted; arranging a sane calendar is the
    /// company's job.
    pub async fn create_slots(
        &self,
        company_id: Uuid,
        offer_id: i64,
        payload: CreateSlotsPayload,
    ) -> Result<Vec<InterviewSlot>> {
        if payload.slots.is_empty() {
            return Err(Error::Validation("At least one slot is required".into()));
        }
        for slot in &payload.slots {
            validate_slot(slot)?;
        }

        self.assert_offer_ownership(company_id, offer_id).await?;

        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(payload.slots.len());
        for slot in &payload.slots {
            let row = sqlx::query_as::<_, InterviewSlot>(&format!(
                r#"INSERT INTO interview_slots (offer_id, date, start_time, end_time, location)
                   VALUES ($1, $2, $3, $4, $5)
                   RETURNING {}"#,
                SLOT_COLUMNS
            ))
            .bind(offer_id)
            .bind(slot.date)
            .bind(slot.start_time)
            .bind(slot.end_time)
            .bind(&slot.location)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }
        tx.commit().await?;

        Ok(created)
    }

    pub async fn list_for_offer(
        &self,
        company_id: Uuid,
        offer_id: i64,
    ) -> Result<Vec<InterviewSlot>> {
        self.assert_offer_ownership(company_id, offer_id).await?;
        let slots = sqlx::query_as::<_, InterviewSlot>(&format!(
            "SELECT {} FROM interview_slots WHERE offer_id = $1 ORDER BY date, start_time",
            SLOT_COLUMNS
        ))
        .bind(offer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(slots)
    }

    /// Slots stay deletable only until a student books them.
    pub async fn delete(&self, company_id: Uuid, slot_id: i64) -> Result<()> {
        let row = sqlx::query(
            r#"SELECT s.is_booked
               FROM interview_slots s
               JOIN internship_offers o ON o.id = s.offer_id
               WHERE s.id = $1 AND o.company_id = $2"#,
        )
        .bind(slot_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Slot not found".into()))?;

        let is_booked: bool = row.try_get("is_booked")?;
        if is_booked {
            return Err(Error::State("Cannot delete a booked slot".into()));
        }

        sqlx::query(r#"DELETE FROM interview_slots WHERE id = $1 AND is_booked = FALSE"#)
            .bind(slot_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Books a slot for an invited student. The booking itself is a
    /// compare-and-swap on `is_booked` inside the same transaction as the
    /// application update, so of two racing students exactly one wins and
    /// the other gets a conflict.
    pub async fn select(
        &self,
        student_id: Uuid,
        application_id: i64,
        slot_id: i64,
        notifications: &NotificationService,
    ) -> Result<InternshipApplication> {
        let mut tx = self.pool.begin().await?;

        let application = sqlx::query_as::<_, InternshipApplication>(
            r#"SELECT id, offer_id, student_id, cover_letter, cv_file, status, company_feedback,
                      interview_notes, selected_slot_id, created_internship_id, match_score,
                      match_analysis, match_status, created_at, updated_at
               FROM internship_applications
               WHERE id = $1 AND student_id = $2
               FOR UPDATE"#,
        )
        .bind(application_id)
        .bind(student_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Application not found".into()))?;

        if application.status != ApplicationStatus::Interview {
            return Err(Error::State("You have not been invited to interview".into()));
        }
        if application.selected_slot_id.is_some() {
            return Err(Error::State(
                "You have already selected an interview slot".into(),
            ));
        }

        // The CAS below is authoritative; this lookup only rejects slots
        // that belong to another offer.
        let slot = sqlx::query_as::<_, InterviewSlot>(&format!(
            "SELECT {} FROM interview_slots WHERE id = $1 AND offer_id = $2",
            SLOT_COLUMNS
        ))
        .bind(slot_id)
        .bind(application.offer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Slot not found for this offer".into()))?;

        let booked = sqlx::query(
            r#"UPDATE interview_slots SET is_booked = TRUE
               WHERE id = $1 AND is_booked = FALSE"#,
        )
        .bind(slot_id)
        .execute(&mut *tx)
        .await?;
        if booked.rows_affected() == 0 {
            return Err(Error::Conflict(
                "This time slot is no longer available".into(),
            ));
        }

        sqlx::query(
            r#"UPDATE internship_applications
               SET selected_slot_id = $1, updated_at = NOW()
               WHERE id = $2"#,
        )
        .bind(slot_id)
        .bind(application_id)
        .execute(&mut *tx)
        .await?;

        let info = sqlx::query(
            r#"SELECT o.company_id, o.title, u.first_name, u.last_name, u.username
               FROM internship_offers o, users u
               WHERE o.id = $1 AND u.id = $2"#,
        )
        .bind(application.offer_id)
        .bind(student_id)
        .fetch_one(&mut *tx)
        .await?;
        let company_id: Uuid = info.try_get("company_id")?;
        let offer_title: String = info.try_get("title")?;
        let first: Option<String> = info.try_get("first_name")?;
        let last: Option<String> = info.try_get("last_name")?;
        let username: String = info.try_get("username")?;
        let student_name = {
            let full = format!(
                "{} {}",
                first.as_deref().unwrap_or(""),
                last.as_deref().unwrap_or("")
            );
            let full = full.trim().to_string();
            if full.is_empty() {
                username
            } else {
                full
            }
        };

        notifications
            .notify(
                &mut tx,
                company_id,
                &format!(
                    "{} has selected interview slot: {} {}-{} for '{}'",
                    student_name, slot.date, slot.start_time, slot.end_time, offer_title
                ),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(application_id, slot_id, "Interview slot booked");

        let mut application = application;
        application.selected_slot_id = Some(slot_id);
        Ok(application)
    }

    async fn assert_offer_ownership(&self, company_id: Uuid, offer_id: i64) -> Result<()> {
        let owned =
            sqlx::query(r#"SELECT 1 AS one FROM internship_offers WHERE id = $1 AND company_id = $2"#)
                .bind(offer_id)
                .bind(company_id)
                .fetch_optional(&self.pool)
                .await?;
        if owned.is_none() {
            return Err(Error::NotFound("Offer not found".into()));
        }
        Ok(())
    }
}

fn validate_slot(slot: &SlotInput) -> Result<()> {
    if slot.start_time >= slot.end_time {
        return Err(Error::Validation("End time must be after start time".into()));
    }
    Ok(())
}
