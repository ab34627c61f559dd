use crate::dto::offer_dto::{
    BrowseOffersQuery, CreateOfferPayload, OfferDecision, OfferReviewPayload, UpdateOfferPayload,
};
use crate::error::{Error, Result};
use crate::models::offer::{InternshipOffer, OfferStatus, OFFER_TYPES};
use crate::services::notification_service::NotificationService;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

// Derived columns ride along on every read. Accepted applications are
// status 2. $1 is always the viewing student (or NULL).
const OFFER_COLUMNS: &str = r#"
    id, company_id, title, description, requirements, offer_type, location, duration,
    start_date, end_date, positions_available, status, admin_feedback,
    (SELECT COUNT(*) FROM internship_applications a
       WHERE a.offer_id = internship_offers.id) AS applications_count,
    (SELECT COUNT(*) FROM internship_applications a
       WHERE a.offer_id = internship_offers.id AND a.status = 2) AS approved_applications_count,
    (SELECT EXISTS(SELECT 1 FROM internship_applications a
       WHERE a.offer_id = internship_offers.id AND a.student_id = $1)) AS has_applied,
    created_at, updated_at
"#;

#[derive(Clone)]
pub struct OfferService {
    pool: PgPool,
}

impl OfferService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        company_id: Uuid,
        payload: CreateOfferPayload,
    ) -> Result<InternshipOffer> {
        payload.validate()?;
        if !OFFER_TYPES.contains(&payload.offer_type.as_str()) {
            return Err(Error::Validation(format!(
                "Invalid offer type '{}'. Expected one of: {}",
                payload.offer_type,
                OFFER_TYPES.join(", ")
            )));
        }
        if payload.start_date >= payload.end_date {
            return Err(Error::Validation(
                "End date must be after start date".into(),
            ));
        }

        let offer = sqlx::query_as::<_, InternshipOffer>(
            r#"
            INSERT INTO internship_offers (
                company_id, title, description, requirements, offer_type, location,
                duration, start_date, end_date, positions_available, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING
                id, company_id, title, description, requirements, offer_type, location, duration,
                start_date, end_date, positions_available, status, admin_feedback,
                0::bigint AS applications_count,
                0::bigint AS approved_applications_count,
                FALSE AS has_applied,
                created_at, updated_at
            "#,
        )
        .bind(company_id)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(&payload.requirements)
        .bind(&payload.offer_type)
        .bind(&payload.location)
        .bind(&payload.duration)
        .bind(payload.start_date)
        .bind(payload.end_date)
        .bind(payload.positions_available)
        .bind(OfferStatus::Pending)
        .fetch_one(&self.pool)
        .await?;

        Ok(offer)
    }

    pub async fn get(&self, id: i64, viewer: Option<Uuid>) -> Result<InternshipOffer> {
        let sql = format!(
            "SELECT {} FROM internship_offers WHERE id = $2",
            OFFER_COLUMNS
        );
        let offer = sqlx::query_as::<_, InternshipOffer>(&sql)
            .bind(viewer)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Offer not found".into()))?;
        Ok(offer)
    }

    pub async fn list_for_company(&self, company_id: Uuid) -> Result<Vec<InternshipOffer>> {
        let sql = format!(
            "SELECT {} FROM internship_offers WHERE company_id = $2 ORDER BY created_at DESC",
            OFFER_COLUMNS
        );
        let offers = sqlx::query_as::<_, InternshipOffer>(&sql)
            .bind(Option::<Uuid>::None)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(offers)
    }

    /// Admin listing, filtered by status discriminant (defaults to pending).
    pub async fn list_by_status(&self, status: Option<i32>) -> Result<Vec<InternshipOffer>> {
        let status = status.unwrap_or(OfferStatus::Pending as i32);
        let sql = format!(
            "SELECT {} FROM internship_offers WHERE status = $2 ORDER BY created_at DESC",
            OFFER_COLUMNS
        );
        let offers = sqlx::query_as::<_, InternshipOffer>(&sql)
            .bind(Option::<Uuid>::None)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        Ok(offers)
    }

    /// Student-facing browse over approved offers, with optional type filter
    /// and title/description search.
    pub async fn browse(
        &self,
        student_id: Uuid,
        query: BrowseOffersQuery,
    ) -> Result<Vec<InternshipOffer>> {
        let mut sql = format!(
            "SELECT {} FROM internship_offers WHERE status = $2",
            OFFER_COLUMNS
        );
        let mut next_param = 3;
        if query.offer_type.is_some() {
            sql.push_str(&format!(" AND offer_type = ${}", next_param));
            next_param += 1;
        }
        if query.search.is_some() {
            sql.push_str(&format!(
                " AND (title ILIKE ${} OR description ILIKE ${})",
                next_param,
                next_param + 1
            ));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut statement = sqlx::query_as::<_, InternshipOffer>(&sql)
            .bind(student_id)
            .bind(OfferStatus::Approved);
        if let Some(offer_type) = &query.offer_type {
            statement = statement.bind(offer_type.clone());
        }
        if let Some(search) = &query.search {
            let pattern = format!("%{}%", search);
            statement = statement.bind(pattern.clone()).bind(pattern);
        }

        let offers = statement.fetch_all(&self.pool).await?;
        Ok(offers)
    }

    /// Edits are only legal while the offer awaits moderation.
    pub async fn update(
        &self,
        company_id: Uuid,
        id: i64,
        payload: UpdateOfferPayload,
    ) -> Result<InternshipOffer> {
        payload.validate()?;
        if let Some(offer_type) = &payload.offer_type {
            if !OFFER_TYPES.contains(&offer_type.as_str()) {
                return Err(Error::Validation(format!(
                    "Invalid offer type '{}'",
                    offer_type
                )));
            }
        }

        let current = sqlx::query_as::<_, InternshipOffer>(&format!(
            "SELECT {} FROM internship_offers WHERE id = $2 AND company_id = $3",
            OFFER_COLUMNS
        ))
        .bind(Option::<Uuid>::None)
        .bind(id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Offer not found".into()))?;

        if current.status != OfferStatus::Pending {
            return Err(Error::State("Can only edit pending offers".into()));
        }

        let start = payload.start_date.unwrap_or(current.start_date);
        let end = payload.end_date.unwrap_or(current.end_date);
        if start >= end {
            return Err(Error::Validation(
                "End date must be after start date".into(),
            ));
        }

        sqlx::query(
            r#"
            UPDATE internship_offers SET
                title = COALESCE($1, title),
                description = COALESCE($2, description),
                requirements = COALESCE($3, requirements),
                offer_type = COALESCE($4, offer_type),
                location = COALESCE($5, location),
                duration = COALESCE($6, duration),
                start_date = COALESCE($7, start_date),
                end_date = COALESCE($8, end_date),
                positions_available = COALESCE($9, positions_available),
                updated_at = NOW()
            WHERE id = $10 AND company_id = $11 AND status = $12
            "#,
        )
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(&payload.requirements)
        .bind(&payload.offer_type)
        .bind(&payload.location)
        .bind(&payload.duration)
        .bind(payload.start_date)
        .bind(payload.end_date)
        .bind(payload.positions_available)
        .bind(id)
        .bind(company_id)
        .bind(OfferStatus::Pending)
        .execute(&self.pool)
        .await?;

        self.get(id, None).await
    }

    /// Admin moderation gate. A second review attempt always fails; there is
    /// no silent no-op.
    pub async fn review(
        &self,
        offer_id: i64,
        payload: OfferReviewPayload,
        notifications: &NotificationService,
    ) -> Result<InternshipOffer> {
        let next = match payload.decision {
            OfferDecision::Approved => OfferStatus::Approved,
            OfferDecision::Rejected => OfferStatus::Rejected,
        };
        let feedback = payload.feedback.unwrap_or_default();

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, InternshipOffer>(&format!(
            "SELECT {} FROM internship_offers WHERE id = $2 FOR UPDATE",
            OFFER_COLUMNS
        ))
        .bind(Option::<Uuid>::None)
        .bind(offer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Offer not found".into()))?;

        if !current.status.can_transition_to(next) {
            return Err(Error::State("Offer already reviewed".into()));
        }

        sqlx::query(
            r#"UPDATE internship_offers
               SET status = $1, admin_feedback = $2, updated_at = NOW()
               WHERE id = $3"#,
        )
        .bind(next)
        .bind(&feedback)
        .bind(offer_id)
        .execute(&mut *tx)
        .await?;

        let verdict = if next == OfferStatus::Approved {
            "approved"
        } else {
            "rejected"
        };
        notifications
            .notify(
                &mut tx,
                current.company_id,
                &format!(
                    "Your internship offer '{}' has been {}. {}",
                    current.title, verdict, feedback
                ),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(offer_id, verdict, "Offer reviewed");
        self.get(offer_id, None).await
    }

    /// Company retires an approved offer.
    pub async fn close(&self, company_id: Uuid, id: i64) -> Result<InternshipOffer> {
        let res = sqlx::query(
            r#"UPDATE internship_offers SET status = $1, updated_at = NOW()
               WHERE id = $2 AND company_id = $3 AND status = $4"#,
        )
        .bind(OfferStatus::Closed)
        .bind(id)
        .bind(company_id)
        .bind(OfferStatus::Approved)
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 0 {
            // Distinguish a missing offer from an illegal transition.
            let exists = sqlx::query(
                r#"SELECT 1 AS one FROM internship_offers WHERE id = $1 AND company_id = $2"#,
            )
            .bind(id)
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await?;
            return match exists {
                Some(_) => Err(Error::State("Only approved offers can be closed".into())),
                None => Err(Error::NotFound("Offer not found".into())),
            };
        }

        self.get(id, None).await
    }

    pub async fn delete(&self, company_id: Uuid, id: i64) -> Result<()> {
        let res = sqlx::query(r#"DELETE FROM internship_offers WHERE id = $1 AND company_id = $2"#)
            .bind(id)
            .bind(company_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("Offer not found".into()));
        }
        Ok(())
    }
}
