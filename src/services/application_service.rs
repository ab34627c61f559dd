use crate::dto::application_dto::{
    ApplicationReviewPayload, ApplicationWithSlots, InterviewDecision, InterviewDecisionPayload,
    ReviewDecision,
};
use crate::error::{Error, Result};
use crate::models::application::{ApplicationStatus, InternshipApplication, MatchStatus};
use crate::models::offer::{InternshipOffer, OfferStatus};
use crate::models::slot::InterviewSlot;
use crate::models::user::User;
use crate::services::internship_service::InternshipService;
use crate::services::match_service::{MatchResult, MatchService};
use crate::services::notification_service::NotificationService;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

const APPLICATION_COLUMNS: &str = r#"
    id, offer_id, student_id, cover_letter, cv_file, status, company_feedback,
    interview_notes, selected_slot_id, created_internship_id, match_score,
    match_analysis, match_status, created_at, updated_at
"#;

// Offer columns with derived counts, viewer bind at $1. The counts are
// computed by subquery, so reading them under FOR UPDATE of the offer row
// yields a consistent capacity snapshot.
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
pub struct ApplicationService {
    pool: PgPool,
}

impl ApplicationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<InternshipApplication> {
        let application = sqlx::query_as::<_, InternshipApplication>(&format!(
            "SELECT {} FROM internship_applications WHERE id = $1",
            APPLICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Application not found".into()))?;
        Ok(application)
    }

    /// Submits a student's application against an approved offer. The offer
    /// row is locked for the duration of the checks so the capacity and
    /// duplicate preconditions hold at insert time; the unique
    /// (offer, student) index backstops the duplicate check under races.
    pub async fn submit(
        &self,
        student_id: Uuid,
        offer_id: i64,
        cover_letter: Option<String>,
        cv_path: String,
        notifications: &NotificationService,
    ) -> Result<InternshipApplication> {
        let student = fetch_user(&self.pool, student_id).await?;

        let mut tx = self.pool.begin().await?;

        let offer = sqlx::query_as::<_, InternshipOffer>(&format!(
            "SELECT {} FROM internship_offers WHERE id = $2 FOR UPDATE",
            OFFER_COLUMNS
        ))
        .bind(Some(student_id))
        .bind(offer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Offer not found".into()))?;

        if offer.status != OfferStatus::Approved {
            return Err(Error::Validation(
                "This internship offer is not available".into(),
            ));
        }
        if offer.approved_applications_count.unwrap_or(0) >= offer.positions_available as i64 {
            return Err(Error::Validation(
                "No positions available for this offer".into(),
            ));
        }
        if offer.has_applied.unwrap_or(false) {
            return Err(Error::Validation(
                "You have already applied to this offer".into(),
            ));
        }

        let inserted = sqlx::query_as::<_, InternshipApplication>(&format!(
            r#"INSERT INTO internship_applications
                   (offer_id, student_id, cover_letter, cv_file, status, match_status)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {}"#,
            APPLICATION_COLUMNS
        ))
        .bind(offer_id)
        .bind(student_id)
        .bind(&cover_letter)
        .bind(&cv_path)
        .bind(ApplicationStatus::Pending)
        .bind(MatchStatus::Queued)
        .fetch_one(&mut *tx)
        .await;

        let application = match inserted {
            Ok(application) => application,
            Err(sqlx::Error::Database(db))
                if db.kind() == sqlx::error::ErrorKind::UniqueViolation =>
            {
                return Err(Error::Validation(
                    "You have already applied to this offer".into(),
                ));
            }
            Err(other) => return Err(other.into()),
        };

        notifications
            .notify(
                &mut tx,
                offer.company_id,
                &format!(
                    "New application from {} for '{}'",
                    student.display_name(),
                    offer.title
                ),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            application_id = application.id,
            offer_id,
            "Application submitted"
        );
        Ok(application)
    }

    /// Student's own applications, each carrying the offer's unbooked slots
    /// while a booking is awaited.
    pub async fn list_for_student(&self, student_id: Uuid) -> Result<Vec<ApplicationWithSlots>> {
        let applications = sqlx::query_as::<_, InternshipApplication>(&format!(
            "SELECT {} FROM internship_applications WHERE student_id = $1 ORDER BY created_at DESC",
            APPLICATION_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(applications.len());
        for application in applications {
            let available_slots = if application.status == ApplicationStatus::Interview
                && application.selected_slot_id.is_none()
            {
                sqlx::query_as::<_, InterviewSlot>(
                    r#"SELECT id, offer_id, date, start_time, end_time, location, is_booked, created_at
                       FROM interview_slots
                       WHERE offer_id = $1 AND is_booked = FALSE
                       ORDER BY date, start_time"#,
                )
                .bind(application.offer_id)
                .fetch_all(&self.pool)
                .await?
            } else {
                Vec::new()
            };
            result.push(ApplicationWithSlots {
                application,
                available_slots,
            });
        }
        Ok(result)
    }

    /// Applications across the company's offers, optionally narrowed to one
    /// offer (which must belong to the company).
    pub async fn list_for_company(
        &self,
        company_id: Uuid,
        offer_id: Option<i64>,
    ) -> Result<Vec<InternshipApplication>> {
        let applications = match offer_id {
            Some(offer_id) => {
                let owned = sqlx::query(
                    r#"SELECT 1 AS one FROM internship_offers WHERE id = $1 AND company_id = $2"#,
                )
                .bind(offer_id)
                .bind(company_id)
                .fetch_optional(&self.pool)
                .await?;
                if owned.is_none() {
                    return Err(Error::NotFound("Offer not found".into()));
                }
                sqlx::query_as::<_, InternshipApplication>(&format!(
                    "SELECT {} FROM internship_applications WHERE offer_id = $1 ORDER BY created_at DESC",
                    APPLICATION_COLUMNS
                ))
                .bind(offer_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, InternshipApplication>(&format!(
                    r#"SELECT {} FROM internship_applications
                       WHERE offer_id IN (SELECT id FROM internship_offers WHERE company_id = $1)
                       ORDER BY created_at DESC"#,
                    APPLICATION_COLUMNS
                ))
                .bind(company_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(applications)
    }

    /// First-round review: pending applications move to Interview or
    /// Rejected; anything else is a lifecycle violation.
    pub async fn review(
        &self,
        company_id: Uuid,
        application_id: i64,
        payload: ApplicationReviewPayload,
        notifications: &NotificationService,
    ) -> Result<InternshipApplication> {
        let next = match payload.decision {
            ReviewDecision::Interview => ApplicationStatus::Interview,
            ReviewDecision::Rejected => ApplicationStatus::Rejected,
        };
        let feedback = payload.feedback.unwrap_or_default();

        let mut tx = self.pool.begin().await?;
        let (application, offer) =
            lock_application_and_offer(&mut tx, application_id, company_id).await?;

        if application.status != ApplicationStatus::Pending {
            return Err(Error::State("Application already reviewed".into()));
        }
        debug_assert!(application.status.can_transition_to(next));

        sqlx::query(
            r#"UPDATE internship_applications
               SET status = $1, company_feedback = $2, updated_at = NOW()
               WHERE id = $3"#,
        )
        .bind(next)
        .bind(&feedback)
        .bind(application_id)
        .execute(&mut *tx)
        .await?;

        let message = match next {
            ApplicationStatus::Interview => format!(
                "Great news! You've been selected for an interview for '{}'. Please select your preferred time slot.",
                offer.title
            ),
            _ => format!(
                "Your application for '{}' was not selected. {}",
                offer.title, feedback
            ),
        };
        notifications
            .notify(&mut tx, application.student_id, &message)
            .await?;

        tx.commit().await?;
        self.get(application_id).await
    }

    /// Final decision after the interview. The accepted path atomically sets
    /// the status, promotes the application into an internship and links it;
    /// any failure rolls the whole acceptance back.
    pub async fn decide(
        &self,
        company_id: Uuid,
        application_id: i64,
        payload: InterviewDecisionPayload,
        internships: &InternshipService,
        notifications: &NotificationService,
    ) -> Result<InternshipApplication> {
        let interview_notes = payload.interview_notes.unwrap_or_default();
        let feedback = payload.feedback.unwrap_or_default();

        let mut tx = self.pool.begin().await?;
        let (application, offer) =
            lock_application_and_offer(&mut tx, application_id, company_id).await?;

        if application.status != ApplicationStatus::Interview
            || application.selected_slot_id.is_none()
        {
            return Err(Error::State(
                "Interview must be completed before making a decision".into(),
            ));
        }

        match payload.decision {
            InterviewDecision::Accepted => {
                if offer.approved_applications_count.unwrap_or(0)
                    >= offer.positions_available as i64
                {
                    return Err(Error::Conflict(
                        "No positions remaining for this offer".into(),
                    ));
                }

                sqlx::query(
                    r#"UPDATE internship_applications
                       SET status = $1, interview_notes = $2, company_feedback = $3, updated_at = NOW()
                       WHERE id = $4"#,
                )
                .bind(ApplicationStatus::Accepted)
                .bind(&interview_notes)
                .bind(&feedback)
                .bind(application_id)
                .execute(&mut *tx)
                .await?;

                let company = fetch_user_tx(&mut tx, offer.company_id).await?;
                let internship = internships
                    .promote(&mut tx, &application, &offer, &company.display_name())
                    .await?;

                sqlx::query(
                    r#"UPDATE internship_applications SET created_internship_id = $1 WHERE id = $2"#,
                )
                .bind(internship.id)
                .bind(application_id)
                .execute(&mut *tx)
                .await?;

                notifications
                    .notify(
                        &mut tx,
                        application.student_id,
                        &format!(
                            "Congratulations! You've been accepted for '{}'! Your internship has been created.",
                            offer.title
                        ),
                    )
                    .await?;
            }
            InterviewDecision::Rejected => {
                sqlx::query(
                    r#"UPDATE internship_applications
                       SET status = $1, interview_notes = $2, company_feedback = $3, updated_at = NOW()
                       WHERE id = $4"#,
                )
                .bind(ApplicationStatus::Rejected)
                .bind(&interview_notes)
                .bind(&feedback)
                .bind(application_id)
                .execute(&mut *tx)
                .await?;

                notifications
                    .notify(
                        &mut tx,
                        application.student_id,
                        &format!(
                            "Thank you for interviewing for '{}'. Unfortunately, we've decided not to proceed. {}",
                            offer.title, feedback
                        ),
                    )
                    .await?;
            }
        }

        tx.commit().await?;

        tracing::info!(
            application_id,
            decision = ?payload.decision,
            "Interview decision recorded"
        );
        self.get(application_id).await
    }

    /// Stored CV path for an application on one of the company's offers.
    pub async fn cv_path(&self, company_id: Uuid, application_id: i64) -> Result<String> {
        let row = sqlx::query(
            r#"SELECT a.cv_file FROM internship_applications a
               JOIN internship_offers o ON o.id = a.offer_id
               WHERE a.id = $1 AND o.company_id = $2"#,
        )
        .bind(application_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Application not found".into()))?;
        Ok(row.try_get("cv_file")?)
    }

    /// Explicit, synchronous scoring for the owning company. This is the one
    /// path that surfaces ScoringUnavailable / Scoring errors to the caller.
    pub async fn score_now(
        &self,
        company_id: Uuid,
        application_id: i64,
        matcher: &MatchService,
    ) -> Result<MatchResult> {
        let application = self.get(application_id).await?;
        let offer = sqlx::query_as::<_, InternshipOffer>(&format!(
            "SELECT {} FROM internship_offers WHERE id = $2 AND company_id = $3",
            OFFER_COLUMNS
        ))
        .bind(Option::<Uuid>::None)
        .bind(application.offer_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Application not found".into()))?;

        let student = fetch_user(&self.pool, application.student_id).await?;
        let company = fetch_user(&self.pool, offer.company_id).await?;

        let result = matcher
            .score_application(&application, &offer, &student, &company.display_name())
            .await?;

        sqlx::query(
            r#"UPDATE internship_applications
               SET match_score = $1, match_analysis = $2, match_status = $3, updated_at = NOW()
               WHERE id = $4"#,
        )
        .bind(result.score)
        .bind(&result.analysis)
        .bind(MatchStatus::Scored)
        .bind(application_id)
        .execute(&self.pool)
        .await?;

        Ok(result)
    }
}

/// Locks the application row and its offer row (in that order) and verifies
/// the caller's company owns the offer. Missing or foreign rows surface as
/// NotFound, matching the ownership-scoped lookups of the HTTP layer.
async fn lock_application_and_offer(
    tx: &mut Transaction<'_, Postgres>,
    application_id: i64,
    company_id: Uuid,
) -> Result<(InternshipApplication, InternshipOffer)> {
    let application = sqlx::query_as::<_, InternshipApplication>(&format!(
        "SELECT {} FROM internship_applications WHERE id = $1 FOR UPDATE",
        APPLICATION_COLUMNS
    ))
    .bind(application_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| Error::NotFound("Application not found".into()))?;

    let offer = sqlx::query_as::<_, InternshipOffer>(&format!(
        "SELECT {} FROM internship_offers WHERE id = $2 FOR UPDATE",
        OFFER_COLUMNS
    ))
    .bind(Option::<Uuid>::None)
    .bind(application.offer_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| Error::NotFound("Offer not found".into()))?;

    if offer.company_id != company_id {
        return Err(Error::NotFound("Application not found".into()));
    }

    Ok((application, offer))
}

async fn fetch_user(pool: &PgPool, id: Uuid) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"SELECT id, username, email, first_name, last_name, role, created_at
           FROM users WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound("User not found".into()))?;
    Ok(user)
}

async fn fetch_user_tx(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"SELECT id, username, email, first_name, last_name, role, created_at
           FROM users WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| Error::NotFound("User not found".into()))?;
    Ok(user)
}
