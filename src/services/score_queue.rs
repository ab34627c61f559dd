use crate::error::Result;
use crate::models::application::{InternshipApplication, MatchStatus};
use crate::models::offer::InternshipOffer;
use crate::models::user::User;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Background scoring queue over applications awaiting a match score.
/// Claims one queued application at a time (FOR UPDATE SKIP LOCKED, so
/// multiple workers never double-score) and records either the score or the
/// failure on the row. Nothing here ever propagates into the application
/// lifecycle.
#[derive(Clone)]
pub struct ScoreQueueService {
    pub pool: PgPool,
}

impl ScoreQueueService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Processes at most one queued application. Returns false when the
    /// queue is drained.
    pub async fn run_once(&self, app_state: &crate::AppState) -> Result<bool> {
        let rec = sqlx::query(
            r#"
            UPDATE internship_applications SET match_status = $1
            WHERE id = (
                SELECT id FROM internship_applications
                WHERE match_status = $2
                ORDER BY created_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING id
            "#,
        )
        .bind(MatchStatus::Scoring)
        .bind(MatchStatus::Queued)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = rec else { return Ok(false) };
        let application_id: i64 = row.try_get("id")?;

        if !app_state.match_service.is_configured() {
            sqlx::query(
                r#"UPDATE internship_applications
                   SET match_status = $1, match_analysis = $2, updated_at = NOW()
                   WHERE id = $3"#,
            )
            .bind(MatchStatus::Skipped)
            .bind("GROQ_API_KEY not configured")
            .bind(application_id)
            .execute(&self.pool)
            .await?;
            return Ok(true);
        }

        match self.score(app_state, application_id).await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!(application_id, error = ?e, "Match scoring failed");
                sqlx::query(
                    r#"UPDATE internship_applications
                       SET match_status = $1, match_analysis = $2, updated_at = NOW()
                       WHERE id = $3"#,
                )
                .bind(MatchStatus::Failed)
                .bind(e.to_string())
                .bind(application_id)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(true)
    }

    async fn score(&self, app_state: &crate::AppState, application_id: i64) -> Result<()> {
        let application = sqlx::query_as::<_, InternshipApplication>(
            r#"SELECT id, offer_id, student_id, cover_letter, cv_file, status, company_feedback,
                      interview_notes, selected_slot_id, created_internship_id, match_score,
                      match_analysis, match_status, created_at, updated_at
               FROM internship_applications WHERE id = $1"#,
        )
        .bind(application_id)
        .fetch_one(&self.pool)
        .await?;

        let offer = sqlx::query_as::<_, InternshipOffer>(
            r#"SELECT id, company_id, title, description, requirements, offer_type, location,
                      duration, start_date, end_date, positions_available, status, admin_feedback,
                      0::bigint AS applications_count,
                      0::bigint AS approved_applications_count,
                      FALSE AS has_applied,
                      created_at, updated_at
               FROM internship_offers WHERE id = $1"#,
        )
        .bind(application.offer_id)
        .fetch_one(&self.pool)
        .await?;

        let student = self.user(application.student_id).await?;
        let company = self.user(offer.company_id).await?;

        let result = app_state
            .match_service
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

        tracing::info!(application_id, score = result.score, "Application scored");
        Ok(())
    }

    async fn user(&self, id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, username, email, first_name, last_name, role, created_at
               FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}
