use crate::error::Result;
use crate::models::application::InternshipApplication;
use crate::models::internship::{Internship, InternshipStatus};
use crate::models::offer::InternshipOffer;
use sqlx::{PgPool, Postgres, Transaction};

/// Acceptance-to-Internship promoter: materializes a formal internship from
/// an accepted application. Runs on the caller's transaction so a failure
/// here aborts the acceptance as a whole.
#[derive(Clone)]
pub struct InternshipService {
    pool: PgPool,
}

impl InternshipService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn promote(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        application: &InternshipApplication,
        offer: &InternshipOffer,
        company_display_name: &str,
    ) -> Result<Internship> {
        let internship = sqlx::query_as::<_, Internship>(
            r#"
            INSERT INTO internships (
                student_id, internship_type, company_name, title, description,
                start_date, end_date, status, support_document
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, student_id, internship_type, company_name, title, description,
                      start_date, end_date, status, support_document, created_at
            "#,
        )
        .bind(application.student_id)
        .bind(&offer.offer_type)
        .bind(company_display_name)
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(offer.start_date)
        .bind(offer.end_date)
        .bind(InternshipStatus::Approved)
        .bind(&application.cv_file)
        .fetch_one(&mut **tx)
        .await?;

        Ok(internship)
    }

    pub async fn list_for_student(&self, student_id: uuid::Uuid) -> Result<Vec<Internship>> {
        let rows = sqlx::query_as::<_, Internship>(
            r#"SELECT id, student_id, internship_type, company_name, title, description,
                      start_date, end_date, status, support_document, created_at
               FROM internships WHERE student_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
