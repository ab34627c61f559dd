use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Review lifecycle of a single application.
///
/// The company moves a pending application to Interview or Rejected; after
/// the interview (a slot must be booked first) it moves to Accepted or
/// Rejected. Accepted and Rejected are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
pub enum ApplicationStatus {
    Pending = 0,
    Interview = 1,
    Accepted = 2,
    Rejected = 3,
}

impl ApplicationStatus {
    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        matches!(
            (self, next),
            (ApplicationStatus::Pending, ApplicationStatus::Interview)
                | (ApplicationStatus::Pending, ApplicationStatus::Rejected)
                | (ApplicationStatus::Interview, ApplicationStatus::Accepted)
                | (ApplicationStatus::Interview, ApplicationStatus::Rejected)
        )
    }

    pub fn display(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Interview => "Interview",
            ApplicationStatus::Accepted => "Accepted",
            ApplicationStatus::Rejected => "Rejected",
        }
    }
}

/// Background scoring state. Scoring is advisory and never gates the
/// application lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
pub enum MatchStatus {
    Queued = 0,
    Scoring = 1,
    Scored = 2,
    Failed = 3,
    Skipped = 4,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InternshipApplication {
    pub id: i64,
    pub offer_id: i64,
    pub student_id: Uuid,
    pub cover_letter: Option<String>,
    pub cv_file: String,
    pub status: ApplicationStatus,
    pub company_feedback: Option<String>,
    pub interview_notes: Option<String>,
    pub selected_slot_id: Option<i64>,
    pub created_internship_id: Option<i64>,
    pub match_score: Option<i32>,
    pub match_analysis: Option<String>,
    pub match_status: MatchStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
