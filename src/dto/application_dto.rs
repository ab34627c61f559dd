use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::application::InternshipApplication;
use crate::models::slot::InterviewSlot;

/// First-round decision: invite to interview or reject outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Interview,
    Rejected,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ApplicationReviewPayload {
    pub decision: ReviewDecision,
    pub feedback: Option<String>,
}

/// Final decision after the interview took place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InterviewDecision {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InterviewDecisionPayload {
    pub decision: InterviewDecision,
    pub interview_notes: Option<String>,
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompanyApplicationsQuery {
    pub offer_id: Option<i64>,
}

/// A student-facing application row. While the student is invited to an
/// interview but has not yet booked, the offer's unbooked slots ride along.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationWithSlots {
    #[serde(flatten)]
    pub application: InternshipApplication,
    pub available_slots: Vec<InterviewSlot>,
}
