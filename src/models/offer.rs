use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Moderation lifecycle of a company-posted offer.
///
/// Pending is the only entry state. An admin moves a pending offer to
/// Approved or Rejected exactly once; the company may close an approved
/// offer. No transition ever returns to Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
pub enum OfferStatus {
    Pending = 0,
    Approved = 1,
    Rejected = 2,
    Closed = 3,
}

impl OfferStatus {
    pub fn can_transition_to(self, next: OfferStatus) -> bool {
        matches!(
            (self, next),
            (OfferStatus::Pending, OfferStatus::Approved)
                | (OfferStatus::Pending, OfferStatus::Rejected)
                | (OfferStatus::Approved, OfferStatus::Closed)
        )
    }

    pub fn display(self) -> &'static str {
        match self {
            OfferStatus::Pending => "Pending",
            OfferStatus::Approved => "Approved",
            OfferStatus::Rejected => "Rejected",
            OfferStatus::Closed => "Closed",
        }
    }
}

pub const OFFER_TYPES: [&str; 3] = ["PFE", "Stage", "Internship"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InternshipOffer {
    pub id: i64,
    pub company_id: Uuid,
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    #[serde(rename = "type")]
    pub offer_type: String,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub positions_available: i32,
    pub status: OfferStatus,
    pub admin_feedback: Option<String>,
    pub applications_count: Option<i64>,
    pub approved_applications_count: Option<i64>,
    pub has_applied: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_offers_can_be_decided() {
        assert!(OfferStatus::Pending.can_transition_to(OfferStatus::Approved));
        assert!(OfferStatus::Pending.can_transition_to(OfferStatus::Rejected));
    }

    #[test]
    fn approved_offers_can_only_close() {
        assert!(OfferStatus::Approved.can_transition_to(OfferStatus::Closed));
        assert!(!OfferStatus::Approved.can_transition_to(OfferStatus::Rejected));
        assert!(!OfferStatus::Approved.can_transition_to(OfferStatus::Pending));
    }

    #[test]
    fn decided_offers_never_return_to_pending() {
        for status in [
            OfferStatus::Approved,
            OfferStatus::Rejected,
            OfferStatus::Closed,
        ] {
            assert!(!status.can_transition_to(OfferStatus::Pending));
        }
    }

    #[test]
    fn rejected_and_closed_are_terminal() {
        for next in [
            OfferStatus::Pending,
            OfferStatus::Approved,
            OfferStatus::Rejected,
            OfferStatus::Closed,
        ] {
            assert!(!OfferStatus::Rejected.can_transition_to(next));
            assert!(!OfferStatus::Closed.can_transition_to(next));
        }
    }
}
