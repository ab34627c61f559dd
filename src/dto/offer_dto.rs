use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateOfferPayload {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub requirements: Option<String>,
    #[serde(rename = "type")]
    pub offer_type: String,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(range(min = 1))]
    pub positions_available: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateOfferPayload {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    #[serde(rename = "type")]
    pub offer_type: Option<String>,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(range(min = 1))]
    pub positions_available: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OfferDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OfferReviewPayload {
    pub decision: OfferDecision,
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminOfferQuery {
    /// Raw status discriminant; defaults to pending.
    pub status: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct BrowseOffersQuery {
    #[serde(rename = "type")]
    pub offer_type: Option<String>,
    pub search: Option<String>,
}
