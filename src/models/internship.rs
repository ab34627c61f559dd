use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a materialized internship. Promotion from an accepted
/// application always creates the record already Approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
pub enum InternshipStatus {
    Pending = 0,
    Approved = 1,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Internship {
    pub id: i64,
    pub student_id: Uuid,
    pub internship_type: String,
    pub company_name: String,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: InternshipStatus,
    pub support_document: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}
