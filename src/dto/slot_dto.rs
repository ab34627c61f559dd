use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SlotInput {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateSlotsPayload {
    pub slots: Vec<SlotInput>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SelectSlotPayload {
    pub slot_id: i64,
}
