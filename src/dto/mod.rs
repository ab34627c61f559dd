pub mod application_dto;
pub mod offer_dto;
pub mod slot_dto;
