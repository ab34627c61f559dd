pub mod application_service;
pub mod internship_service;
pub mod match_service;
pub mod notification_service;
pub mod offer_service;
pub mod score_queue;
pub mod slot_service;
