pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    application_service::ApplicationService, internship_service::InternshipService,
    match_service::MatchService, notification_service::NotificationService,
    offer_service::OfferService, slot_service::SlotService,
};
use reqwest::Client;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub offer_service: OfferService,
    pub application_service: ApplicationService,
    pub slot_service: SlotService,
    pub internship_service: InternshipService,
    pub match_service: MatchService,
    pub notification_service: NotificationService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("failed to build HTTP client");

        let offer_service = OfferService::new(pool.clone());
        let application_service = ApplicationService::new(pool.clone());
        let slot_service = SlotService::new(pool.clone());
        let internship_service = InternshipService::new(pool.clone());
        let match_service = MatchService::new(config.groq_api_key.clone(), http_client);
        let notification_service =
            NotificationService::new(pool.clone(), config.notification_webhook_url.clone());

        Self {
            pool,
            offer_service,
            application_service,
            slot_service,
            internship_service,
            match_service,
            notification_service,
        }
    }
}
