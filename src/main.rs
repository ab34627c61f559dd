use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use internship_backend::services::score_queue::ScoreQueueService;
use internship_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::auth,
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    // Match-scoring worker: drains queued applications one at a time.
    {
        let state = app_state.clone();
        tokio::spawn(async move {
            let queue = ScoreQueueService::new(state.pool.clone());
            loop {
                match queue.run_once(&state).await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(Duration::from_millis(750)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Score queue worker error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });
    }

    // Notification outbox delivery worker.
    {
        let state = app_state.clone();
        tokio::spawn(async move {
            loop {
                match state.notification_service.run_once().await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(Duration::from_millis(1000)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Notification worker error");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let company_api = Router::new()
        .route(
            "/api/company/offers",
            get(routes::offer::company_list_offers).post(routes::offer::create_offer),
        )
        .route(
            "/api/company/offers/:id",
            axum::routing::put(routes::offer::update_offer)
                .delete(routes::offer::delete_offer),
        )
        .route(
            "/api/company/offers/:id/close",
            post(routes::offer::close_offer),
        )
        .route(
            "/api/company/offers/:id/slots",
            get(routes::slot::list_slots).post(routes::slot::create_slots),
        )
        .route(
            "/api/company/slots/:id",
            axum::routing::delete(routes::slot::delete_slot),
        )
        .route(
            "/api/company/applications",
            get(routes::application::company_applications),
        )
        .route(
            "/api/company/applications/:id/review",
            post(routes::application::review_application),
        )
        .route(
            "/api/company/applications/:id/decision",
            post(routes::application::interview_decision),
        )
        .route(
            "/api/company/applications/:id/score",
            post(routes::application::score_application),
        )
        .route(
            "/api/company/applications/:id/cv",
            get(routes::application::download_cv),
        )
        .layer(from_fn(auth::require_company));

    let student_api = Router::new()
        .route("/api/student/offers", get(routes::offer::browse_offers))
        .route(
            "/api/student/applications",
            get(routes::application::my_applications).post(routes::application::submit_application),
        )
        .route(
            "/api/student/applications/:id/slot",
            post(routes::slot::select_slot),
        )
        .route(
            "/api/student/internships",
            get(routes::internship::my_internships),
        )
        .layer(from_fn(auth::require_student));

    let admin_api = Router::new()
        .route("/api/admin/offers", get(routes::offer::admin_list_offers))
        .route(
            "/api/admin/offers/:id/review",
            post(routes::offer::review_offer),
        )
        .layer(from_fn(auth::require_admin));

    let shared_api = Router::new()
        .route("/api/offers/:id", get(routes::offer::get_offer))
        .route(
            "/api/notifications",
            get(routes::notification::list_notifications),
        )
        .route(
            "/api/notifications/unread",
            get(routes::notification::unread_count),
        )
        .route(
            "/api/notifications/:id/read",
            post(routes::notification::mark_read),
        )
        .route(
            "/api/notifications/read-all",
            post(routes::notification::mark_all_read),
        )
        .layer(from_fn(auth::require_auth));

    info!("Serving uploads from: {}", config.uploads_dir);

    let app = base_routes
        .merge(company_api)
        .merge(student_api)
        .merge(admin_api)
        .merge(shared_api)
        .nest_service(
            "/uploads",
            tower_http::services::ServeDir::new(&config.uploads_dir),
        )
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
