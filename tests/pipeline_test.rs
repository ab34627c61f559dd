use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    middleware::from_fn,
    routing::{get, post, put},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

use internship_backend::{middleware::auth, routes, AppState};

fn init_test_env() {
    dotenvy::dotenv().ok();
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    if env::var("JWT_SECRET").is_err() {
        env::set_var("JWT_SECRET", "test_secret_key");
    }
    let uploads = env::temp_dir().join("internship_test_uploads");
    env::set_var("UPLOADS_DIR", uploads.to_str().unwrap());
    let _ = internship_backend::config::init_config();
}

async fn build_app() -> Option<(Router, sqlx::PgPool)> {
    init_test_env();
    if env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set; skipping");
        return None;
    }

    let pool = internship_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    let app_state = AppState::new(pool.clone());

    let company_api = Router::new()
        .route(
            "/api/company/offers",
            get(routes::offer::company_list_offers).post(routes::offer::create_offer),
        )
        .route(
            "/api/company/offers/:id",
            put(routes::offer::update_offer).delete(routes::offer::delete_offer),
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
            "/api/company/applications/:id/cv",
            get(routes::application::download_cv),
        )
        .layer(from_fn(auth::require_company));

    let student_api = Router::new()
        .route("/api/student/offers", get(routes::offer::browse_offers))
        .route(
            "/api/student/applications",
            get(routes::application::my_applications)
                .post(routes::application::submit_application),
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
        .layer(from_fn(auth::require_auth));

    let app = company_api
        .merge(student_api)
        .merge(admin_api)
        .merge(shared_api)
        .with_state(app_state);

    Some((app, pool))
}

async fn seed_user(pool: &sqlx::PgPool, role: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"INSERT INTO users (id, username, email, first_name, last_name, role)
           VALUES ($1, $2, $3, $4, $5, $6)"#,
    )
    .bind(id)
    .bind(format!("{}_{}", role, id.simple()))
    .bind(format!("{}_{}@example.com", role, id.simple()))
    .bind("Test")
    .bind("User")
    .bind(role)
    .execute(pool)
    .await
    .expect("seed user");
    id
}

fn token_for(id: Uuid, role: &str) -> String {
    #[derive(serde::Serialize)]
    struct Claims {
        sub: String,
        exp: usize,
        role: Option<String>,
    }
    let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize;
    let token = encode(
        &Header::default(),
        &Claims {
            sub: id.to_string(),
            exp,
            role: Some(role.to_string()),
        },
        &EncodingKey::from_secret(
            internship_backend::config::get_config()
                .jwt_secret
                .as_bytes(),
        ),
    )
    .expect("sign token");
    format!("Bearer {}", token)
}

fn json_request(method: &str, uri: &str, auth: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", auth)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str, auth: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", auth)
        .body(Body::empty())
        .unwrap()
}

fn multipart_application(uri: &str, auth: &str, offer_id: i64) -> Request<Body> {
    multipart_application_with_cv(uri, auth, offer_id, b"%PDF-1.4 minimal resume body\n")
}

fn multipart_application_with_cv(
    uri: &str,
    auth: &str,
    offer_id: i64,
    cv_body: &[u8],
) -> Request<Body> {
    let boundary = "XPIPELINEBOUNDARY";
    let mut body: Vec<u8> = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\ncontent-disposition: form-data; name=\"offer_id\"\r\n\r\n{id}\r\n",
            b = boundary,
            id = offer_id
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{b}\r\ncontent-disposition: form-data; name=\"cover_letter\"\r\n\r\nMotivated applicant\r\n",
            b = boundary
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{b}\r\ncontent-disposition: form-data; name=\"cv\"; filename=\"cv.pdf\"\r\ncontent-type: application/pdf\r\n\r\n",
            b = boundary
        )
        .as_bytes(),
    );
    body.extend_from_slice(cv_body);
    body.extend_from_slice(format!("\r\n--{b}--\r\n", b = boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .header("authorization", auth)
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn offer_payload(title: &str, positions: i32) -> JsonValue {
    json!({
        "title": title,
        "description": "Build and ship backend features over the summer.",
        "requirements": "Rust, SQL",
        "type": "PFE",
        "location": "Tunis",
        "duration": "6 months",
        "start_date": "2027-02-01",
        "end_date": "2027-07-31",
        "positions_available": positions
    })
}

#[tokio::test]
async fn full_pipeline_offer_to_internship() {
    let Some((app, pool)) = build_app().await else {
        return;
    };
    let company = seed_user(&pool, "company").await;
    let student = seed_user(&pool, "student").await;
    let admin = seed_user(&pool, "administrator").await;
    let company_auth = token_for(company, "company");
    let student_auth = token_for(student, "student");
    let admin_auth = token_for(admin, "administrator");

    // Company posts an offer; it starts pending.
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/company/offers",
            &company_auth,
            offer_payload("Backend Intern", 1),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    let offer_id = created["offer"]["id"].as_i64().unwrap();
    assert_eq!(created["offer"]["status"], "Pending");

    // Invisible to students until approved.
    let resp = app
        .clone()
        .oneshot(get_request(
            &format!("/api/offers/{}", offer_id),
            &student_auth,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Admin approves.
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/admin/offers/{}/review", offer_id),
            &admin_auth,
            json!({ "decision": "approved", "feedback": "Looks solid" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Student applies.
    let resp = app
        .clone()
        .oneshot(multipart_application(
            "/api/student/applications",
            &student_auth,
            offer_id,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let submitted = body_json(resp).await;
    let application_id = submitted["application"]["id"].as_i64().unwrap();

    // The company can fetch the stored CV back.
    let resp = app
        .clone()
        .oneshot(get_request(
            &format!("/api/company/applications/{}/cv", application_id),
            &company_auth,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Second application from the same student is rejected.
    let resp = app
        .clone()
        .oneshot(multipart_application(
            "/api/student/applications",
            &student_auth,
            offer_id,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let dup = body_json(resp).await;
    assert_eq!(dup["error"], "You have already applied to this offer");

    // Company passes the application to interview.
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/company/applications/{}/review", application_id),
            &company_auth,
            json!({ "decision": "interview", "feedback": "Strong profile" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // A decision before the interview slot is chosen is refused.
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/company/applications/{}/decision", application_id),
            &company_auth,
            json!({ "decision": "accepted" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let early = body_json(resp).await;
    assert_eq!(
        early["error"],
        "Interview must be completed before making a decision"
    );

    // Company publishes interview slots.
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/company/offers/{}/slots", offer_id),
            &company_auth,
            json!({ "slots": [
                { "date": "2027-01-10", "start_time": "09:00:00", "end_time": "09:30:00", "location": "HQ" },
                { "date": "2027-01-10", "start_time": "10:00:00", "end_time": "10:30:00", "location": "HQ" }
            ]}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let slots = body_json(resp).await;
    let slot_id = slots["slots"][0]["id"].as_i64().unwrap();

    // Student books a slot.
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/student/applications/{}/slot", application_id),
            &student_auth,
            json!({ "slot_id": slot_id }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Re-selecting is refused.
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/student/applications/{}/slot", application_id),
            &student_auth,
            json!({ "slot_id": slot_id }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let reselect = body_json(resp).await;
    assert_eq!(
        reselect["error"],
        "You have already selected an interview slot"
    );

    // Booked slots cannot be deleted.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/company/slots/{}", slot_id))
                .header("authorization", &company_auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Company accepts after the interview; an internship is created.
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/company/applications/{}/decision", application_id),
            &company_auth,
            json!({ "decision": "accepted", "notes": "Great interview" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let decided = body_json(resp).await;
    assert_eq!(decided["application"]["status"], "Accepted");
    let internship_id = decided["application"]["created_internship_id"]
        .as_i64()
        .unwrap();

    let row = sqlx::query_scalar::<_, String>(r#"SELECT title FROM internships WHERE id = $1"#)
        .bind(internship_id)
        .fetch_one(&pool)
        .await
        .expect("internship row");
    assert_eq!(row, "Backend Intern");

    // The student sees the new internship.
    let resp = app
        .clone()
        .oneshot(get_request("/api/student/internships", &student_auth))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let internships = body_json(resp).await;
    assert_eq!(internships[0]["id"].as_i64().unwrap(), internship_id);

    // The single position is now taken: a second student cannot apply.
    let student2 = seed_user(&pool, "student").await;
    let student2_auth = token_for(student2, "student");
    let resp = app
        .clone()
        .oneshot(multipart_application(
            "/api/student/applications",
            &student2_auth,
            offer_id,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let full = body_json(resp).await;
    assert_eq!(full["error"], "No positions available for this offer");

    // Both parties accumulated notifications along the way.
    let resp = app
        .clone()
        .oneshot(get_request("/api/notifications", &company_auth))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let notifications = body_json(resp).await;
    assert!(!notifications.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn admin_review_is_single_shot() {
    let Some((app, pool)) = build_app().await else {
        return;
    };
    let company = seed_user(&pool, "company").await;
    let admin = seed_user(&pool, "administrator").await;
    let company_auth = token_for(company, "company");
    let admin_auth = token_for(admin, "administrator");

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/company/offers",
            &company_auth,
            offer_payload("Data Intern", 2),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let offer_id = body_json(resp).await["offer"]["id"].as_i64().unwrap();

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/admin/offers/{}/review", offer_id),
            &admin_auth,
            json!({ "decision": "approved" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // A second verdict on the same offer is refused.
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/admin/offers/{}/review", offer_id),
            &admin_auth,
            json!({ "decision": "rejected", "feedback": "changed my mind" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let second = body_json(resp).await;
    assert_eq!(second["error"], "Offer already reviewed");
}

#[tokio::test]
async fn rejected_offer_refuses_applications() {
    let Some((app, pool)) = build_app().await else {
        return;
    };
    let company = seed_user(&pool, "company").await;
    let student = seed_user(&pool, "student").await;
    let admin = seed_user(&pool, "administrator").await;
    let company_auth = token_for(company, "company");
    let student_auth = token_for(student, "student");
    let admin_auth = token_for(admin, "administrator");

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/company/offers",
            &company_auth,
            offer_payload("QA Intern", 1),
        ))
        .await
        .unwrap();
    let offer_id = body_json(resp).await["offer"]["id"].as_i64().unwrap();

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/admin/offers/{}/review", offer_id),
            &admin_auth,
            json!({ "decision": "rejected", "feedback": "Too vague" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let marker = Uuid::new_v4().simple().to_string();
    let cv_body = format!("%PDF-1.4 {}", marker);
    let resp = app
        .clone()
        .oneshot(multipart_application_with_cv(
            "/api/student/applications",
            &student_auth,
            offer_id,
            cv_body.as_bytes(),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "This internship offer is not available");

    // The rejected submission leaves no file behind.
    let cv_dir = format!(
        "{}/cv",
        internship_backend::config::get_config().uploads_dir
    );
    let mut entries = tokio::fs::read_dir(&cv_dir).await.expect("cv dir");
    while let Some(entry) = entries.next_entry().await.expect("dir entry") {
        let content = tokio::fs::read(entry.path()).await.expect("cv file");
        assert!(
            !String::from_utf8_lossy(&content).contains(&marker),
            "orphaned CV left behind at {:?}",
            entry.path()
        );
    }
}

#[tokio::test]
async fn closed_offer_refuses_applications() {
    let Some((app, pool)) = build_app().await else {
        return;
    };
    let company = seed_user(&pool, "company").await;
    let student = seed_user(&pool, "student").await;
    let admin = seed_user(&pool, "administrator").await;
    let company_auth = token_for(company, "company");
    let student_auth = token_for(student, "student");
    let admin_auth = token_for(admin, "administrator");

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/company/offers",
            &company_auth,
            offer_payload("Mobile Intern", 3),
        ))
        .await
        .unwrap();
    let offer_id = body_json(resp).await["offer"]["id"].as_i64().unwrap();

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/admin/offers/{}/review", offer_id),
            &admin_auth,
            json!({ "decision": "approved" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/company/offers/{}/close", offer_id),
            &company_auth,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(multipart_application(
            "/api/student/applications",
            &student_auth,
            offer_id,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "This internship offer is not available");
}

#[tokio::test]
async fn slot_booking_has_a_single_winner() {
    let Some((app, pool)) = build_app().await else {
        return;
    };
    let company = seed_user(&pool, "company").await;
    let student_a = seed_user(&pool, "student").await;
    let student_b = seed_user(&pool, "student").await;
    let admin = seed_user(&pool, "administrator").await;
    let company_auth = token_for(company, "company");
    let admin_auth = token_for(admin, "administrator");

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/company/offers",
            &company_auth,
            offer_payload("Infra Intern", 2),
        ))
        .await
        .unwrap();
    let offer_id = body_json(resp).await["offer"]["id"].as_i64().unwrap();

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/admin/offers/{}/review", offer_id),
            &admin_auth,
            json!({ "decision": "approved" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Both applications already at the interview stage, one shared slot.
    let mut app_ids = Vec::new();
    for student in [student_a, student_b] {
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO internship_applications (offer_id, student_id, cv_file, status, match_status)
               VALUES ($1, $2, $3, 1, 4) RETURNING id"#,
        )
        .bind(offer_id)
        .bind(student)
        .bind("uploads/cv/seeded.pdf")
        .fetch_one(&pool)
        .await
        .expect("seed application");
        app_ids.push(id);
    }

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/company/offers/{}/slots", offer_id),
            &company_auth,
            json!({ "slots": [
                { "date": "2027-01-15", "start_time": "14:00:00", "end_time": "14:30:00", "location": "HQ" }
            ]}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let slot_id = body_json(resp).await["slots"][0]["id"].as_i64().unwrap();

    let req_a = json_request(
        "POST",
        &format!("/api/student/applications/{}/slot", app_ids[0]),
        &token_for(student_a, "student"),
        json!({ "slot_id": slot_id }),
    );
    let req_b = json_request(
        "POST",
        &format!("/api/student/applications/{}/slot", app_ids[1]),
        &token_for(student_b, "student"),
        json!({ "slot_id": slot_id }),
    );

    let (resp_a, resp_b) = tokio::join!(app.clone().oneshot(req_a), app.clone().oneshot(req_b));
    let (status_a, status_b) = (resp_a.unwrap().status(), resp_b.unwrap().status());

    let outcomes = [status_a, status_b];
    assert_eq!(
        outcomes.iter().filter(|s| **s == StatusCode::OK).count(),
        1,
        "exactly one booking must win, got {:?}",
        outcomes
    );
    assert_eq!(
        outcomes
            .iter()
            .filter(|s| **s == StatusCode::CONFLICT)
            .count(),
        1,
        "the loser must get a conflict, got {:?}",
        outcomes
    );
}

// Interview-stage application with a booked, selected slot, ready for the
// final decision.
async fn seed_interview_application(pool: &sqlx::PgPool, offer_id: i64, student_id: Uuid) -> i64 {
    let slot_id: i64 = sqlx::query_scalar(
        r#"INSERT INTO interview_slots (offer_id, date, start_time, end_time, is_booked)
           VALUES ($1, '2027-01-20', '09:00:00', '09:30:00', TRUE) RETURNING id"#,
    )
    .bind(offer_id)
    .fetch_one(pool)
    .await
    .expect("seed slot");

    sqlx::query_scalar(
        r#"INSERT INTO internship_applications
               (offer_id, student_id, cv_file, status, match_status, selected_slot_id)
           VALUES ($1, $2, 'uploads/cv/seeded.pdf', 1, 4, $3) RETURNING id"#,
    )
    .bind(offer_id)
    .bind(student_id)
    .bind(slot_id)
    .fetch_one(pool)
    .await
    .expect("seed application")
}

#[tokio::test]
async fn last_position_has_a_single_acceptance() {
    let Some((app, pool)) = build_app().await else {
        return;
    };
    let company = seed_user(&pool, "company").await;
    let student_a = seed_user(&pool, "student").await;
    let student_b = seed_user(&pool, "student").await;
    let admin = seed_user(&pool, "administrator").await;
    let company_auth = token_for(company, "company");
    let admin_auth = token_for(admin, "administrator");

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/company/offers",
            &company_auth,
            offer_payload("Security Intern", 1),
        ))
        .await
        .unwrap();
    let offer_id = body_json(resp).await["offer"]["id"].as_i64().unwrap();

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/admin/offers/{}/review", offer_id),
            &admin_auth,
            json!({ "decision": "approved" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let app_a = seed_interview_application(&pool, offer_id, student_a).await;
    let app_b = seed_interview_application(&pool, offer_id, student_b).await;

    let req_a = json_request(
        "POST",
        &format!("/api/company/applications/{}/decision", app_a),
        &company_auth,
        json!({ "decision": "accepted" }),
    );
    let req_b = json_request(
        "POST",
        &format!("/api/company/applications/{}/decision", app_b),
        &company_auth,
        json!({ "decision": "accepted" }),
    );

    let (resp_a, resp_b) = tokio::join!(app.clone().oneshot(req_a), app.clone().oneshot(req_b));
    let outcomes = [resp_a.unwrap().status(), resp_b.unwrap().status()];

    assert_eq!(
        outcomes.iter().filter(|s| **s == StatusCode::OK).count(),
        1,
        "exactly one acceptance must win the last position, got {:?}",
        outcomes
    );
    assert_eq!(
        outcomes
            .iter()
            .filter(|s| **s == StatusCode::CONFLICT)
            .count(),
        1,
        "the loser must get a conflict, got {:?}",
        outcomes
    );

    let accepted: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM internship_applications WHERE offer_id = $1 AND status = 2"#,
    )
    .bind(offer_id)
    .fetch_one(&pool)
    .await
    .expect("accepted count");
    assert_eq!(accepted, 1);
}

#[tokio::test]
async fn failed_promotion_rolls_back_acceptance() {
    let Some((app, pool)) = build_app().await else {
        return;
    };
    // A display name longer than the internships.company_name column makes
    // the promotion insert fail after the status update.
    let company = Uuid::new_v4();
    sqlx::query(
        r#"INSERT INTO users (id, username, email, first_name, last_name, role)
           VALUES ($1, $2, $3, $4, $5, 'company')"#,
    )
    .bind(company)
    .bind(format!("company_{}", company.simple()))
    .bind(format!("company_{}@example.com", company.simple()))
    .bind("x".repeat(150))
    .bind("y".repeat(150))
    .execute(&pool)
    .await
    .expect("seed company");

    let student = seed_user(&pool, "student").await;
    let admin = seed_user(&pool, "administrator").await;
    let company_auth = token_for(company, "company");
    let admin_auth = token_for(admin, "administrator");

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/company/offers",
            &company_auth,
            offer_payload("Ops Intern", 1),
        ))
        .await
        .unwrap();
    let offer_id = body_json(resp).await["offer"]["id"].as_i64().unwrap();

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/admin/offers/{}/review", offer_id),
            &admin_auth,
            json!({ "decision": "approved" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let application_id = seed_interview_application(&pool, offer_id, student).await;

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/company/applications/{}/decision", application_id),
            &company_auth,
            json!({ "decision": "accepted" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // The whole acceptance rolled back: still at Interview, nothing linked,
    // no internship row.
    let row = sqlx::query(
        r#"SELECT status, created_internship_id FROM internship_applications WHERE id = $1"#,
    )
    .bind(application_id)
    .fetch_one(&pool)
    .await
    .expect("application row");
    use sqlx::Row;
    assert_eq!(row.get::<i32, _>("status"), 1);
    assert!(row.get::<Option<i64>, _>("created_internship_id").is_none());

    let internships: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM internships WHERE student_id = $1"#)
            .bind(student)
            .fetch_one(&pool)
            .await
            .expect("internship count");
    assert_eq!(internships, 0);
}

#[tokio::test]
async fn notification_outbox_marks_claimed_rows_delivered() {
    let Some((_app, pool)) = build_app().await else {
        return;
    };
    let recipient = seed_user(&pool, "company").await;

    let notification_id: i64 = sqlx::query_scalar(
        r#"INSERT INTO notifications (recipient_id, message, delivery)
           VALUES ($1, 'outbox check', 0) RETURNING id"#,
    )
    .bind(recipient)
    .fetch_one(&pool)
    .await
    .expect("seed notification");

    // No webhook configured: the worker marks rows delivered as it drains.
    let outbox =
        internship_backend::services::notification_service::NotificationService::new(
            pool.clone(),
            None,
        );
    for _ in 0..200 {
        let status: i32 =
            sqlx::query_scalar(r#"SELECT delivery FROM notifications WHERE id = $1"#)
                .bind(notification_id)
                .fetch_one(&pool)
                .await
                .expect("delivery status");
        if status == 1 {
            return;
        }
        outbox.run_once().await.expect("outbox worker");
    }
    panic!("notification was never delivered");
}

#[tokio::test]
async fn pending_offers_only_editable_state() {
    let Some((app, pool)) = build_app().await else {
        return;
    };
    let company = seed_user(&pool, "company").await;
    let admin = seed_user(&pool, "administrator").await;
    let company_auth = token_for(company, "company");
    let admin_auth = token_for(admin, "administrator");

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/company/offers",
            &company_auth,
            offer_payload("Design Intern", 1),
        ))
        .await
        .unwrap();
    let offer_id = body_json(resp).await["offer"]["id"].as_i64().unwrap();

    // Editable while pending.
    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/company/offers/{}", offer_id),
            &company_auth,
            json!({ "title": "Design Intern (updated)" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/admin/offers/{}/review", offer_id),
            &admin_auth,
            json!({ "decision": "approved" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Not anymore once approved.
    let resp = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/company/offers/{}", offer_id),
            &company_auth,
            json!({ "title": "Too late" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "Can only edit pending offers");
}
