use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::models::user::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

/// The authenticated caller, resolved once by the auth middleware and read
/// by handlers via `Extension<AuthUser>`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

fn unauthorized(reason: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": reason }))).into_response()
}

fn resolve_caller(req: &Request) -> std::result::Result<AuthUser, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(unauthorized("missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(unauthorized("bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(unauthorized("unsupported_scheme"));
    };

    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|_| unauthorized("invalid_token"))?;

    let Ok(id) = Uuid::parse_str(&data.claims.sub) else {
        return Err(unauthorized("invalid_subject"));
    };
    let Some(role) = data.claims.role.as_deref().and_then(Role::parse) else {
        return Err(unauthorized("unknown_role"));
    };

    Ok(AuthUser { id, role })
}

/// Single role predicate gating every pipeline operation; resource ownership
/// is checked per-entity inside the services.
async fn require_role(mut req: Request, next: Next, allowed: Option<Role>) -> Response {
    let caller = match resolve_caller(&req) {
        Ok(caller) => caller,
        Err(resp) => return resp,
    };

    if let Some(required) = allowed {
        if caller.role != required {
            return (StatusCode::FORBIDDEN, Json(json!({"error":"forbidden"}))).into_response();
        }
    }

    req.extensions_mut().insert(caller);
    next.run(req).await
}

pub async fn require_auth(req: Request, next: Next) -> Response {
    require_role(req, next, None).await
}

pub async fn require_company(req: Request, next: Next) -> Response {
    require_role(req, next, Some(Role::Company)).await
}

pub async fn require_student(req: Request, next: Next) -> Response {
    require_role(req, next, Some(Role::Student)).await
}

pub async fn require_admin(req: Request, next: Next) -> Response {
    require_role(req, next, Some(Role::Administrator)).await
}
