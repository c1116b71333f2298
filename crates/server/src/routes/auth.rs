use std::{sync::Arc, time::Instant};

use axum::{
    extract::{rejection::JsonRejection, OriginalUri, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;

use service::auth::{
    domain::{AuthSession, LoginInput, RegisterInput},
    validation::{validate_login, validate_register},
    AuthService,
};

use crate::audit::{self, AuthEvent};
use crate::errors::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
}

#[derive(Debug, Serialize)]
pub struct RegisterOutput {
    pub message: String,
    pub username: String,
}

pub const REGISTERED_MESSAGE: &str = "User registered successfully";

pub async fn register(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Result<Json<RegisterInput>, JsonRejection>,
) -> Result<Json<RegisterOutput>, ApiError> {
    let started = Instant::now();
    let path = uri.path();
    let client_ip = audit::client_ip(&headers);

    let Json(input) = body.map_err(|rej| {
        audit::record(AuthEvent::Register, "", &client_ip, StatusCode::BAD_REQUEST, Some("malformed body"), started.elapsed());
        ApiError::bad_request(rej.body_text(), path)
    })?;
    let username = input.username.clone();

    if let Err(e) = validate_register(&input) {
        let err = ApiError::from_auth(&e, path);
        audit::record(AuthEvent::Register, &username, &client_ip, err.status, Some(&err.message), started.elapsed());
        return Err(err);
    }

    match state.auth.register(input).await {
        Ok(out) => {
            audit::record(AuthEvent::Register, &out.username, &client_ip, StatusCode::OK, None, started.elapsed());
            Ok(Json(RegisterOutput { message: REGISTERED_MESSAGE.to_string(), username: out.username }))
        }
        Err(e) => {
            let err = ApiError::from_auth(&e, path);
            audit::record(AuthEvent::Register, &username, &client_ip, err.status, Some(&err.message), started.elapsed());
            Err(err)
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Result<Json<LoginInput>, JsonRejection>,
) -> Result<Json<AuthSession>, ApiError> {
    let started = Instant::now();
    let path = uri.path();
    let client_ip = audit::client_ip(&headers);

    let Json(input) = body.map_err(|rej| {
        audit::record(AuthEvent::Login, "", &client_ip, StatusCode::BAD_REQUEST, Some("malformed body"), started.elapsed());
        ApiError::bad_request(rej.body_text(), path)
    })?;
    let username = input.username.clone();

    if let Err(e) = validate_login(&input) {
        let err = ApiError::from_auth(&e, path);
        audit::record(AuthEvent::Login, &username, &client_ip, err.status, Some(&err.message), started.elapsed());
        return Err(err);
    }

    match state.auth.authenticate(input).await {
        Ok(session) => {
            audit::record(AuthEvent::Login, &session.username, &client_ip, StatusCode::OK, None, started.elapsed());
            Ok(Json(session))
        }
        Err(e) => {
            let err = ApiError::from_auth(&e, path);
            audit::record(AuthEvent::Login, &username, &client_ip, err.status, Some(&err.message), started.elapsed());
            Err(err)
        }
    }
}
