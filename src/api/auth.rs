use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{ErrorBody, Result},
    server::Server,
    user::{self, NewUser, UserInfo},
};

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = NewUser,
    responses(
        (status = 201, body = AuthResponse),
        (status = 400, body = ErrorBody),
        (status = 409, description = "username or email taken", body = ErrorBody),
    )
)]
pub async fn register(
    State(server): State<Arc<Server>>,
    Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let user = user::create_user(&server.database, req).await?;
    let token = server.tokens.issue(&user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, body = AuthResponse),
        (status = 401, body = ErrorBody),
    )
)]
pub async fn login(
    State(server): State<Arc<Server>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user = user::login(&server.database, &req.username, &req.password).await?;
    let token = server.tokens.issue(&user)?;
    Ok(Json(AuthResponse { token, user }))
}

pub fn get_auth_scope() -> Router<Arc<Server>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}
