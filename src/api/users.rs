use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    auth::AuthUser,
    error::{ErrorBody, Result},
    server::Server,
    user::{self, UserInfo},
};

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer" = [])),
    responses(
        (status = 200, body = Vec<UserInfo>),
        (status = 403, body = ErrorBody),
    )
)]
pub async fn list_users(
    State(server): State<Arc<Server>>,
    auth: AuthUser,
) -> Result<Json<Vec<UserInfo>>> {
    auth.require_instructor()?;
    Ok(Json(user::get_user_list(&server.database).await?))
}

#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    security(("bearer" = [])),
    responses((status = 200, body = UserInfo), (status = 401, body = ErrorBody))
)]
pub async fn me(State(server): State<Arc<Server>>, auth: AuthUser) -> Result<Json<UserInfo>> {
    Ok(Json(user::get_user(&server.database, auth.id).await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer" = [])),
    params(("id" = i64, Path)),
    responses((status = 200, body = UserInfo), (status = 404, body = ErrorBody))
)]
pub async fn get_user(
    State(server): State<Arc<Server>>,
    _auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<UserInfo>> {
    Ok(Json(user::get_user(&server.database, id).await?))
}

pub fn get_users_scope() -> Router<Arc<Server>> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", get(me))
        .route("/{id}", get(get_user))
}
