use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;

use crate::errors::CoreError;
use crate::server::app::AppState;
use crate::server::auth::AuthUser;
use crate::services::auth_service::{AuthService, LoginSession};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginSession>, CoreError> {
    let session = AuthService::new(state.db)
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(session))
}

pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<StatusCode, CoreError> {
    AuthService::new(state.db).logout(&user.session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
