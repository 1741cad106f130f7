//! User services - Ricerca utenti, profilo, privacy e presenza

use crate::core::{AppError, AppState};
use crate::dtos::{PresenceDTO, PresencePingDTO, UpdatePrivacyDTO, UserDTO, UserSearchQuery};
use crate::entities::User;
use crate::repositories::{Read, Update};
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

#[instrument(skip(state), fields(search = %params.search))]
pub async fn search_user_with_username(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserSearchQuery>, // query params /users?search=username
) -> Result<Json<Vec<UserDTO>>, AppError> {
    debug!("Searching users with partial username");
    let users = state.user.search_by_username_partial(&params.search).await?;
    info!("Found {} users matching search criteria", users.len());
    Ok(Json(users.into_iter().map(UserDTO::from).collect()))
}

/// Profilo pubblico con lo stato di presenza
#[instrument(skip(state))]
pub async fn get_user_by_id(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserDTO>, AppError> {
    let user = state.user.read(&user_id).await?.ok_or_else(|| {
        warn!("User not found");
        AppError::not_found("User not found")
    })?;

    let mut dto = UserDTO::from(user);
    dto.online = Some(state.presence.status(user_id).online);
    Ok(Json(dto))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn update_my_privacy(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<UpdatePrivacyDTO>,
) -> Result<Json<UserDTO>, AppError> {
    body.validate()?;
    let updated = state.user.update(&current_user.user_id, &body).await?;
    info!(
        connection_privacy = ?updated.connection_privacy,
        message_privacy = ?updated.message_privacy,
        "Privacy settings updated"
    );
    Ok(Json(UserDTO::from(updated)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn ping_presence(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<PresencePingDTO>,
) -> Result<Json<PresenceDTO>, AppError> {
    state.presence.ping(current_user.user_id, body.online);
    Ok(Json(state.presence.status(current_user.user_id)))
}
