//! Follow services - Relazioni di follow unilaterali

use crate::core::{AppError, AppState};
use crate::dtos::{CreateNotificationDTO, UserDTO};
use crate::entities::{Follow, NotificationType, User};
use crate::repositories::Read;
use crate::services::notification::notify;
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[instrument(skip(state, current_user), fields(follower_id = %current_user.user_id))]
pub async fn follow_user(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(followee_id): Path<i64>,
) -> Result<(StatusCode, Json<Follow>), AppError> {
    // 1. BAD_REQUEST se l'utente prova a seguire sé stesso
    // 2. NOT_FOUND se l'utente da seguire non esiste
    // 3. FORBIDDEN se esiste un blocco in una delle due direzioni
    // 4. CONFLICT se lo segue già
    // 5. Creare il follow e notificare NEW_FOLLOWER
    if followee_id == current_user.user_id {
        return Err(AppError::bad_request("You cannot follow yourself"));
    }

    if state.user.read(&followee_id).await?.is_none() {
        warn!("Followee {} not found", followee_id);
        return Err(AppError::not_found("User not found"));
    }

    if state
        .connection
        .is_blocked_between(current_user.user_id, followee_id)
        .await?
    {
        warn!("Follow denied by block");
        return Err(AppError::forbidden("You cannot follow this user"));
    }

    if state
        .follow
        .is_following(current_user.user_id, followee_id)
        .await?
    {
        return Err(AppError::conflict("You already follow this user"));
    }

    let follow = state.follow.create(current_user.user_id, followee_id).await?;
    info!("User {} now follows {}", current_user.user_id, followee_id);

    notify(
        &state,
        CreateNotificationDTO {
            recipient_id: followee_id,
            sender_id: Some(current_user.user_id),
            notification_type: NotificationType::NewFollower,
            title: "New follower".to_string(),
            message: format!("{} started following you", current_user.username),
            action_url: Some(format!("/users/{}", current_user.user_id)),
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(follow)))
}

#[instrument(skip(state, current_user), fields(follower_id = %current_user.user_id))]
pub async fn unfollow_user(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(followee_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if !state
        .follow
        .delete_pair(current_user.user_id, followee_id)
        .await?
    {
        return Err(AppError::not_found("You are not following this user"));
    }
    info!("User {} unfollowed {}", current_user.user_id, followee_id);
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_followers(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<UserDTO>>, AppError> {
    if state.user.read(&user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }
    let followers = state.follow.find_followers(user_id).await?;
    Ok(Json(followers.into_iter().map(UserDTO::from).collect()))
}

#[instrument(skip(state))]
pub async fn list_following(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<UserDTO>>, AppError> {
    if state.user.read(&user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }
    let following = state.follow.find_following(user_id).await?;
    Ok(Json(following.into_iter().map(UserDTO::from).collect()))
}
