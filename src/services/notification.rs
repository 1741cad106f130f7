//! Notification services - Lettura e gestione delle notifiche dell'utente

use crate::core::{AppError, AppState};
use crate::dtos::{
    CreateNotificationDTO, MarkAllReadResultDTO, NotificationDTO, NotificationPageDTO,
    NotificationPutBody, NotificationsQuery, RelayEvent, UnreadCountDTO, UnreadCountQuery,
};
use crate::entities::{Notification, User};
use crate::repositories::{Create, Delete, Read};
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Salva la notifica e la pubblica su `user:{recipient}`.
/// Best-effort: un errore viene loggato e non interrompe l'operazione principale.
#[instrument(skip(state, data), fields(recipient_id = data.recipient_id, kind = ?data.notification_type))]
pub(crate) async fn notify(state: &AppState, data: CreateNotificationDTO) {
    match state.notification.create(&data).await {
        Ok(notification) => {
            debug!("Notification {} stored", notification.notification_id);
            let recipient_id = notification.recipient_id;
            state.relay.publish_to_user(
                recipient_id,
                RelayEvent::NotificationNew(NotificationDTO::from(notification)),
            );
        }
        Err(e) => warn!("Failed to store notification: {:?}", e),
    }
}

/// Carica la notifica e verifica che appartenga all'utente corrente
async fn load_owned(
    state: &AppState,
    notification_id: i64,
    user_id: i64,
) -> Result<Notification, AppError> {
    let notification = state
        .notification
        .read(&notification_id)
        .await?
        .ok_or_else(|| {
            warn!("Notification {} not found", notification_id);
            AppError::not_found("Notification not found")
        })?;

    if notification.recipient_id != user_id {
        warn!("Notification {} belongs to another user", notification_id);
        return Err(AppError::forbidden("This notification belongs to another user"));
    }
    Ok(notification)
}

#[instrument(skip(state, current_user, params), fields(user_id = %current_user.user_id))]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(params): Query<NotificationsQuery>,
) -> Result<Json<NotificationPageDTO>, AppError> {
    debug!("Listing notifications");
    let notifications = state
        .notification
        .find_many_by_recipient(current_user.user_id, &params)
        .await?;
    let unread_count = state
        .notification
        .count_unread(current_user.user_id, None)
        .await?;

    Ok(Json(NotificationPageDTO {
        notifications: notifications.into_iter().map(NotificationDTO::from).collect(),
        unread_count,
    }))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn update_notifications(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<NotificationPutBody>,
) -> Result<Response, AppError> {
    match body {
        NotificationPutBody::Read { notification_id } => {
            let notification = load_owned(&state, notification_id, current_user.user_id).await?;
            if notification.is_read {
                debug!("Notification already read");
                return Ok(Json(NotificationDTO::from(notification)).into_response());
            }
            let updated = state.notification.mark_as_read(notification_id).await?;
            info!("Notification {} marked as read", notification_id);
            Ok(Json(NotificationDTO::from(updated)).into_response())
        }
        NotificationPutBody::ReadAll { category } => {
            let updated = state
                .notification
                .mark_all_as_read(current_user.user_id, category)
                .await?;
            info!("Marked {} notifications as read", updated);
            Ok(Json(MarkAllReadResultDTO { updated }).into_response())
        }
    }
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn get_unread_count(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(params): Query<UnreadCountQuery>,
) -> Result<Json<UnreadCountDTO>, AppError> {
    let unread_count = state
        .notification
        .count_unread(current_user.user_id, params.category)
        .await?;
    Ok(Json(UnreadCountDTO { unread_count }))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(notification_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    load_owned(&state, notification_id, current_user.user_id).await?;
    state.notification.delete(&notification_id).await?;
    info!("Notification {} deleted", notification_id);
    Ok(StatusCode::NO_CONTENT)
}
