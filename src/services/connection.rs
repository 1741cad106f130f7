//! Connection services - Macchina a stati delle connessioni tra utenti
//!
//! Ogni transizione viene applicata con un update condizionale, quindi due
//! risposte concorrenti alla stessa richiesta producono un solo vincitore e un 409.

use crate::core::privacy::can_request_connection;
use crate::core::{AppError, AppState};
use crate::dtos::{
    BlockDTO, ConnectionDTO, ConnectionDeleteBody, ConnectionPostBody, ConnectionPutBody,
    ConnectionsQuery, CreateConnectionDTO, CreateNotificationDTO, RelayEvent,
};
use crate::entities::{
    Connection, ConnectionDecision, ConnectionStatus, NotificationType, RequestPlan, User,
};
use crate::repositories::{Create, Read};
use crate::services::notification::notify;
use axum::{
    Extension,
    extract::{Json, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

#[instrument(skip(state, current_user, params), fields(user_id = %current_user.user_id))]
pub async fn list_connections(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Query(params): Query<ConnectionsQuery>,
) -> Result<Json<Vec<ConnectionDTO>>, AppError> {
    let connections = state
        .connection
        .find_many_by_user(current_user.user_id, &params)
        .await?;
    debug!("Found {} connections", connections.len());
    Ok(Json(connections.into_iter().map(ConnectionDTO::from).collect()))
}

#[instrument(skip(state, current_user, body), fields(sender_id = %current_user.user_id))]
pub async fn create_connection(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<ConnectionPostBody>,
) -> Result<(StatusCode, Json<ConnectionDTO>), AppError> {
    let ConnectionPostBody::Request(request) = body;
    // 1. Validare il body e rifiutare le richieste verso sé stessi
    // 2. NOT_FOUND se il destinatario non esiste
    // 3. FORBIDDEN se c'è un blocco o la privacy del destinatario lo vieta
    // 4. CONFLICT se esiste già una connessione attiva in una delle due direzioni
    // 5. Inserire la riga PENDING o riusare una riga DECLINED nella stessa direzione
    // 6. Notificare il destinatario
    request.validate()?;

    if request.receiver_id == current_user.user_id {
        return Err(AppError::bad_request("You cannot connect with yourself"));
    }

    let receiver = state
        .user
        .read(&request.receiver_id)
        .await?
        .ok_or_else(|| {
            warn!("Receiver {} not found", request.receiver_id);
            AppError::not_found("User not found")
        })?;

    can_request_connection(&state, current_user.user_id, &receiver)
        .await?
        .into_result()?;

    let forward = state
        .connection
        .find_between(current_user.user_id, receiver.user_id)
        .await?;
    let reverse = state
        .connection
        .find_between(receiver.user_id, current_user.user_id)
        .await?;

    let connection = match Connection::plan_request(forward.as_ref(), reverse.as_ref())? {
        RequestPlan::Insert => {
            state
                .connection
                .create(&CreateConnectionDTO {
                    sender_id: current_user.user_id,
                    receiver_id: receiver.user_id,
                    connection_type: request.connection_type,
                    message: request.message.clone(),
                })
                .await?
        }
        RequestPlan::Reset(connection_id) => state
            .connection
            .reset_to_pending(
                connection_id,
                request.connection_type,
                request.message.as_deref(),
            )
            .await?
            .ok_or_else(|| AppError::conflict("Connection changed concurrently, retry"))?,
    };
    info!("Connection request {} created", connection.connection_id);

    let dto = ConnectionDTO::from(connection);
    notify(
        &state,
        CreateNotificationDTO {
            recipient_id: receiver.user_id,
            sender_id: Some(current_user.user_id),
            notification_type: NotificationType::ConnectionRequest,
            title: "New connection request".to_string(),
            message: format!("{} wants to connect with you", current_user.username),
            action_url: Some("/connections".to_string()),
        },
    )
    .await;
    state
        .relay
        .publish_to_user(receiver.user_id, RelayEvent::ConnectionRequested(dto.clone()));

    Ok((StatusCode::CREATED, Json(dto)))
}

#[instrument(skip(state, current_user, body), fields(responder_id = %current_user.user_id))]
pub async fn respond_connection(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<ConnectionPutBody>,
) -> Result<Json<ConnectionDTO>, AppError> {
    let ConnectionPutBody::Respond {
        connection_id,
        decision,
    } = body;

    let connection = state
        .connection
        .read(&connection_id)
        .await?
        .ok_or_else(|| AppError::not_found("Connection not found"))?;

    connection.check_respond(current_user.user_id)?;

    let new_status = ConnectionStatus::from(decision);
    let updated = state
        .connection
        .update_status_if_pending(connection_id, new_status)
        .await?
        .ok_or_else(|| {
            warn!("Connection {} was answered concurrently", connection_id);
            AppError::conflict("Connection request is no longer pending")
        })?;

    let sender_id = updated.sender_id;
    let dto = ConnectionDTO::from(updated);
    let (notification_type, title, message, event) = match decision {
        ConnectionDecision::Accepted => (
            NotificationType::ConnectionAccepted,
            "Connection accepted",
            format!("{} accepted your connection request", current_user.username),
            RelayEvent::ConnectionAccepted(dto.clone()),
        ),
        ConnectionDecision::Declined => (
            NotificationType::ConnectionDeclined,
            "Connection declined",
            format!("{} declined your connection request", current_user.username),
            RelayEvent::ConnectionDeclined(dto.clone()),
        ),
    };

    notify(
        &state,
        CreateNotificationDTO {
            recipient_id: sender_id,
            sender_id: Some(current_user.user_id),
            notification_type,
            title: title.to_string(),
            message,
            action_url: Some("/connections".to_string()),
        },
    )
    .await;
    state.relay.publish_to_user(sender_id, event);

    info!("Connection {} answered with {:?}", connection_id, decision);
    Ok(Json(dto))
}

#[instrument(skip(state, current_user, body), fields(requester_id = %current_user.user_id))]
pub async fn withdraw_connection(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<ConnectionDeleteBody>,
) -> Result<StatusCode, AppError> {
    let ConnectionDeleteBody::Withdraw { connection_id } = body;

    let connection = state
        .connection
        .read(&connection_id)
        .await?
        .ok_or_else(|| AppError::not_found("Connection not found"))?;

    connection.check_withdraw(current_user.user_id)?;

    if !state
        .connection
        .delete_if_pending(connection_id, current_user.user_id)
        .await?
    {
        return Err(AppError::conflict("Connection request is no longer pending"));
    }

    info!("Connection request {} withdrawn", connection_id);
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, current_user), fields(blocker_id = %current_user.user_id))]
pub async fn block_user(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<BlockDTO>,
) -> Result<Json<ConnectionDTO>, AppError> {
    // 1. BAD_REQUEST se l'utente prova a bloccare sé stesso, NOT_FOUND se il target non esiste
    // 2. Upsert della riga (blocker -> target) a BLOCKED, qualunque fosse lo stato precedente
    // 3. Rimuovere i follow tra i due utenti
    // 4. Notificare il target solo alla prima transizione verso BLOCKED
    if body.target_id == current_user.user_id {
        return Err(AppError::bad_request("You cannot block yourself"));
    }

    if state.user.read(&body.target_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let (blocked, newly_blocked) = state
        .connection
        .upsert_block(current_user.user_id, body.target_id)
        .await?;
    let removed_follows = state
        .follow
        .delete_between(current_user.user_id, body.target_id)
        .await?;
    debug!("Removed {} follows", removed_follows);

    if newly_blocked {
        info!("User {} blocked {}", current_user.user_id, body.target_id);
        notify(
            &state,
            CreateNotificationDTO {
                recipient_id: body.target_id,
                sender_id: Some(current_user.user_id),
                notification_type: NotificationType::ConnectionBlocked,
                title: "Connection blocked".to_string(),
                message: format!("{} blocked you", current_user.username),
                action_url: None,
            },
        )
        .await;
        state.relay.publish_to_user(
            body.target_id,
            RelayEvent::ConnectionBlocked {
                blocker_id: current_user.user_id,
            },
        );
    } else {
        debug!("User was already blocked, no notification");
    }

    Ok(Json(ConnectionDTO::from(blocked)))
}

#[instrument(skip(state, current_user), fields(blocker_id = %current_user.user_id))]
pub async fn unblock_user(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<BlockDTO>,
) -> Result<StatusCode, AppError> {
    if !state
        .connection
        .delete_block(current_user.user_id, body.target_id)
        .await?
    {
        return Err(AppError::not_found("You have not blocked this user"));
    }
    info!("User {} unblocked {}", current_user.user_id, body.target_id);
    Ok(StatusCode::NO_CONTENT)
}
