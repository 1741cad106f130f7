//! Message services - Invio, lettura, modifica e conferme di lettura dei messaggi

use crate::core::{AppError, AppState};
use crate::dtos::{
    CreateMessageDTO, CreateNotificationDTO, MarkReadResultDTO, MessageDTO, MessagesQuery,
    ReactionDTO, ReactionToggledDTO, ReadReceiptDTO, RelayEvent, SendMessageDTO,
    UpdateMessageDTO,
};
use crate::entities::{ChatParticipant, ChatType, Message, MessageType, NotificationType, User};
use crate::repositories::{Create, Read, Update};
use crate::services::notification::notify;
use axum::{
    Extension,
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Lunghezza massima dell'anteprima nelle notifiche NEW_MESSAGE
const PREVIEW_CHARS: usize = 100;

fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// Messaggio della chat indicata, 404 se non esiste o appartiene a un'altra chat
async fn load_message(state: &AppState, chat_id: i64, message_id: i64) -> Result<Message, AppError> {
    state
        .msg
        .read(&message_id)
        .await?
        .filter(|m| m.chat_id == chat_id)
        .ok_or_else(|| {
            warn!("Message {} not found in chat {}", message_id, chat_id);
            AppError::not_found("Message not found")
        })
}

/// Messaggio con conferme di lettura e reazioni aggiornate
async fn load_message_dto(state: &AppState, message: Message) -> Result<MessageDTO, AppError> {
    let ids = [message.message_id];
    let receipts = state.msg.find_read_receipts(&ids).await?;
    let reactions = state.msg.find_reactions(&ids).await?;
    MessageDTO::assemble(vec![message], receipts, reactions)
        .pop()
        .ok_or_else(|| AppError::internal_server_error("Failed to assemble message"))
}

#[instrument(skip(state, participant, params), fields(user_id = %participant.user_id))]
pub async fn get_chat_messages(
    State(state): State<Arc<AppState>>,
    Extension(participant): Extension<ChatParticipant>, // la membership è verificata dal middleware
    Path(chat_id): Path<i64>,
    Query(params): Query<MessagesQuery>,
) -> Result<Json<Vec<MessageDTO>>, AppError> {
    // 1. Pagina di messaggi dal più recente, con i cursori before/before_id
    // 2. Conferme di lettura e reazioni di tutta la pagina con due query IN
    // 3. Composizione in memoria
    let messages = state.msg.find_many_paginated(chat_id, &params).await?;
    let ids: Vec<i64> = messages.iter().map(|m| m.message_id).collect();

    let receipts = state.msg.find_read_receipts(&ids).await?;
    let reactions = state.msg.find_reactions(&ids).await?;

    let dtos = MessageDTO::assemble(messages, receipts, reactions);
    info!("Retrieved {} messages", dtos.len());
    Ok(Json(dtos))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(chat_id): Path<i64>,
    Json(body): Json<SendMessageDTO>,
) -> Result<(StatusCode, Json<MessageDTO>), AppError> {
    // 1. Validare contenuto e tipo (SYSTEM è riservato al server)
    // 2. Gli allegati richiedono allow_file_sharing
    // 3. Nelle chat dirette un blocco successivo alla creazione impedisce l'invio
    // 4. Salvare il messaggio con la conferma di lettura del mittente
    // 5. Notificare gli altri partecipanti attivi (se la chat non è silenziata) e pubblicare message:new
    body.validate()?;
    if body.content.trim().is_empty() {
        return Err(AppError::bad_request("Message content cannot be empty"));
    }
    if body.message_type == MessageType::System {
        return Err(AppError::bad_request("System messages cannot be sent by clients"));
    }

    let chat = state
        .chat
        .read(&chat_id)
        .await?
        .ok_or_else(|| AppError::not_found("Chat not found"))?;

    if body.message_type.is_attachment() && !chat.settings.allow_file_sharing {
        return Err(AppError::forbidden("File sharing is disabled in this chat"));
    }

    let participants = state.participant.find_many_by_chat(chat_id).await?;
    let recipients: Vec<i64> = participants
        .iter()
        .filter(|p| p.is_active && p.user_id != current_user.user_id)
        .map(|p| p.user_id)
        .collect();

    if chat.chat_type == ChatType::Direct {
        for other_id in &recipients {
            if state
                .connection
                .is_blocked_between(current_user.user_id, *other_id)
                .await?
            {
                warn!("Message denied by block in direct chat");
                return Err(AppError::forbidden("You cannot message this user"));
            }
        }
    }

    if let Some(reply_to_id) = body.reply_to_id {
        let target = state.msg.read(&reply_to_id).await?;
        if !target.is_some_and(|m| m.chat_id == chat_id) {
            return Err(AppError::bad_request("Reply target must belong to this chat"));
        }
    }

    let message = state
        .msg
        .create(&CreateMessageDTO {
            chat_id,
            sender_id: current_user.user_id,
            content: body.content,
            message_type: body.message_type,
            reply_to_id: body.reply_to_id,
        })
        .await?;
    state.chat.touch(chat_id).await?;
    info!("Message {} stored", message.message_id);

    let mut dto = MessageDTO::from(message);
    dto.read_by = vec![ReadReceiptDTO {
        user_id: current_user.user_id,
        read_at: dto.created_at,
    }];

    if chat.settings.mute_notifications {
        debug!("Chat is muted, skipping notifications");
    } else {
        let title = format!("New message from {}", current_user.username);
        let body_preview = preview(&dto.content);
        join_all(recipients.iter().map(|&recipient_id| {
            notify(
                &state,
                CreateNotificationDTO {
                    recipient_id,
                    sender_id: Some(current_user.user_id),
                    notification_type: NotificationType::NewMessage,
                    title: title.clone(),
                    message: body_preview.clone(),
                    action_url: Some(format!("/chats/{}", chat_id)),
                },
            )
        }))
        .await;
    }

    state
        .relay
        .publish_to_chat(chat_id, RelayEvent::MessageNew(dto.clone()));

    Ok((StatusCode::CREATED, Json(dto)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn edit_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path((chat_id, message_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateMessageDTO>,
) -> Result<Json<MessageDTO>, AppError> {
    body.validate()?;
    if body.content.trim().is_empty() {
        return Err(AppError::bad_request("Message content cannot be empty"));
    }

    let message = load_message(&state, chat_id, message_id).await?;
    if message.sender_id != current_user.user_id {
        return Err(AppError::forbidden("Only the sender can edit this message"));
    }
    if message.is_deleted {
        return Err(AppError::conflict("Deleted messages cannot be edited"));
    }

    let updated = state.msg.update(&message_id, &body).await?;
    let dto = load_message_dto(&state, updated).await?;
    state
        .relay
        .publish_to_chat(chat_id, RelayEvent::MessageUpdated(dto.clone()));

    info!("Message {} edited", message_id);
    Ok(Json(dto))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path((chat_id, message_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    let message = load_message(&state, chat_id, message_id).await?;
    if message.sender_id != current_user.user_id {
        return Err(AppError::forbidden("Only the sender can delete this message"));
    }
    if message.is_deleted {
        debug!("Message already deleted");
        return Ok(StatusCode::NO_CONTENT);
    }

    state.msg.soft_delete(message_id).await?;
    let deleted = load_message(&state, chat_id, message_id).await?;
    let dto = load_message_dto(&state, deleted).await?;
    state
        .relay
        .publish_to_chat(chat_id, RelayEvent::MessageUpdated(dto));

    info!("Message {} deleted", message_id);
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id))]
pub async fn toggle_reaction(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path((chat_id, message_id)): Path<(i64, i64)>,
    Json(body): Json<ReactionDTO>,
) -> Result<Json<ReactionToggledDTO>, AppError> {
    body.validate()?;

    let chat = state
        .chat
        .read(&chat_id)
        .await?
        .ok_or_else(|| AppError::not_found("Chat not found"))?;
    if !chat.settings.allow_reactions {
        return Err(AppError::forbidden("Reactions are disabled in this chat"));
    }

    let message = load_message(&state, chat_id, message_id).await?;
    if message.is_deleted {
        return Err(AppError::conflict("Deleted messages cannot receive reactions"));
    }

    let added = state
        .msg
        .toggle_reaction(message_id, current_user.user_id, &body.emoji)
        .await?;

    let dto = load_message_dto(&state, message).await?;
    state
        .relay
        .publish_to_chat(chat_id, RelayEvent::MessageUpdated(dto));

    debug!(added, "Reaction toggled");
    Ok(Json(ReactionToggledDTO {
        message_id,
        emoji: body.emoji,
        added,
    }))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn mark_chat_as_read(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(chat_id): Path<i64>,
) -> Result<Json<MarkReadResultDTO>, AppError> {
    let marked = state
        .msg
        .mark_chat_as_read(chat_id, current_user.user_id)
        .await?;

    if marked > 0 {
        state.relay.publish_to_chat(
            chat_id,
            RelayEvent::ChatRead {
                chat_id,
                user_id: current_user.user_id,
                marked,
            },
        );
    }

    Ok(Json(MarkReadResultDTO { chat_id, marked }))
}
