//! Chat services - Gestione operazioni sulle chat

use crate::core::privacy::can_message;
use crate::core::{AppError, AppState, require_admin};
use crate::dtos::{
    ChatDTO, CreateChatDTO, CreateChatRequestDTO, NewParticipant, ParticipantDTO,
    UpdateChatSettingsDTO,
};
use crate::entities::{Chat, ChatParticipant, ChatType, User};
use crate::repositories::{Create, Read, ReadMany, Update};
use axum::{
    Extension,
    extract::{Json, Path, State},
    http::StatusCode,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Chat con i suoi partecipanti (inclusi quelli usciti)
pub(crate) async fn load_chat_dto(state: &AppState, chat: Chat) -> Result<ChatDTO, AppError> {
    let participants = state.participant.find_many_by_chat(chat.chat_id).await?;
    Ok(ChatDTO::new(chat, participants))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.user_id))]
pub async fn list_chats(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<Vec<ChatDTO>>, AppError> {
    debug!("Listing chats for user");
    // 1. Recuperare le chat dove l'utente è partecipante attivo (singola query)
    // 2. Recuperare i partecipanti di tutte le chat con una sola query IN
    // 3. Raggruppare in memoria e costruire i ChatDTO
    let chats = state.chat.find_many_for_user(current_user.user_id).await?;
    let chat_ids: Vec<i64> = chats.iter().map(|c| c.chat_id).collect();

    let mut participants_by_chat: HashMap<i64, Vec<ChatParticipant>> = HashMap::new();
    for participant in state.participant.find_many_by_chats(&chat_ids).await? {
        participants_by_chat
            .entry(participant.chat_id)
            .or_default()
            .push(participant);
    }

    let chats_dto: Vec<ChatDTO> = chats
        .into_iter()
        .map(|chat| {
            let participants = participants_by_chat.remove(&chat.chat_id).unwrap_or_default();
            ChatDTO::new(chat, participants)
        })
        .collect();

    info!("Successfully retrieved {} chats", chats_dto.len());
    Ok(Json(chats_dto))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.user_id, chat_type = ?body.chat_type))]
pub async fn create_chat(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Json(body): Json<CreateChatRequestDTO>,
) -> Result<(StatusCode, Json<ChatDTO>), AppError> {
    body.validate()?;

    // il creatore è sempre partecipante, gli altri sono deduplicati
    let mut others: Vec<i64> = body
        .participant_ids
        .iter()
        .copied()
        .filter(|id| *id != current_user.user_id)
        .collect();
    others.sort_unstable();
    others.dedup();

    match body.chat_type {
        ChatType::Direct => {
            // CASO DIRECT:
            // 1. Esattamente un altro partecipante, che deve esistere
            // 2. FORBIDDEN se la privacy del destinatario non consente messaggi
            // 3. Se esiste già una chat diretta tra i due la si restituisce con 200
            // 4. Altrimenti si crea con entrambi i partecipanti e si restituisce 201
            let [other_id] = others.as_slice() else {
                warn!("Direct chat requested with {} other participants", others.len());
                return Err(AppError::bad_request(
                    "A direct chat needs exactly one other participant",
                ));
            };
            let other_id = *other_id;

            let other = state.user.read(&other_id).await?.ok_or_else(|| {
                warn!("User {} not found", other_id);
                AppError::not_found("User not found")
            })?;

            can_message(&state, current_user.user_id, &other)
                .await?
                .into_result()?;

            if let Some(existing) = state
                .chat
                .find_direct_between(current_user.user_id, other_id)
                .await?
            {
                info!("Returning existing direct chat {}", existing.chat_id);
                return Ok((StatusCode::OK, Json(load_chat_dto(&state, existing).await?)));
            }

            let created = state
                .chat
                .create(&CreateChatDTO {
                    chat_type: ChatType::Direct,
                    name: None,
                    description: None,
                    avatar_url: None,
                    settings: body.settings.unwrap_or_default(),
                    created_by: current_user.user_id,
                    participants: vec![
                        NewParticipant {
                            user_id: current_user.user_id,
                            is_admin: false,
                        },
                        NewParticipant {
                            user_id: other_id,
                            is_admin: false,
                        },
                    ],
                })
                .await;

            let chat = match created {
                Ok(chat) => chat,
                // un'altra richiesta ha creato la stessa chat nel frattempo
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    let existing = state
                        .chat
                        .find_direct_between(current_user.user_id, other_id)
                        .await?
                        .ok_or_else(|| AppError::conflict("Direct chat already exists"))?;
                    info!("Direct chat {} created concurrently", existing.chat_id);
                    return Ok((StatusCode::OK, Json(load_chat_dto(&state, existing).await?)));
                }
                Err(e) => return Err(e.into()),
            };

            state.relay.join_chat(current_user.user_id, chat.chat_id);
            state.relay.join_chat(other_id, chat.chat_id);
            info!("Direct chat {} created", chat.chat_id);

            Ok((StatusCode::CREATED, Json(load_chat_dto(&state, chat).await?)))
        }

        ChatType::Group | ChatType::Project => {
            // CASO GROUP/PROJECT:
            // 1. Il nome è obbligatorio
            // 2. Tutti i partecipanti indicati devono esistere
            // 3. Il creatore è amministratore
            let name = body
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| AppError::bad_request("Group and project chats need a name"))?
                .to_string();

            let found = state.user.read_many(&others).await?;
            if found.len() != others.len() {
                warn!("Some participants do not exist");
                return Err(AppError::not_found("One or more participants not found"));
            }

            let mut participants = vec![NewParticipant {
                user_id: current_user.user_id,
                is_admin: true,
            }];
            participants.extend(others.iter().map(|&user_id| NewParticipant {
                user_id,
                is_admin: false,
            }));

            let chat = state
                .chat
                .create(&CreateChatDTO {
                    chat_type: body.chat_type,
                    name: Some(name),
                    description: body.description.clone(),
                    avatar_url: body.avatar_url.clone(),
                    settings: body.settings.clone().unwrap_or_default(),
                    created_by: current_user.user_id,
                    participants,
                })
                .await?;

            state.relay.join_chat(current_user.user_id, chat.chat_id);
            for user_id in &others {
                state.relay.join_chat(*user_id, chat.chat_id);
            }
            info!("{:?} chat {} created", chat.chat_type, chat.chat_id);

            Ok((StatusCode::CREATED, Json(load_chat_dto(&state, chat).await?)))
        }
    }
}

#[instrument(skip(state, participant), fields(user_id = %participant.user_id))]
pub async fn leave_chat(
    State(state): State<Arc<AppState>>,
    Extension(participant): Extension<ChatParticipant>, // inserito dal chat_participant_middleware
    Path(chat_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    // 1. Le chat dirette non si possono abbandonare
    // 2. L'ultimo admin attivo non può uscire finché restano altri partecipanti attivi
    // 3. La riga viene mantenuta con is_active = false e left_at
    let chat = state
        .chat
        .read(&chat_id)
        .await?
        .ok_or_else(|| AppError::not_found("Chat not found"))?;

    if chat.chat_type == ChatType::Direct {
        return Err(AppError::conflict("Direct chats cannot be left"));
    }

    if participant.is_admin {
        let admins = state.participant.count_active_admins(chat_id).await?;
        let active = state.participant.count_active(chat_id).await?;
        if admins <= 1 && active > 1 {
            warn!("Last admin tried to leave chat {}", chat_id);
            return Err(AppError::conflict(
                "The last admin cannot leave while other participants remain",
            ));
        }
    }

    state
        .participant
        .deactivate(chat_id, participant.user_id)
        .await?;
    state.relay.leave_chat(participant.user_id, chat_id);

    info!("User {} left chat {}", participant.user_id, chat_id);
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, participant, body), fields(user_id = %participant.user_id))]
pub async fn update_chat_settings(
    State(state): State<Arc<AppState>>,
    Extension(participant): Extension<ChatParticipant>,
    Path(chat_id): Path<i64>,
    Json(body): Json<UpdateChatSettingsDTO>,
) -> Result<Json<ChatDTO>, AppError> {
    require_admin(&participant)?;
    body.validate()?;

    let chat = state.chat.update(&chat_id, &body).await?;
    info!("Settings of chat {} updated", chat_id);
    Ok(Json(load_chat_dto(&state, chat).await?))
}

#[instrument(skip(state, participant), fields(admin_id = %participant.user_id))]
pub async fn add_participant(
    State(state): State<Arc<AppState>>,
    Extension(participant): Extension<ChatParticipant>,
    Path((chat_id, user_id)): Path<(i64, i64)>,
) -> Result<(StatusCode, Json<ParticipantDTO>), AppError> {
    // 1. Solo GROUP/PROJECT, solo admin
    // 2. NOT_FOUND se l'utente non esiste, CONFLICT se è già partecipante attivo
    // 3. Un partecipante uscito viene riattivato
    let chat = state
        .chat
        .read(&chat_id)
        .await?
        .ok_or_else(|| AppError::not_found("Chat not found"))?;
    if chat.chat_type == ChatType::Direct {
        return Err(AppError::bad_request(
            "Participants cannot be added to a direct chat",
        ));
    }
    require_admin(&participant)?;

    if state.user.read(&user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    if state
        .participant
        .read(&(chat_id, user_id))
        .await?
        .is_some_and(|p| p.is_active)
    {
        return Err(AppError::conflict("User is already a participant"));
    }

    let added = state
        .participant
        .upsert_active(chat_id, user_id, false)
        .await?;
    state.relay.join_chat(user_id, chat_id);

    info!("User {} added to chat {}", user_id, chat_id);
    Ok((StatusCode::CREATED, Json(ParticipantDTO::from(added))))
}
