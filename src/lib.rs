//! Server library - espone i moduli principali per i test

pub mod core;
pub mod dtos;
pub mod entities;
pub mod repositories;
pub mod services;
pub mod ws;

// Re-export dei tipi principali per facilitare l'import
pub use core::{AppError, AppState, auth, config};
pub use services::root;

use axum::{
    Router, middleware,
    routing::{any, get, patch, post},
};
use std::sync::Arc;

/// Crea il router principale dell'applicazione
pub fn create_router(state: Arc<AppState>) -> Router {
    use core::authentication_middleware;
    use ws::ws_handler;

    Router::new()
        .route("/", get(root))
        .nest("/auth", configure_auth_routes())
        .nest("/users", configure_user_routes(state.clone()))
        .nest("/connections", configure_connection_routes(state.clone()))
        .nest("/chats", configure_chat_routes(state.clone()))
        .nest("/notifications", configure_notification_routes(state.clone()))
        .route(
            "/ws",
            any(ws_handler).layer(middleware::from_fn_with_state(
                state.clone(),
                authentication_middleware,
            )),
        )
        .with_state(state)
}

/// Configura le routes di autenticazione (login, register)
fn configure_auth_routes() -> Router<Arc<AppState>> {
    use services::*;
    Router::new()
        .route("/login", post(login_user))
        .route("/register", post(register_user))
}

/// Configura le routes per utenti, privacy, presenza e follow
fn configure_user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", get(search_user_with_username))
        .route("/me/privacy", patch(update_my_privacy))
        .route("/me/presence", post(ping_presence))
        .route("/{user_id}", get(get_user_by_id))
        .route("/{user_id}/follow", post(follow_user).delete(unfollow_user))
        .route("/{user_id}/followers", get(list_followers))
        .route("/{user_id}/following", get(list_following))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

/// Configura le routes della macchina a stati delle connessioni
fn configure_connection_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route(
            "/",
            get(list_connections)
                .post(create_connection)
                .put(respond_connection)
                .delete(withdraw_connection),
        )
        .route("/block", post(block_user).delete(unblock_user))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

/// Configura le routes per la gestione delle chat
fn configure_chat_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::{authentication_middleware, chat_participant_middleware};
    use services::*;

    // Rotte che NON richiedono partecipazione (solo autenticazione)
    let public_routes = Router::new()
        .route("/", get(list_chats).post(create_chat))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            authentication_middleware,
        ));

    // Rotte che richiedono partecipazione attiva (autenticazione + participant middleware)
    let participant_routes = Router::new()
        .route(
            "/{chat_id}/messages",
            get(get_chat_messages).post(send_message),
        )
        .route(
            "/{chat_id}/messages/{message_id}",
            patch(edit_message).delete(delete_message),
        )
        .route(
            "/{chat_id}/messages/{message_id}/reactions",
            post(toggle_reaction),
        )
        .route("/{chat_id}/read", post(mark_chat_as_read))
        .route("/{chat_id}/leave", post(leave_chat))
        .route("/{chat_id}/settings", patch(update_chat_settings))
        .route("/{chat_id}/participants/{user_id}", post(add_participant))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            chat_participant_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ));

    public_routes.merge(participant_routes)
}

/// Configura le routes delle notifiche
fn configure_notification_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", get(list_notifications).put(update_notifications))
        .route("/unread_count", get(get_unread_count))
        .route("/{notification_id}", axum::routing::delete(delete_notification))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}
