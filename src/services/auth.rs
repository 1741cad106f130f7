//! Auth services - Gestione autenticazione e registrazione utenti

use crate::core::{AppError, AppState, encode_jwt};
use crate::dtos::{CreateUserDTO, LoginDTO, UserDTO};
use crate::entities::User;
use crate::repositories::Create;
use axum::{
    extract::{Json, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use validator::Validate;

#[instrument(skip(state, body), fields(username = %body.username))]
pub async fn login_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginDTO>,
) -> Result<impl IntoResponse, AppError> {
    // 1. Cercare l'utente tramite username, UNAUTHORIZED se non esiste
    // 2. Verificare la password con l'hash memorizzato
    // 3. Generare il JWT e restituirlo sia come cookie HttpOnly sia nell'header Authorization
    let user = match state.user.find_by_username(&body.username).await? {
        Some(user) => user,
        None => {
            warn!("Login attempt for unknown user");
            return Err(AppError::unauthorized("Username or password are not correct."));
        }
    };

    if !user.verify_password(&body.password) {
        warn!("Wrong password");
        return Err(AppError::unauthorized("Username or password are not correct."));
    }

    let token = encode_jwt(user.username, user.user_id, &state.jwt_secret)?;

    let cookie_value = format!(
        "token={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        token,
        24 * 60 * 60
    );

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, header_value(&cookie_value)?);
    headers.insert(header::AUTHORIZATION, header_value(&format!("Bearer {}", token))?);

    info!("User logged in");
    Ok((StatusCode::OK, headers))
}

fn header_value(value: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(value).map_err(|e| {
        error!("Invalid header value: {:?}", e);
        AppError::internal_server_error("Failed to build response headers")
    })
}

#[instrument(skip(state, body), fields(username = %body.username))]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUserDTO>,
) -> Result<(StatusCode, Json<UserDTO>), AppError> {
    // 1. Validare il DTO (formato username, lunghezza password)
    // 2. CONFLICT se lo username è già usato
    // 3. Salvare l'utente con la password hashata
    body.validate()?;

    if state.user.find_by_username(&body.username).await?.is_some() {
        warn!("Username already taken");
        return Err(AppError::conflict("Username already exists"));
    }

    let password_hash = User::hash_password(&body.password).map_err(|e| {
        error!("Failed to hash password: {:?}", e);
        AppError::internal_server_error("Failed to hash password")
    })?;

    let new_user = CreateUserDTO {
        username: body.username,
        password: password_hash,
        display_name: body.display_name,
    };

    // una registrazione concorrente con lo stesso username diventa 409 tramite il vincolo UNIQUE
    let created_user = state.user.create(&new_user).await?;
    info!("User registered with id {}", created_user.user_id);

    Ok((StatusCode::CREATED, Json(UserDTO::from(created_user))))
}
