use crate::core::{AppError, AppState};
use crate::entities::{ChatParticipant, User};
use crate::repositories::Read;
use axum::extract::State;
use axum::{Error, body::Body, extract::Request, http, http::Response, middleware::Next};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

// struct che codifica il contenuto del token jwt
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize, // Expiry time of the token
    pub iat: usize, // Issued at time of the token
    pub id: i64,
    pub username: String,
}

#[instrument(skip(secret), fields(username = %username, id = %id))]
pub fn encode_jwt(username: String, id: i64, secret: &str) -> Result<String, Error> {
    debug!("Encoding JWT token for user");
    let now = Utc::now();
    let expire = Duration::hours(24);
    let exp: usize = (now + expire).timestamp() as usize;
    let iat: usize = now.timestamp() as usize;
    let claim = Claims {
        iat,
        exp,
        username,
        id,
    };

    encode(
        &Header::default(),
        &claim,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| {
        error!("Failed to encode JWT token: {:?}", e);
        Error::new("Error in encoding jwt token")
    })
}

#[instrument(skip(jwt_token, secret))]
pub fn decode_jwt(jwt_token: &str, secret: &str) -> Result<TokenData<Claims>, Error> {
    debug!("Decoding JWT token");
    decode(
        jwt_token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!("Failed to decode JWT token: {:?}", e);
        Error::new("Error in decoding jwt token")
    })
}

/// Risolve l'identità dal bearer token e la inserisce nelle Extension della richiesta.
/// Gli handler ricevono l'utente esplicitamente con `Extension<User>`.
#[instrument(skip(state, req, next))]
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| {
            warn!("Missing authorization header");
            AppError::unauthorized("Please add the JWT token to the header")
        })?
        .to_str()
        .map_err(|_| {
            warn!("Invalid authorization header format");
            AppError::unauthorized("Invalid authorization header")
        })?;

    let token = match auth_header.split_whitespace().collect::<Vec<_>>().as_slice() {
        ["Bearer", token] => token.to_string(),
        _ => {
            warn!("Authorization header is not a bearer token");
            return Err(AppError::unauthorized("Expected a Bearer token"));
        }
    };

    let token_data = decode_jwt(&token, &state.jwt_secret)
        .map_err(|_| AppError::unauthorized("Unable to decode token"))?;

    // Fetch the user details from the database
    let current_user = match state.user.read(&token_data.claims.id).await? {
        Some(user) if user.username == token_data.claims.username => user,
        _ => {
            warn!("User not found in database: {}", token_data.claims.username);
            return Err(AppError::unauthorized("You are not an authorized user"));
        }
    };
    debug!("User authenticated: {}", current_user.username);

    req.extensions_mut().insert(current_user);
    Ok(next.run(req).await)
}

/// Middleware che verifica che l'utente corrente sia partecipante attivo della chat specificata.
/// Estrae chat_id dal path, verifica la partecipazione e inserisce il ChatParticipant nell'Extension.
#[instrument(skip(state, req, next))]
pub async fn chat_participant_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running chat participant middleware");
    let current_user = req
        .extensions()
        .get::<User>()
        .ok_or_else(|| {
            warn!("User not found in request extensions");
            AppError::unauthorized("User not authenticated")
        })?
        .clone();

    let chat_id: i64 = req
        .uri()
        .path()
        .split('/')
        .find_map(|segment| segment.parse::<i64>().ok())
        .ok_or_else(|| {
            warn!("Chat ID not found in path: {}", req.uri().path());
            AppError::bad_request("Chat ID not found in path")
        })?;

    let participant = state
        .participant
        .read(&(chat_id, current_user.user_id))
        .await?
        .filter(|p| p.is_active);

    let participant = match participant {
        Some(p) => p,
        None => {
            if state.chat.read(&chat_id).await?.is_none() {
                warn!("Chat {} not found", chat_id);
                return Err(AppError::not_found("Chat not found"));
            }
            warn!(
                "User {} is not an active participant of chat {}",
                current_user.user_id, chat_id
            );
            return Err(AppError::forbidden("You are not a participant of this chat"));
        }
    };

    debug!("User {} verified as participant of chat {}", current_user.user_id, chat_id);
    req.extensions_mut().insert(participant);

    Ok(next.run(req).await)
}

/// Verifica che il partecipante sia amministratore della chat
pub fn require_admin(participant: &ChatParticipant) -> Result<(), AppError> {
    if !participant.is_admin {
        warn!(
            "User {} is not an admin of chat {}",
            participant.user_id, participant.chat_id
        );
        return Err(AppError::forbidden("This action requires chat admin rights"));
    }
    info!("Admin check passed for user {}", participant.user_id);
    Ok(())
}
