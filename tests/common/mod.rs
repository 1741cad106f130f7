#![allow(dead_code)]

use axum::http::StatusCode;
use axum_test::TestServer;
use axum_test::http::HeaderName;
use devcollab::core::{AppState, encode_jwt};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use std::sync::Arc;

pub const JWT_SECRET: &str = "test-secret-for-integration-tests";

/// Utenti caricati da fixtures/users.sql
pub const ALICE: (i64, &str) = (1, "alice");
pub const BOB: (i64, &str) = (2, "bob");
pub const CHARLIE: (i64, &str) = (3, "charlie");
pub const DAVE: (i64, &str) = (4, "dave");

/// Crea un AppState per i test
pub fn create_test_state(pool: SqlitePool) -> Arc<AppState> {
    Arc::new(AppState::new(pool, JWT_SECRET.to_string()))
}

/// Crea un TestServer per i test
pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = devcollab::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Genera un JWT valido per 24 ore
pub fn create_test_jwt(user_id: i64, username: &str) -> String {
    encode_jwt(username.to_string(), user_id, JWT_SECRET).expect("Failed to create JWT token")
}

pub fn auth_name() -> HeaderName {
    HeaderName::from_static("authorization")
}

/// Valore dell'header Authorization per uno degli utenti di test
pub fn bearer(user: (i64, &str)) -> String {
    format!("Bearer {}", create_test_jwt(user.0, user.1))
}

/// Invia una richiesta di connessione e ritorna il connection_id
pub async fn request_connection(server: &TestServer, from: (i64, &str), to: (i64, &str)) -> i64 {
    let response = server
        .post("/connections")
        .add_header(auth_name(), bearer(from))
        .json(&json!({ "action": "request", "receiver_id": to.0 }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["connection_id"]
        .as_i64()
        .expect("connection_id")
}

/// Crea una connessione ACCEPTED tra due utenti
pub async fn connect(server: &TestServer, a: (i64, &str), b: (i64, &str)) -> i64 {
    let connection_id = request_connection(server, a, b).await;
    server
        .put("/connections")
        .add_header(auth_name(), bearer(b))
        .json(&json!({ "action": "respond", "connection_id": connection_id, "decision": "ACCEPTED" }))
        .await
        .assert_status_ok();
    connection_id
}

/// Crea una chat di gruppo e ritorna il chat_id
pub async fn create_group(server: &TestServer, owner: (i64, &str), members: &[i64]) -> i64 {
    let response = server
        .post("/chats")
        .add_header(auth_name(), bearer(owner))
        .json(&json!({ "chat_type": "GROUP", "name": "Rustaceans", "participant_ids": members }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["chat_id"].as_i64().expect("chat_id")
}

/// Invia un messaggio di testo e ritorna il message_id
pub async fn send_text(server: &TestServer, chat_id: i64, from: (i64, &str), content: &str) -> i64 {
    let response = server
        .post(&format!("/chats/{}/messages", chat_id))
        .add_header(auth_name(), bearer(from))
        .json(&json!({ "content": content }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["message_id"].as_i64().expect("message_id")
}

/// Notifiche dell'utente (prima pagina)
pub async fn notifications_of(server: &TestServer, user: (i64, &str)) -> Value {
    let response = server
        .get("/notifications")
        .add_header(auth_name(), bearer(user))
        .await;
    response.assert_status_ok();
    response.json::<Value>()
}
