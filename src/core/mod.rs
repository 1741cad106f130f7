//! Core Module - Componenti infrastrutturali dell'applicazione
//!
//! Questo modulo contiene tutti i componenti "core" dell'applicazione:
//! - Autenticazione e JWT
//! - Configurazione
//! - Gestione errori
//! - Regole di privacy
//! - Stato applicazione

pub mod auth;
pub mod config;
pub mod error;
pub mod privacy;
pub mod state;

// Re-exports per facilitare l'import
pub use auth::{
    Claims, authentication_middleware, chat_participant_middleware, decode_jwt, encode_jwt,
    require_admin,
};
pub use config::Config;
pub use error::AppError;
pub use privacy::{ContactDecision, DenyReason};
pub use state::AppState;
