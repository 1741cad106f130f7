//! Entities module - Entità del dominio applicativo
//!
//! Questo modulo contiene tutte le entità che rappresentano i dati persistiti nel database.
//! Ogni entity corrisponde a una tabella nel database.

pub mod chat;
pub mod connection;
pub mod enums;
pub mod message;
pub mod notification;
pub mod user;

// Re-exports per facilitare l'import
pub use chat::{direct_key, Chat, ChatParticipant, ChatSettings};
pub use connection::{Connection, RequestPlan, TransitionError};
pub use enums::{
    ChatType, ConnectionDecision, ConnectionPrivacy, ConnectionStatus, ConnectionType,
    MessagePrivacy, MessageType, NotificationCategory, NotificationPriority, NotificationType,
};
pub use message::{Message, Reaction, ReadReceipt};
pub use notification::Notification;
pub use user::{Follow, User};
