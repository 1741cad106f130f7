//! Repositories module - Coordinatore per tutti i repository del progetto
//!
//! Ogni repository gestisce le operazioni di database per una specifica entità.
//! Le query usano `sqlx::query_as` con `FromRow` e `QueryBuilder` per i filtri dinamici;
//! lo schema è in `migrations/` ed è applicato all'avvio con `sqlx::migrate!`.

pub mod chat;
pub mod connection;
pub mod follow;
pub mod message;
pub mod notification;
pub mod participant;
pub mod traits;
pub mod user;

// Re-esportazione dei trait per facilitare l'import
pub use traits::{Create, Delete, Read, ReadMany, Update};

// Re-esportazione delle struct dei repository per facilitare l'import
pub use chat::ChatRepository;
pub use connection::ConnectionRepository;
pub use follow::FollowRepository;
pub use message::MessageRepository;
pub use notification::NotificationRepository;
pub use participant::ChatParticipantRepository;
pub use user::UserRepository;
