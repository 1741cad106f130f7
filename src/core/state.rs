//! Application State - Stato globale dell'applicazione
//!
//! Contiene tutti i repository, configurazioni e stato condiviso
//! necessario per gestire l'applicazione.

use crate::repositories::{
    ChatParticipantRepository, ChatRepository, ConnectionRepository, FollowRepository,
    MessageRepository, NotificationRepository, UserRepository,
};
use crate::ws::{EventRelay, PresenceTracker};
use sqlx::SqlitePool;

/// Scadenza di default della presenza, in secondi
pub const DEFAULT_PRESENCE_TTL_SECS: u64 = 90;

/// Stato globale dell'applicazione condiviso tra tutte le route e middleware
pub struct AppState {
    pub user: UserRepository,
    pub connection: ConnectionRepository,
    pub follow: FollowRepository,
    pub chat: ChatRepository,
    pub participant: ChatParticipantRepository,
    pub msg: MessageRepository,
    pub notification: NotificationRepository,

    /// Secret key per JWT token
    pub jwt_secret: String,

    /// Pub/sub verso i WebSocket aperti
    pub relay: EventRelay,

    /// Stato online/offline degli utenti
    pub presence: PresenceTracker,
}

impl AppState {
    /// Crea una nuova istanza di AppState inizializzando tutti i repository
    /// con il pool di connessioni fornito e la JWT secret.
    pub fn new(pool: SqlitePool, jwt_secret: String) -> Self {
        Self::with_presence_ttl(pool, jwt_secret, DEFAULT_PRESENCE_TTL_SECS)
    }

    pub fn with_presence_ttl(pool: SqlitePool, jwt_secret: String, presence_ttl_secs: u64) -> Self {
        Self {
            user: UserRepository::new(pool.clone()),
            connection: ConnectionRepository::new(pool.clone()),
            follow: FollowRepository::new(pool.clone()),
            chat: ChatRepository::new(pool.clone()),
            participant: ChatParticipantRepository::new(pool.clone()),
            msg: MessageRepository::new(pool.clone()),
            notification: NotificationRepository::new(pool),
            jwt_secret,
            relay: EventRelay::new(),
            presence: PresenceTracker::new(presence_ttl_secs),
        }
    }
}
