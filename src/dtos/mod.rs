//! DTOs module - Data Transfer Objects
//!
//! Questo modulo contiene tutti i DTOs usati per la comunicazione client-server.
//! I DTOs separano la rappresentazione esterna (API) dalla rappresentazione interna (entities).

pub mod chat;
pub mod connection;
pub mod message;
pub mod notification;
pub mod query;
pub mod user;
pub mod ws_event;

// Re-exports per facilitare l'import
pub use chat::{
    ChatDTO, CreateChatDTO, CreateChatRequestDTO, NewParticipant, ParticipantDTO,
    UpdateChatSettingsDTO,
};
pub use connection::{
    BlockDTO, ConnectionDTO, ConnectionDeleteBody, ConnectionPostBody, ConnectionPutBody,
    ConnectionRequestDTO, CreateConnectionDTO,
};
pub use message::{
    CreateMessageDTO, MarkReadResultDTO, MessageDTO, ReactionDTO, ReactionSummaryDTO,
    ReactionToggledDTO, ReadReceiptDTO, SendMessageDTO, UpdateMessageDTO,
};
pub use notification::{
    CreateNotificationDTO, MarkAllReadResultDTO, NotificationDTO, NotificationPageDTO,
    NotificationPutBody, UnreadCountDTO,
};
pub use query::{
    ConnectionsQuery, MessagesQuery, NotificationsQuery, UnreadCountQuery, UserSearchQuery,
};
pub use user::{CreateUserDTO, LoginDTO, PresenceDTO, PresencePingDTO, UpdatePrivacyDTO, UserDTO};
pub use ws_event::{ClientFrame, RelayEnvelope, RelayEvent};
