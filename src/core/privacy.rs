//! Privacy evaluator - Decide se un utente può contattarne un altro
//!
//! Un blocco in una qualsiasi direzione nega sempre. Altrimenti decide la
//! preferenza del destinatario.

use crate::core::{AppError, AppState};
use crate::entities::{ConnectionPrivacy, MessagePrivacy, User};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactDecision {
    Allow,
    Deny(DenyReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Blocked,
    PrivacySettings,
}

impl ContactDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ContactDecision::Allow)
    }

    /// Turn a denial into a 403
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            ContactDecision::Allow => Ok(()),
            ContactDecision::Deny(DenyReason::Blocked) => {
                Err(AppError::forbidden("You cannot contact this user"))
            }
            ContactDecision::Deny(DenyReason::PrivacySettings) => Err(AppError::forbidden(
                "This user's privacy settings do not allow it",
            )),
        }
    }
}

/// `share_connection` is only consulted for CONNECTIONS_OF_CONNECTIONS
pub fn decide_connection_request(
    blocked: bool,
    policy: ConnectionPrivacy,
    share_connection: impl FnOnce() -> bool,
) -> ContactDecision {
    if blocked {
        return ContactDecision::Deny(DenyReason::Blocked);
    }
    let allowed = match policy {
        ConnectionPrivacy::Everyone => true,
        ConnectionPrivacy::ConnectionsOfConnections => share_connection(),
        ConnectionPrivacy::Nobody => false,
    };
    if allowed {
        ContactDecision::Allow
    } else {
        ContactDecision::Deny(DenyReason::PrivacySettings)
    }
}

pub fn decide_message(blocked: bool, policy: MessagePrivacy, connected: bool) -> ContactDecision {
    if blocked {
        return ContactDecision::Deny(DenyReason::Blocked);
    }
    let allowed = match policy {
        MessagePrivacy::Everyone => true,
        MessagePrivacy::Connections => connected,
        MessagePrivacy::Nobody => false,
    };
    if allowed {
        ContactDecision::Allow
    } else {
        ContactDecision::Deny(DenyReason::PrivacySettings)
    }
}

#[instrument(skip(state, receiver), fields(receiver_id = receiver.user_id))]
pub async fn can_request_connection(
    state: &AppState,
    sender_id: i64,
    receiver: &User,
) -> Result<ContactDecision, sqlx::Error> {
    let blocked = state
        .connection
        .is_blocked_between(sender_id, receiver.user_id)
        .await?;

    let share_connection = if !blocked
        && receiver.connection_privacy == ConnectionPrivacy::ConnectionsOfConnections
    {
        state
            .connection
            .has_mutual_connection(sender_id, receiver.user_id)
            .await?
    } else {
        false
    };

    let decision =
        decide_connection_request(blocked, receiver.connection_privacy, || share_connection);
    debug!(?decision, "Connection request evaluated");
    Ok(decision)
}

#[instrument(skip(state, receiver), fields(receiver_id = receiver.user_id))]
pub async fn can_message(
    state: &AppState,
    sender_id: i64,
    receiver: &User,
) -> Result<ContactDecision, sqlx::Error> {
    let blocked = state
        .connection
        .is_blocked_between(sender_id, receiver.user_id)
        .await?;

    let connected = if !blocked && receiver.message_privacy == MessagePrivacy::Connections {
        state
            .connection
            .are_connected(sender_id, receiver.user_id)
            .await?
    } else {
        false
    };

    let decision = decide_message(blocked, receiver.message_privacy, connected);
    debug!(?decision, "Message permission evaluated");
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_always_denies() {
        assert_eq!(
            decide_connection_request(true, ConnectionPrivacy::Everyone, || true),
            ContactDecision::Deny(DenyReason::Blocked)
        );
        assert_eq!(
            decide_message(true, MessagePrivacy::Everyone, true),
            ContactDecision::Deny(DenyReason::Blocked)
        );
    }

    #[test]
    fn connection_privacy_levels() {
        assert!(decide_connection_request(false, ConnectionPrivacy::Everyone, || false).is_allowed());
        assert!(
            decide_connection_request(false, ConnectionPrivacy::ConnectionsOfConnections, || true)
                .is_allowed()
        );
        assert_eq!(
            decide_connection_request(false, ConnectionPrivacy::ConnectionsOfConnections, || false),
            ContactDecision::Deny(DenyReason::PrivacySettings)
        );
        assert!(!decide_connection_request(false, ConnectionPrivacy::Nobody, || true).is_allowed());
    }

    #[test]
    fn mutual_lookup_is_skipped_when_not_needed() {
        let decision = decide_connection_request(false, ConnectionPrivacy::Everyone, || {
            panic!("mutual connections should not be consulted")
        });
        assert!(decision.is_allowed());
    }

    #[test]
    fn message_privacy_levels() {
        assert!(decide_message(false, MessagePrivacy::Everyone, false).is_allowed());
        assert!(decide_message(false, MessagePrivacy::Connections, true).is_allowed());
        assert!(!decide_message(false, MessagePrivacy::Connections, false).is_allowed());
        assert!(!decide_message(false, MessagePrivacy::Nobody, true).is_allowed());
    }

    #[test]
    fn denial_maps_to_forbidden() {
        let err = ContactDecision::Deny(DenyReason::PrivacySettings)
            .into_result()
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }
}
