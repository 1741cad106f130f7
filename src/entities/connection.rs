//! Connection entity - Relazione diretta tra due utenti e relativa macchina a stati

use super::enums::{ConnectionStatus, ConnectionType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Connection {
    pub connection_id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub status: ConnectionStatus,
    pub connection_type: ConnectionType,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ragioni per cui una transizione di stato viene rifiutata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// only the receiver may accept or decline
    NotReceiver,
    /// only the original sender may withdraw
    NotSender,
    /// the row has already left PENDING
    NotPending(ConnectionStatus),
    /// a PENDING request already exists between the two users
    AlreadyPending,
    /// the two users are already connected
    AlreadyConnected,
    /// one of the two users blocked the other
    Blocked,
}

/// What `request` has to write once the existing rows have been checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPlan {
    Insert,
    /// a DECLINED row in the same direction is reused and reset to PENDING
    Reset(i64),
}

impl Connection {
    /// Accept/decline is allowed only to the receiver of a PENDING request
    pub fn check_respond(&self, responder_id: i64) -> Result<(), TransitionError> {
        if self.receiver_id != responder_id {
            return Err(TransitionError::NotReceiver);
        }
        match self.status {
            ConnectionStatus::Pending => Ok(()),
            other => Err(TransitionError::NotPending(other)),
        }
    }

    /// Withdraw is allowed only to the sender of a PENDING request
    pub fn check_withdraw(&self, requester_id: i64) -> Result<(), TransitionError> {
        if self.sender_id != requester_id {
            return Err(TransitionError::NotSender);
        }
        match self.status {
            ConnectionStatus::Pending => Ok(()),
            other => Err(TransitionError::NotPending(other)),
        }
    }

    /// Decide how a new request from `forward.sender` to `forward.receiver` is stored,
    /// given the rows that already exist in both directions.
    pub fn plan_request(
        forward: Option<&Connection>,
        reverse: Option<&Connection>,
    ) -> Result<RequestPlan, TransitionError> {
        for row in [forward, reverse].into_iter().flatten() {
            match row.status {
                ConnectionStatus::Blocked => return Err(TransitionError::Blocked),
                ConnectionStatus::Pending => return Err(TransitionError::AlreadyPending),
                ConnectionStatus::Accepted => return Err(TransitionError::AlreadyConnected),
                ConnectionStatus::Declined | ConnectionStatus::Withdrawn => {}
            }
        }

        Ok(match forward {
            Some(row) => RequestPlan::Reset(row.connection_id),
            None => RequestPlan::Insert,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(id: i64, sender: i64, receiver: i64, status: ConnectionStatus) -> Connection {
        let now = Utc::now();
        Connection {
            connection_id: id,
            sender_id: sender,
            receiver_id: receiver,
            status,
            connection_type: ConnectionType::Collaborator,
            message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn only_receiver_can_respond_to_pending() {
        let row = connection(1, 10, 20, ConnectionStatus::Pending);
        assert_eq!(row.check_respond(20), Ok(()));
        assert_eq!(row.check_respond(10), Err(TransitionError::NotReceiver));
        assert_eq!(row.check_respond(99), Err(TransitionError::NotReceiver));
    }

    #[test]
    fn responding_twice_is_rejected() {
        let row = connection(1, 10, 20, ConnectionStatus::Accepted);
        assert_eq!(
            row.check_respond(20),
            Err(TransitionError::NotPending(ConnectionStatus::Accepted))
        );
    }

    #[test]
    fn withdraw_requires_sender_and_pending() {
        let pending = connection(1, 10, 20, ConnectionStatus::Pending);
        assert_eq!(pending.check_withdraw(10), Ok(()));
        assert_eq!(pending.check_withdraw(20), Err(TransitionError::NotSender));

        let declined = connection(1, 10, 20, ConnectionStatus::Declined);
        assert_eq!(
            declined.check_withdraw(10),
            Err(TransitionError::NotPending(ConnectionStatus::Declined))
        );
    }

    #[test]
    fn request_plan_respects_existing_rows() {
        assert_eq!(Connection::plan_request(None, None), Ok(RequestPlan::Insert));

        let declined = connection(7, 10, 20, ConnectionStatus::Declined);
        assert_eq!(
            Connection::plan_request(Some(&declined), None),
            Ok(RequestPlan::Reset(7))
        );

        let reverse_pending = connection(8, 20, 10, ConnectionStatus::Pending);
        assert_eq!(
            Connection::plan_request(None, Some(&reverse_pending)),
            Err(TransitionError::AlreadyPending)
        );

        let accepted = connection(9, 10, 20, ConnectionStatus::Accepted);
        assert_eq!(
            Connection::plan_request(Some(&accepted), None),
            Err(TransitionError::AlreadyConnected)
        );

        let blocked = connection(11, 20, 10, ConnectionStatus::Blocked);
        assert_eq!(
            Connection::plan_request(Some(&declined), Some(&blocked)),
            Err(TransitionError::Blocked)
        );
    }
}
