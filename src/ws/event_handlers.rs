//! WebSocket Event Handlers - Handler per i frame inviati dal client

use crate::AppState;
use crate::dtos::ClientFrame;
use tracing::{debug, instrument};

/// Il WebSocket è solo in uscita per gli eventi: dal client arrivano solo frame di presenza
#[instrument(skip(state))]
pub fn process_client_frame(state: &AppState, user_id: i64, frame: ClientFrame) {
    match frame {
        ClientFrame::Ping => {
            debug!("Ping frame");
            state.presence.ping(user_id, true);
        }
        ClientFrame::Away => {
            debug!("Away frame");
            state.presence.ping(user_id, false);
        }
    }
}
