//! Presence tracker - Stato online/offline degli utenti con scadenza

use crate::dtos::PresenceDTO;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct PresenceEntry {
    online: bool,
    last_seen: DateTime<Utc>,
}

pub struct PresenceTracker {
    entries: DashMap<i64, PresenceEntry>,
    ttl: Duration,
}

impl PresenceTracker {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    pub fn ping(&self, user_id: i64, online: bool) {
        self.ping_at(user_id, online, Utc::now());
    }

    pub fn ping_at(&self, user_id: i64, online: bool, at: DateTime<Utc>) {
        debug!(user_id, online, "Presence ping");
        self.entries.insert(
            user_id,
            PresenceEntry {
                online,
                last_seen: at,
            },
        );
    }

    pub fn status(&self, user_id: i64) -> PresenceDTO {
        self.status_at(user_id, Utc::now())
    }

    /// Online only if the last ping said so and is younger than the ttl
    pub fn status_at(&self, user_id: i64, now: DateTime<Utc>) -> PresenceDTO {
        match self.entries.get(&user_id).map(|e| *e.value()) {
            Some(entry) => PresenceDTO {
                user_id,
                online: entry.online && now - entry.last_seen < self.ttl,
                last_seen: Some(entry.last_seen),
            },
            None => PresenceDTO {
                user_id,
                online: false,
                last_seen: None,
            },
        }
    }
}
