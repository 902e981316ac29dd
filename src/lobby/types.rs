use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::game::GameState;
use crate::store::{StoreError, child_path};

/// Collection under which rooms are stored, keyed by room id
pub const ROOMS_PATH: &str = "rooms";

/// Lobby errors
#[derive(Debug, Error)]
pub enum LobbyError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("room {room} is corrupt: {source}")]
    Corrupt {
        room: RoomId,
        source: serde_json::Error,
    },

    #[error("failed to encode room: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("room {0} kept changing while joining")]
    Contended(RoomId),
}

/// Room id: a UUID v4 string for rooms created here, any key for rooms
/// read back from the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// User id as issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Random identity for a player without an account ("guest_" + 8 hex)
    pub fn guest() -> Self {
        let value: u32 = rand::rng().random();
        Self(format!("guest_{:08x}", value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identity of whoever is calling into the lobby
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<UserId>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn signed_in(user: UserId) -> Self {
        Self { user: Some(user) }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user.as_ref()
    }
}

/// Persisted match record, stored at `rooms/<roomId>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_id: RoomId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub red: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub black: Option<UserId>,
    #[serde(default)]
    pub full: bool,
    pub state: GameState,
}

impl Room {
    /// New room with only the red seat (possibly) taken
    pub fn open(room_id: RoomId, red: Option<UserId>, state: GameState) -> Self {
        Self {
            room_id,
            red,
            black: None,
            full: false,
            state,
        }
    }

    pub fn is_red(&self, user: &UserId) -> bool {
        self.red.as_ref() == Some(user)
    }

    pub fn is_black(&self, user: &UserId) -> bool {
        self.black.as_ref() == Some(user)
    }

    pub fn has_player(&self, user: &UserId) -> bool {
        self.is_red(user) || self.is_black(user)
    }

    /// Copy of this room with `user` seated as black
    pub fn seat_black(&self, user: &UserId) -> Self {
        Self {
            black: Some(user.clone()),
            full: true,
            state: self.state.with_black(user),
            ..self.clone()
        }
    }
}

/// Rooms partitioned for the current user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub joined_rooms: Vec<RoomId>,
    pub waiting_rooms: Vec<RoomId>,
}

impl RoomSummary {
    pub fn is_empty(&self) -> bool {
        self.joined_rooms.is_empty() && self.waiting_rooms.is_empty()
    }
}

/// Partition the raw rooms collection for `user`.
///
/// Finished rooms are left out. Records that fail to decode (including ones
/// without a `state`) are logged and skipped.
pub fn summarize_rooms(rooms: &Map<String, Value>, user: Option<&UserId>) -> RoomSummary {
    let mut summary = RoomSummary::default();

    for (key, raw) in rooms {
        let room: Room = match Room::deserialize(raw) {
            Ok(room) => room,
            Err(e) => {
                warn!("Skipping unreadable room {}: {}", key, e);
                continue;
            }
        };
        if room.state.is_finished() {
            continue;
        }

        let id = RoomId::from(key.as_str());
        if user.is_some_and(|u| room.has_player(u)) {
            summary.joined_rooms.push(id.clone());
        }
        if room.black.is_none() && room.red.as_ref() != user {
            summary.waiting_rooms.push(id);
        }
    }

    summary
}

pub fn room_path(room_id: &RoomId) -> String {
    child_path(ROOMS_PATH, room_id.as_str())
}

/// Client-side route of a room's board view
pub fn board_path(room_id: &RoomId) -> String {
    format!("/board/{}", room_id)
}
