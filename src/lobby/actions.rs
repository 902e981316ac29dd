use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

use super::types::{Room, RoomId, RoomSummary};
use crate::game::{GameState, Role};

/// Actions dispatched to the local store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LobbyAction {
    /// Outcome of creating a room; `room` is absent when creation failed
    #[serde(rename = "CREATE_LOBBY")]
    RoomCreated { room: Option<Room> },

    #[serde(rename = "FETCH_LOBBY")]
    RoomsFetched { rooms: RoomSummary },

    #[serde(rename = "JOIN_LOBBY")]
    RoomJoined(JoinPayload),

    /// Board state to render
    #[serde(rename = "GAME_UPDATE")]
    GameUpdated { state: GameState },
}

/// Payload of a join attempt.
///
/// A seated user gets every field. A rejection carries `full: false` and no
/// room id. A failed attempt carries nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    #[serde(default)]
    pub full: Option<bool>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub state: Option<GameState>,
}

impl Serialize for JoinPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(full) = self.full {
            map.serialize_entry("full", &full)?;
        }
        if let Some(role) = &self.role {
            map.serialize_entry("role", role)?;
        }
        // rejections name no room explicitly; failures leave the key out
        if self.room_id.is_some() || self.full.is_some() {
            map.serialize_entry("roomId", &self.room_id)?;
        }
        if let Some(state) = &self.state {
            map.serialize_entry("state", state)?;
        }
        map.end()
    }
}

impl JoinPayload {
    pub fn seated(room_id: RoomId, role: Role, full: bool, state: GameState) -> Self {
        Self {
            full: Some(full),
            role: Some(role),
            room_id: Some(room_id),
            state: Some(state),
        }
    }

    pub fn rejected() -> Self {
        Self {
            full: Some(false),
            ..Self::default()
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }
}

/// Sink for lobby actions
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, action: LobbyAction);
}

/// Client-side route changes
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

impl Dispatch for async_channel::Sender<LobbyAction> {
    fn dispatch(&self, action: LobbyAction) {
        if self.try_send(action).is_err() {
            warn!("Dropping lobby action, store is gone");
        }
    }
}

impl Navigator for async_channel::Sender<String> {
    fn navigate(&self, path: &str) {
        if self.try_send(path.to_string()).is_err() {
            warn!("Dropping navigation to {}, router is gone", path);
        }
    }
}

impl<T: Dispatch + ?Sized> Dispatch for Arc<T> {
    fn dispatch(&self, action: LobbyAction) {
        (**self).dispatch(action)
    }
}

impl<T: Navigator + ?Sized> Navigator for Arc<T> {
    fn navigate(&self, path: &str) {
        (**self).navigate(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{BoardGenerator, StandardBoard};
    use serde_json::json;

    #[test]
    fn serialize_rejection() {
        let action = LobbyAction::RoomJoined(JoinPayload::rejected());
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(
            json,
            json!({"type": "JOIN_LOBBY", "full": false, "roomId": null})
        );
    }

    #[test]
    fn serialize_failed_join() {
        let action = LobbyAction::RoomJoined(JoinPayload::failed());
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json, json!({"type": "JOIN_LOBBY"}));
    }

    #[test]
    fn failed_and_rejected_joins_parse_back() {
        let failed: LobbyAction = serde_json::from_str(r#"{"type": "JOIN_LOBBY"}"#).unwrap();
        assert_eq!(failed, LobbyAction::RoomJoined(JoinPayload::failed()));

        let json = serde_json::to_string(&LobbyAction::RoomJoined(JoinPayload::rejected())).unwrap();
        let rejected: LobbyAction = serde_json::from_str(&json).unwrap();
        assert_eq!(rejected, LobbyAction::RoomJoined(JoinPayload::rejected()));
    }

    #[test]
    fn serialize_seated_join() {
        let payload = JoinPayload::seated(
            RoomId::from("r1"),
            Role::Black,
            true,
            StandardBoard.generate(),
        );
        let json = serde_json::to_value(LobbyAction::RoomJoined(payload)).unwrap();
        assert_eq!(json["type"], json!("JOIN_LOBBY"));
        assert_eq!(json["role"], json!("black"));
        assert_eq!(json["roomId"], json!("r1"));
        assert_eq!(json["full"], json!(true));
        assert!(json["state"]["board"].is_array());
    }

    #[test]
    fn serialize_rooms_fetched() {
        let action = LobbyAction::RoomsFetched {
            rooms: RoomSummary::default(),
        };
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains("FETCH_LOBBY"));
        assert!(json.contains("joinedRooms"));
        assert!(json.contains("waitingRooms"));
    }

    #[test]
    fn parse_failed_room_created() {
        let json = r#"{"type": "CREATE_LOBBY", "room": null}"#;
        let action: LobbyAction = serde_json::from_str(json).unwrap();
        assert_eq!(action, LobbyAction::RoomCreated { room: None });
    }

    #[test]
    fn channel_dispatch_delivers_in_order() {
        let (tx, rx) = async_channel::unbounded::<LobbyAction>();
        tx.dispatch(LobbyAction::RoomCreated { room: None });
        tx.dispatch(LobbyAction::RoomJoined(JoinPayload::failed()));
        assert_eq!(rx.try_recv().unwrap(), LobbyAction::RoomCreated { room: None });
        assert_eq!(
            rx.try_recv().unwrap(),
            LobbyAction::RoomJoined(JoinPayload::failed())
        );
    }

    #[test]
    fn closed_channel_does_not_panic() {
        let (tx, rx) = async_channel::unbounded::<LobbyAction>();
        drop(rx);
        tx.dispatch(LobbyAction::RoomCreated { room: None });

        let (nav_tx, nav_rx) = async_channel::unbounded::<String>();
        drop(nav_rx);
        nav_tx.navigate("/board/x");
    }
}
