use super::actions::{JoinPayload, LobbyAction};
use super::types::{Room, RoomSummary};
use crate::game::GameState;

/// Local projection of lobby state, changed only by applying actions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LobbyState {
    /// Last room this client created
    pub created: Option<Room>,
    pub rooms: RoomSummary,
    /// Last join attempt
    pub joined: JoinPayload,
    /// Board currently on screen
    pub game: Option<GameState>,
}

impl LobbyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, action: &LobbyAction) {
        match action {
            LobbyAction::RoomCreated { room } => self.created = room.clone(),
            LobbyAction::RoomsFetched { rooms } => self.rooms = rooms.clone(),
            LobbyAction::RoomJoined(payload) => self.joined = payload.clone(),
            LobbyAction::GameUpdated { state } => self.game = Some(state.clone()),
        }
    }

    /// Apply every action queued on `rx`, returning how many were applied
    pub fn drain(&mut self, rx: &async_channel::Receiver<LobbyAction>) -> usize {
        let mut applied = 0;
        while let Ok(action) = rx.try_recv() {
            self.apply(&action);
            applied += 1;
        }
        applied
    }
}
