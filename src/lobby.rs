//! Room creation, listing and joining for two-player matches

mod actions;
mod coordinator;
mod reducer;
mod types;

pub use actions::{Dispatch, JoinPayload, LobbyAction, Navigator};
pub use coordinator::{JoinOutcome, LobbyCoordinator, MAX_JOIN_ATTEMPTS, Rejection};
pub use reducer::LobbyState;
pub use types::{
    LobbyError, ROOMS_PATH, Room, RoomId, RoomSummary, Session, UserId, board_path, room_path,
    summarize_rooms,
};
