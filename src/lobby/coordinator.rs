use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use super::actions::{Dispatch, JoinPayload, LobbyAction, Navigator};
use super::types::{
    LobbyError, ROOMS_PATH, Room, RoomId, RoomSummary, Session, UserId, board_path, room_path,
    summarize_rooms,
};
use crate::game::{BoardGenerator, GameState, Role, StandardBoard};
use crate::store::DocumentStore;

/// Reads of a room before giving up on a seat that keeps changing under us
pub const MAX_JOIN_ATTEMPTS: usize = 3;

/// Why a join did not seat the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotFound,
    Anonymous,
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined {
        room_id: RoomId,
        role: Role,
        full: bool,
        state: GameState,
    },
    Rejected(Rejection),
}

impl JoinOutcome {
    fn payload(&self) -> JoinPayload {
        match self {
            JoinOutcome::Joined {
                room_id,
                role,
                full,
                state,
            } => JoinPayload::seated(room_id.clone(), *role, *full, state.clone()),
            JoinOutcome::Rejected(_) => JoinPayload::rejected(),
        }
    }
}

enum JoinStep {
    Resume { role: Role, full: bool },
    ClaimBlack,
    Full,
}

fn join_step(room: &Room, user: &UserId) -> JoinStep {
    if room.is_red(user) {
        JoinStep::Resume {
            role: Role::Red,
            full: false,
        }
    } else if room.black.is_none() {
        JoinStep::ClaimBlack
    } else if room.is_black(user) {
        JoinStep::Resume {
            role: Role::Black,
            full: true,
        }
    } else {
        JoinStep::Full
    }
}

fn describe(session: &Session) -> &str {
    session.user_id().map(UserId::as_str).unwrap_or("anonymous")
}

/// Creates, lists and joins rooms against a document store.
///
/// Every operation dispatches exactly one terminal action of its own kind,
/// failed or not, and returns the same outcome to the caller.
pub struct LobbyCoordinator<S, D, N, B = StandardBoard> {
    store: S,
    dispatcher: D,
    navigator: N,
    boards: B,
}

impl<S, D, N> LobbyCoordinator<S, D, N>
where
    S: DocumentStore,
    D: Dispatch,
    N: Navigator,
{
    pub fn new(store: S, dispatcher: D, navigator: N) -> Self {
        Self {
            store,
            dispatcher,
            navigator,
            boards: StandardBoard,
        }
    }
}

impl<S, D, N, B> LobbyCoordinator<S, D, N, B>
where
    S: DocumentStore,
    D: Dispatch,
    N: Navigator,
    B: BoardGenerator,
{
    pub fn with_board_generator(store: S, dispatcher: D, navigator: N, boards: B) -> Self {
        Self {
            store,
            dispatcher,
            navigator,
            boards,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Open a new room with the caller seated as red
    pub async fn create_room(&self, session: &Session) -> Result<Room, LobbyError> {
        let room = Room::open(
            RoomId::generate(),
            session.user_id().cloned(),
            self.boards.generate(),
        );

        match self.write_room(&room).await {
            Ok(()) => {
                info!("Room {} created by {}", room.room_id, describe(session));
                self.dispatcher.dispatch(LobbyAction::RoomCreated {
                    room: Some(room.clone()),
                });
                self.dispatcher.dispatch(LobbyAction::GameUpdated {
                    state: room.state.clone(),
                });
                self.navigator.navigate(&board_path(&room.room_id));
                Ok(room)
            }
            Err(e) => {
                error!("Error creating lobby: {}", e);
                self.dispatcher
                    .dispatch(LobbyAction::RoomCreated { room: None });
                Err(e)
            }
        }
    }

    async fn write_room(&self, room: &Room) -> Result<(), LobbyError> {
        let value = serde_json::to_value(room)?;
        self.store.set(&room_path(&room.room_id), value).await?;
        Ok(())
    }

    /// List unfinished rooms the caller is seated in or could join
    pub async fn fetch_rooms(&self, session: &Session) -> Result<RoomSummary, LobbyError> {
        let result = self.read_rooms(session).await;
        let rooms = match &result {
            Ok(summary) => summary.clone(),
            Err(e) => {
                error!("Error fetching lobbies: {}", e);
                RoomSummary::default()
            }
        };
        self.dispatcher.dispatch(LobbyAction::RoomsFetched { rooms });
        result
    }

    async fn read_rooms(&self, session: &Session) -> Result<RoomSummary, LobbyError> {
        let rooms = match self.store.get(ROOMS_PATH).await? {
            Some(Value::Object(map)) => map,
            Some(other) => {
                warn!("Ignoring malformed rooms collection: {}", other);
                Map::new()
            }
            None => Map::new(),
        };

        let summary = summarize_rooms(&rooms, session.user_id());
        debug!(
            "{} rooms read: {} joined, {} waiting",
            rooms.len(),
            summary.joined_rooms.len(),
            summary.waiting_rooms.len()
        );
        Ok(summary)
    }

    /// Take a seat in a room, or resume the one already held
    pub async fn join_room(
        &self,
        session: &Session,
        room_id: &RoomId,
    ) -> Result<JoinOutcome, LobbyError> {
        match self.take_seat(session, room_id).await {
            Ok(outcome) => {
                self.dispatcher
                    .dispatch(LobbyAction::RoomJoined(outcome.payload()));
                if let JoinOutcome::Joined { room_id, state, .. } = &outcome {
                    self.dispatcher.dispatch(LobbyAction::GameUpdated {
                        state: state.clone(),
                    });
                    self.navigator.navigate(&board_path(room_id));
                }
                Ok(outcome)
            }
            Err(e) => {
                error!("Error joining lobby {}: {}", room_id, e);
                self.dispatcher
                    .dispatch(LobbyAction::RoomJoined(JoinPayload::failed()));
                Err(e)
            }
        }
    }

    async fn take_seat(
        &self,
        session: &Session,
        room_id: &RoomId,
    ) -> Result<JoinOutcome, LobbyError> {
        let path = room_path(room_id);

        for attempt in 1..=MAX_JOIN_ATTEMPTS {
            let Some(raw) = self.store.get(&path).await? else {
                debug!("Room {} not found", room_id);
                return Ok(JoinOutcome::Rejected(Rejection::NotFound));
            };
            let Some(user) = session.user_id() else {
                return Ok(JoinOutcome::Rejected(Rejection::Anonymous));
            };
            let room = Room::deserialize(&raw).map_err(|source| LobbyError::Corrupt {
                room: room_id.clone(),
                source,
            })?;

            match join_step(&room, user) {
                JoinStep::Resume { role, full } => {
                    debug!("{} resumes room {} as {}", user, room_id, role);
                    return Ok(JoinOutcome::Joined {
                        room_id: room_id.clone(),
                        role,
                        full,
                        state: room.state,
                    });
                }
                JoinStep::ClaimBlack => {
                    let seated = room.seat_black(user);
                    let value = serde_json::to_value(&seated)?;
                    // whole-document swap: black and full land together or not at all
                    if self.store.compare_and_set(&path, Some(raw), value).await? {
                        info!("{} joined room {} as black", user, room_id);
                        return Ok(JoinOutcome::Joined {
                            room_id: room_id.clone(),
                            role: Role::Black,
                            full: true,
                            state: seated.state,
                        });
                    }
                    debug!(
                        "Room {} changed before seating {} (attempt {})",
                        room_id, user, attempt
                    );
                }
                JoinStep::Full => {
                    debug!("Room {} is full, rejecting {}", room_id, user);
                    return Ok(JoinOutcome::Rejected(Rejection::Full));
                }
            }
        }

        Err(LobbyError::Contended(room_id.clone()))
    }
}
