//! Lobby and matchmaking for two-player checkers.
//!
//! [`lobby::LobbyCoordinator`] creates, lists and joins rooms kept in a
//! [`store::DocumentStore`], reporting every outcome as a
//! [`lobby::LobbyAction`] on a dispatch sink. The store is either in-process
//! ([`store::MemoryStore`]) or reached over WebSocket ([`store::RemoteStore`]
//! talking to a [`store::DocumentServer`]).

pub mod game;
pub mod lobby;
pub mod store;
