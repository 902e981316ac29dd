//! Board and game state shared between the board generator and the lobby.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lobby::UserId;

/// Board edge length
pub const BOARD_SIZE: usize = 8;

/// Rows of pieces each side starts with
const START_ROWS: usize = 3;

/// The two player slots in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Red,
    Black,
}

impl Role {
    pub fn opponent(self) -> Self {
        match self {
            Role::Red => Role::Black,
            Role::Black => Role::Red,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Red => f.write_str("red"),
            Role::Black => f.write_str("black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub role: Role,
    #[serde(default)]
    pub king: bool,
}

impl Piece {
    pub fn man(role: Role) -> Self {
        Self { role, king: false }
    }
}

/// Row-major grid of squares, row 0 on red's side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    squares: Vec<Vec<Option<Piece>>>,
}

impl Board {
    pub fn empty() -> Self {
        Self {
            squares: vec![vec![None; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// Only dark squares are playable
    pub fn is_playable(row: usize, col: usize) -> bool {
        (row + col) % 2 == 1
    }

    pub fn piece_at(&self, row: usize, col: usize) -> Option<Piece> {
        self.squares.get(row)?.get(col).copied().flatten()
    }

    pub fn place(&mut self, row: usize, col: usize, piece: Option<Piece>) {
        if let Some(square) = self.squares.get_mut(row).and_then(|r| r.get_mut(col)) {
            *square = piece;
        }
    }

    pub fn count(&self, role: Role) -> usize {
        self.squares
            .iter()
            .flatten()
            .filter(|sq| matches!(sq, Some(p) if p.role == role))
            .count()
    }
}

/// Match state persisted with each room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub turn: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub black: Option<UserId>,
}

impl GameState {
    pub fn new(board: Board) -> Self {
        Self {
            board,
            turn: Role::Red,
            winner: None,
            black: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    /// Copy of this state with the black player recorded
    pub fn with_black(&self, user: &UserId) -> Self {
        Self {
            black: Some(user.clone()),
            ..self.clone()
        }
    }
}

/// Produces the initial state for a new room
pub trait BoardGenerator: Send + Sync {
    fn generate(&self) -> GameState;
}

impl<F> BoardGenerator for F
where
    F: Fn() -> GameState + Send + Sync,
{
    fn generate(&self) -> GameState {
        self()
    }
}

/// Standard opening: three rows of men per side on the dark squares
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardBoard;

impl BoardGenerator for StandardBoard {
    fn generate(&self) -> GameState {
        let mut board = Board::empty();
        for row in 0..BOARD_SIZE {
            let role = if row < START_ROWS {
                Role::Red
            } else if row >= BOARD_SIZE - START_ROWS {
                Role::Black
            } else {
                continue;
            };
            for col in (0..BOARD_SIZE).filter(|&col| Board::is_playable(row, col)) {
                board.place(row, col, Some(Piece::man(role)));
            }
        }
        GameState::new(board)
    }
}
