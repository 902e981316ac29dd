use std::error::Error;

use checkers_lobby::game::{BOARD_SIZE, GameState, Role};
use checkers_lobby::lobby::{LobbyAction, LobbyCoordinator, LobbyState, RoomId, Session, UserId};
use checkers_lobby::store::{DEFAULT_STORE_PORT, RemoteStore};
use tokio::io::{self, AsyncBufReadExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .unwrap_or_else(|| format!("ws://127.0.0.1:{}", DEFAULT_STORE_PORT));
    let user = args
        .next()
        .map(|id| UserId::from(id.as_str()))
        .unwrap_or_else(UserId::guest);

    // 1. Connect to the document server
    let store = RemoteStore::connect(&url).await?;
    println!("Connected to {} as {}", url, user);

    // 2. Local store and router fed by the coordinator
    let (action_tx, action_rx) = async_channel::unbounded::<LobbyAction>();
    let (route_tx, route_rx) = async_channel::unbounded::<String>();
    let lobby = LobbyCoordinator::new(store, action_tx, route_tx);
    let session = Session::signed_in(user);
    let mut state = LobbyState::new();

    println!("Commands: create | list | join <room-id> | quit");

    // 3. Command loop
    let mut stdin = io::BufReader::new(io::stdin()).lines();
    while let Ok(Some(line)) = stdin.next_line().await {
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some("create"), None) => {
                match lobby.create_room(&session).await {
                    Ok(room) => println!("Created room {}", room.room_id),
                    Err(e) => println!("Create failed: {}", e),
                }
            }
            (Some("list"), None) => {
                if let Err(e) = lobby.fetch_rooms(&session).await {
                    println!("List failed: {}", e);
                }
            }
            (Some("join"), Some(id)) => {
                if let Err(e) = lobby.join_room(&session, &RoomId::from(id)).await {
                    println!("Join failed: {}", e);
                }
            }
            (Some("quit"), None) => break,
            (None, _) => continue,
            _ => {
                println!("Unknown command: {}", line.trim());
                continue;
            }
        }

        state.drain(&action_rx);
        print_state(&state);
        while let Ok(route) = route_rx.try_recv() {
            println!("> Now viewing {}", route);
        }
    }

    Ok(())
}

fn print_state(state: &LobbyState) {
    println!("Joined rooms:  {:?}", ids(&state.rooms.joined_rooms));
    println!("Waiting rooms: {:?}", ids(&state.rooms.waiting_rooms));

    let joined = &state.joined;
    match (&joined.room_id, joined.role) {
        (Some(room_id), Some(role)) => println!(
            "Seated in {} as {} (room full: {})",
            room_id,
            role,
            joined.full.unwrap_or(false)
        ),
        (None, _) if joined.full == Some(false) => println!("Join rejected"),
        _ => {}
    }

    if let Some(game) = &state.game {
        print_board(game);
    }
}

fn ids(rooms: &[RoomId]) -> Vec<&str> {
    rooms.iter().map(RoomId::as_str).collect()
}

fn print_board(game: &GameState) {
    for row in (0..BOARD_SIZE).rev() {
        let line: String = (0..BOARD_SIZE)
            .map(|col| match game.board.piece_at(row, col) {
                Some(p) if p.role == Role::Red => if p.king { 'R' } else { 'r' },
                Some(p) => if p.king { 'B' } else { 'b' },
                None => '.',
            })
            .collect();
        println!("  {}", line);
    }
    println!("  {} to move", game.turn);
}
