//! Terminal chess client for Knightlink.
//!
//! Connects for a random opponent, or to a friend's room, and reconnects
//! with backoff if the link drops (max 5 retries, 1s doubling delay).
//!
//! Input lines:
//! - `/move e2 e4 [q]` sends a move (optional promotion piece)
//! - `/start <seconds|none>` proposes a time control and starts the game
//! - `/quit` leaves
//! - anything else is sent as a chat message
//!
//! Run with:
//! ```not_rust
//! cargo run --bin knightlink-cli
//! cargo run --bin knightlink-cli -- --new-room
//! cargo run --bin knightlink-cli -- --room ABC123 --client-id alice
//! ```

use clap::Parser;
use knightlink::logger::setup_logger;
use knightlink::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "knightlink-cli")]
#[command(about = "Play chess against a random opponent or a friend", long_about = None)]
struct Args {
    /// Server base URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:3000")]
    url: String,

    /// Identity to present to the server (generated when omitted)
    #[arg(short = 'c', long)]
    client_id: Option<String>,

    /// Join the room with this code
    #[arg(short = 'r', long, conflicts_with = "new_room")]
    room: Option<String>,

    /// Host a new room with a generated code
    #[arg(short = 'n', long)]
    new_room: bool,
}

/// One line of user input, interpreted.
#[derive(Debug, PartialEq)]
enum Input {
    Send(Message),
    Quit,
    Skip,
    Invalid(&'static str),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Skip;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Send(Message::ChatMessage {
            text: line.to_owned(),
        });
    };

    let words: Vec<&str> = command.split_whitespace().collect();
    match words.as_slice() {
        ["quit"] => Input::Quit,
        ["move", from, to] => Input::Send(Message::Move {
            from: from.to_string(),
            to: to.to_string(),
            promotion: None,
        }),
        ["move", from, to, promotion] => Input::Send(Message::Move {
            from: from.to_string(),
            to: to.to_string(),
            promotion: Some(promotion.to_string()),
        }),
        ["move", ..] => Input::Invalid("usage: /move <from> <to> [promotion]"),
        ["start", "none"] => Input::Send(Message::StartGame { time_control: None }),
        ["start", secs] => match secs.parse() {
            Ok(secs) => Input::Send(Message::StartGame {
                time_control: Some(secs),
            }),
            Err(_) => Input::Invalid("usage: /start <seconds|none>"),
        },
        ["start", ..] => Input::Invalid("usage: /start <seconds|none>"),
        _ => Input::Invalid("commands: /move, /start, /quit"),
    }
}

/// Renders a server message for the terminal.
fn describe(message: &Message) -> String {
    match message {
        Message::WaitingForOpponent => "waiting for an opponent...".to_owned(),
        Message::WaitingForFriend { room_id } => {
            format!("waiting for your friend, share the code {room_id}")
        }
        Message::MatchFound { color } => format!("match found, you play {color}"),
        Message::Move {
            from,
            to,
            promotion,
        } => match promotion {
            Some(piece) => format!("opponent moved {from} -> {to} (promotes to {piece})"),
            None => format!("opponent moved {from} -> {to}"),
        },
        Message::ChatMessage { text } => format!("> {text}"),
        Message::StartGame { time_control } => match time_control {
            Some(secs) => format!("game started, {secs}s per side"),
            None => "game started, untimed".to_owned(),
        },
        Message::OpponentDisconnected => "your opponent disconnected".to_owned(),
        Message::FriendLeft => "your friend left".to_owned(),
        other => format!("unexpected {} message", other.type_name()),
    }
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "warn");

    let args = Args::parse();

    let identity = args
        .client_id
        .map(ClientIdentity::new)
        .unwrap_or_else(generate_identity);
    let intent = match (args.room, args.new_room) {
        (Some(code), _) => Intent::Room(RoomCode::new(code)),
        (None, true) => {
            let code = generate_room_code();
            println!("room code: {code}");
            Intent::Room(code)
        }
        (None, false) => Intent::Random,
    };
    println!("playing as {identity}, looking for a {intent}");

    let client = GameClient::new(ClientConfig::new(args.url, intent).with_identity(identity));
    let mut status = client.status();
    let (to_server, outgoing) = mpsc::channel(32);
    let (incoming, mut from_server) = mpsc::unbounded_channel();
    let mut run = tokio::spawn(client.run(outgoing, incoming));

    tokio::spawn(async move {
        loop {
            tokio::select! {
                message = from_server.recv() => match message {
                    Some(message) => println!("{}", describe(&message)),
                    None => break,
                },
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    println!("[{}]", *status.borrow_and_update());
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let result = loop {
        tokio::select! {
            result = &mut run => break result,
            line = lines.next_line() => {
                let Ok(Some(line)) = line else {
                    drop(to_server);
                    break run.await;
                };
                match parse_input(&line) {
                    Input::Send(message) => {
                        if to_server.send(message).await.is_err() {
                            break run.await;
                        }
                    }
                    Input::Quit => {
                        drop(to_server);
                        break run.await;
                    }
                    Input::Skip => {}
                    Input::Invalid(usage) => eprintln!("{usage}"),
                }
            }
        }
    };

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!(error = %e, "client task failed");
            std::process::exit(1);
        }
    }
}
