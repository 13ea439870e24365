//! Scripted headless client for smoke testing a running server
//!
//! Connects, picks a name, readies up, moves on a fixed cadence while racing
//! and requests a restart after each finish until the requested number of
//! rounds has been played.

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use shared::{sanitize_name, ClientMessage, GameMode, RaceStatus, ServerMessage, SetName, Snapshot};
use std::time::Duration;
use tokio::time::interval;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Scripted lane race client")]
struct Args {
    /// Server WebSocket URL
    #[clap(short, long, default_value = "ws://127.0.0.1:3001")]
    url: String,
    /// Display name to register; defaults to `Tester-NNNN` with a random
    /// suffix so several clients can tell themselves apart
    #[clap(short, long)]
    name: Option<String>,
    /// Fill the free lanes with AI bots
    #[clap(long)]
    ai: bool,
    /// Delay between moves while racing, in milliseconds
    #[clap(long, default_value_t = 50)]
    move_ms: u64,
    /// Number of finished races to play before disconnecting
    #[clap(long, default_value_t = 1)]
    rounds: u32,
}

/// Picks the name this client registers and later looks itself up by
///
/// Snapshots carry no "this is you" marker, so the name must be unique
/// among the humans in the lobby for the lookup to find the right player.
fn display_name(requested: Option<&str>, rng: &mut impl Rng) -> String {
    match requested {
        Some(name) => sanitize_name(name),
        None => format!("Tester-{:04}", rng.gen_range(0..10_000)),
    }
}

fn print_snapshot(snapshot: &Snapshot) {
    match snapshot.countdown {
        Some(n) => println!("[{:?}] countdown {}", snapshot.game_state, n),
        None => println!("[{:?}]", snapshot.game_state),
    }
    for p in &snapshot.players {
        println!(
            "  lane {} {:<15} pos={:>4} ready={} wins={}{}",
            p.lane,
            p.name,
            p.position,
            p.ready,
            p.wins,
            if p.is_ai { " (AI)" } else { "" }
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let my_name = display_name(args.name.as_deref(), &mut rand::thread_rng());

    let (ws, _) = connect_async(args.url.as_str()).await?;
    println!("Connected to {}", args.url);
    let (mut sink, mut source) = ws.split();

    let mode = if args.ai { GameMode::Ai } else { GameMode::Multiplayer };
    let set_name = ClientMessage::SetName(SetName {
        name: my_name.clone(),
        mode,
    });
    sink.send(Message::Text(set_name.to_json()?)).await?;

    let mut ticker = interval(Duration::from_millis(args.move_ms.max(1)));
    let mut status = RaceStatus::Waiting;
    let mut ready_sent = false;
    let mut restart_sent = false;
    let mut rounds_played = 0;

    loop {
        tokio::select! {
            frame = source.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => {
                        println!("Server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                };

                let snapshot = match ServerMessage::from_json(&text)? {
                    ServerMessage::GameFull => {
                        println!("Game is full");
                        break;
                    }
                    ServerMessage::UpdateGame(snapshot) => snapshot,
                };
                print_snapshot(&snapshot);

                let me = snapshot.players.iter().find(|p| !p.is_ai && p.name == my_name);
                let finished_now = status != RaceStatus::Finished
                    && snapshot.game_state == RaceStatus::Finished;
                status = snapshot.game_state;

                if finished_now {
                    rounds_played += 1;
                    if let Some(winner) = snapshot.players.iter().find(|p| p.has_finished()) {
                        println!("{} wins the race", winner.name);
                    }
                    if rounds_played >= args.rounds {
                        break;
                    }
                }

                match status {
                    RaceStatus::Waiting => {
                        restart_sent = false;
                        match me {
                            Some(me) if me.ready => ready_sent = false,
                            Some(_) if !ready_sent => {
                                sink.send(Message::Text(ClientMessage::ToggleReady.to_json()?)).await?;
                                ready_sent = true;
                            }
                            _ => {}
                        }
                    }
                    RaceStatus::Finished if !restart_sent => {
                        sink.send(Message::Text(ClientMessage::RequestRestart.to_json()?)).await?;
                        restart_sent = true;
                    }
                    _ => {}
                }
            }

            _ = ticker.tick() => {
                if status == RaceStatus::Racing {
                    sink.send(Message::Text(ClientMessage::Move.to_json()?)).await?;
                }
            }
        }
    }

    let _ = sink.close().await;
    println!("Test client finished after {} round(s)", rounds_played);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::MAX_NAME_LEN;

    #[test]
    fn test_default_name_gets_random_suffix() {
        let mut rng = StdRng::seed_from_u64(7);
        let names: Vec<String> = (0..20).map(|_| display_name(None, &mut rng)).collect();

        for name in &names {
            assert!(name.starts_with("Tester-"));
            assert!(name.chars().count() <= MAX_NAME_LEN);
            assert_eq!(sanitize_name(name), *name);
        }
        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        assert!(unique.len() > 1);
    }

    #[test]
    fn test_requested_name_is_sanitized() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(display_name(Some("  Ada  "), &mut rng), "Ada");
        assert_eq!(
            display_name(Some("Ada Lovelace the First"), &mut rng),
            "Ada Lovelace th"
        );
    }
}
