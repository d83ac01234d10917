//! Line-oriented console: reads commands from stdin, prints session events.
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use escape_core::{CardinalDirection, SessionEvent};
use escape_runtime::{Event, NetworkEvent, Runtime, RuntimeHandle, Topic};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

/// How long a console step holds the direction down.
const TAP: Duration = Duration::from_millis(30);

const HELP: &str = "commands: w/a/s/d or north/south/east/west, e (interact), \
self (interact with yourself), pick <id>, x (release), cancel, g (grab), \
drop <n>, r (restart), status, q (quit)";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    Step(CardinalDirection),
    Interact { self_only: bool },
    Choose(String),
    Release,
    Dismiss,
    PickUp,
    Place(usize),
    Restart,
    Status,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let head = words.next().ok_or_else(|| HELP.to_owned())?;
        let arg = words.next();

        let command = match (head, arg) {
            ("w", None) => ConsoleCommand::Step(CardinalDirection::North),
            ("a", None) => ConsoleCommand::Step(CardinalDirection::West),
            ("s", None) => ConsoleCommand::Step(CardinalDirection::South),
            ("d", None) => ConsoleCommand::Step(CardinalDirection::East),
            ("e", None) => ConsoleCommand::Interact { self_only: false },
            ("self", None) => ConsoleCommand::Interact { self_only: true },
            ("pick", Some(id)) => ConsoleCommand::Choose(id.to_owned()),
            ("x", None) => ConsoleCommand::Release,
            ("cancel", None) => ConsoleCommand::Dismiss,
            ("g", None) => ConsoleCommand::PickUp,
            ("drop", Some(index)) => ConsoleCommand::Place(
                index
                    .parse()
                    .map_err(|_| format!("'{index}' is not an inventory slot"))?,
            ),
            ("r", None) => ConsoleCommand::Restart,
            ("status", None) => ConsoleCommand::Status,
            ("q", None) => ConsoleCommand::Quit,
            (word, None) => CardinalDirection::from_str(word)
                .map(ConsoleCommand::Step)
                .map_err(|_| HELP.to_owned())?,
            _ => return Err(HELP.to_owned()),
        };
        Ok(command)
    }
}

/// Reads stdin until `q` or end of input.
pub async fn run(runtime: &Runtime) -> Result<()> {
    let handle = runtime.handle();
    let printer = tokio::spawn(print_events(
        handle.subscribe(Topic::Session),
        handle.subscribe(Topic::Network),
    ));

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<ConsoleCommand>() {
            Ok(ConsoleCommand::Quit) => break,
            Ok(command) => execute(&handle, command).await?,
            Err(help) => println!("{help}"),
        }
    }

    printer.abort();
    Ok(())
}

async fn execute(handle: &RuntimeHandle, command: ConsoleCommand) -> Result<()> {
    match command {
        ConsoleCommand::Step(direction) => {
            handle.press(direction).await?;
            tokio::time::sleep(TAP).await;
            handle.release(direction).await?;
        }
        ConsoleCommand::Interact { self_only } => handle.interact(self_only).await?,
        ConsoleCommand::Choose(id) => handle.select_interaction(id).await?,
        ConsoleCommand::Release => handle.release_interaction().await?,
        ConsoleCommand::Dismiss => handle.dismiss_interaction().await?,
        ConsoleCommand::PickUp => handle.pick_up().await?,
        ConsoleCommand::Place(index) => handle.place_item(index).await?,
        ConsoleCommand::Restart => handle.restart().await?,
        ConsoleCommand::Status => {
            let snapshot = handle.snapshot().await?;
            let player = &snapshot.state.player;
            println!(
                "{} at ({}, {}) facing {}, lives {}, moves {}, {} ms",
                snapshot.status,
                player.position.x,
                player.position.y,
                player.facing,
                player.lives(),
                snapshot.state.moves,
                snapshot.elapsed_ms
            );
        }
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

async fn print_events(
    mut session: broadcast::Receiver<Event>,
    mut network: broadcast::Receiver<Event>,
) {
    loop {
        let event = tokio::select! {
            event = session.recv() => event,
            event = network.recv() => event,
        };
        match event {
            Ok(event) => {
                if let Some(line) = describe(&event) {
                    println!("{line}");
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Console lagged behind by {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn describe(event: &Event) -> Option<String> {
    match event {
        Event::Session(event) => describe_session(event),
        Event::Network(NetworkEvent::ConnectionChanged(state)) => {
            Some(format!("[net] {state:?}"))
        }
        Event::Network(NetworkEvent::RosterChanged { peers }) => {
            Some(format!("[net] in room: {}", peers.join(", ")))
        }
        Event::Changed(_) | Event::Clock(_) => None,
    }
}

fn describe_session(event: &SessionEvent) -> Option<String> {
    let line = match event {
        SessionEvent::Moved { to, .. } => format!("moved to ({}, {})", to.x, to.y),
        SessionEvent::MoveBlocked { message, .. } => message.clone()?,
        SessionEvent::Damaged { lives, message, .. } => match message {
            Some(message) => format!("{message} ({lives} lives left)"),
            None => format!("ouch ({lives} lives left)"),
        },
        SessionEvent::InteractionChoices { choices } => {
            let ids: Vec<&str> = choices.iter().map(|choice| choice.id.as_str()).collect();
            format!("choose: {}", ids.join(", "))
        }
        SessionEvent::InteractionStarted { id, duration_ms, .. } => {
            format!("{id}... ({duration_ms} ms, hold on)")
        }
        SessionEvent::InteractionCompleted { id, message }
        | SessionEvent::InteractionFailed { id, message } => {
            message.clone().unwrap_or_else(|| format!("{id} done"))
        }
        SessionEvent::InteractionCancelled { message, .. } => message.clone(),
        SessionEvent::ItemPlaced { item_type, .. } => format!("placed {item_type}"),
        SessionEvent::ItemPickedUp { item_type, .. } => format!("picked up {item_type}"),
        SessionEvent::GateChanged { position, opened } => format!(
            "a gate at ({}, {}) {}",
            position.x,
            position.y,
            if *opened { "opens" } else { "closes" }
        ),
        SessionEvent::ExitLocked => "the exit is locked: objectives remain".to_owned(),
        SessionEvent::ExitReached => "you reached the exit".to_owned(),
        SessionEvent::ObjectivesChanged { all_complete, .. } if *all_complete => {
            "all objectives complete".to_owned()
        }
        SessionEvent::StatusChanged { status } => format!("session {status}"),
        SessionEvent::Message { text } => text.clone(),
        SessionEvent::InteractionProgress { .. } | SessionEvent::ObjectivesChanged { .. } => {
            return None;
        }
    };
    Some(line)
}
