//! Manages the WebSocket connection lifecycle for a classroom session.

use super::protocol::{ClientMessage, ClientVoices, ServerMessage};
use crate::{
    models::{Session, SessionStatus, TranscriptLine},
    narration::{ClientLink, backend_chain},
    state::AppState,
};
use anyhow::{Context, Result, anyhow};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use classroom_core::{
    ClassroomEvent,
    classroom::Classroom,
    content::LessonRequest,
    persona::Roster,
    playback::{Board, PlaybackSnapshot},
    timing::Timings,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Drives one classroom connection.
///
/// The first message must be `init`, naming a session created over REST. The
/// session's classroom is built around this connection (its narration plays
/// in this client) and started; the connection then relays intents in and
/// state out until either side goes away. A client leaving ends the class.
#[instrument(name = "ws_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let temp_id: u32 = rand::random();
    tracing::Span::current().record("session_id", temp_id.to_string());
    info!("New WebSocket connection. Awaiting initialization...");

    let (mut socket_tx, mut socket_rx) = socket.split();

    let init = match socket_rx.next().await {
        Some(Ok(Message::Text(text))) => parse_init(&text),
        Some(Ok(_)) => Err(anyhow!("First message was not a text `init` message.")),
        _ => {
            info!("Client disconnected before sending init message.");
            return;
        }
    };
    let (session_id, voices) = match init {
        Ok(init) => init,
        Err(e) => return reject(&mut socket_tx, e).await,
    };
    tracing::Span::current().record("session_id", session_id.to_string());

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let link = Arc::new(ClientLink::new(outbound_tx, voices));
    let (classroom, session) = match attach_classroom(&state, session_id, link.clone()) {
        Ok(attached) => attached,
        Err(e) => return reject(&mut socket_tx, e).await,
    };
    info!(topic = %session.topic, subject = %session.subject, ?voices, "Classroom attached");

    if let Err(e) = run_session(
        &state,
        &session,
        &classroom,
        &link,
        socket_tx,
        socket_rx,
        outbound_rx,
    )
    .await
    {
        error!(error = ?e, "Classroom session terminated with error.");
    }

    link.close();
    if !classroom.is_finished() {
        classroom.end_class();
    }
    info!("WebSocket connection closed.");
}

fn parse_init(text: &str) -> Result<(Uuid, ClientVoices)> {
    match serde_json::from_str::<ClientMessage>(text).context("Malformed `init` message")? {
        ClientMessage::Init { session_id, voices } => Ok((session_id, voices)),
        _ => Err(anyhow!("First message must be `init`")),
    }
}

async fn reject(socket_tx: &mut SplitSink<WebSocket, Message>, err: anyhow::Error) {
    error!("Session initialization failed: {:?}", err);
    let _ = send_msg(
        socket_tx,
        ServerMessage::Error {
            message: err.to_string(),
        },
    )
    .await;
}

/// Builds the session's classroom with a narration chain bound to this client.
fn attach_classroom(
    state: &AppState,
    session_id: Uuid,
    link: Arc<ClientLink>,
) -> Result<(Arc<Classroom>, Session)> {
    let session = state
        .store
        .get(session_id)
        .with_context(|| format!("Session with id '{session_id}' not found"))?;
    let backends = backend_chain(&state.http, state.config.elevenlabs_api_key.as_deref(), link);
    let classroom = Arc::new(Classroom::new(
        LessonRequest::new(&session.topic, &session.subject),
        Roster::default(),
        state.content.clone(),
        backends,
        Timings::default(),
    ));
    let session = state.store.attach(session_id, classroom.clone())?;
    Ok((classroom, session))
}

/// The main event loop for an attached classroom.
async fn run_session(
    state: &AppState,
    session: &Session,
    classroom: &Classroom,
    link: &ClientLink,
    mut socket_tx: SplitSink<WebSocket, Message>,
    mut socket_rx: SplitStream<WebSocket>,
    mut outbound_rx: mpsc::UnboundedReceiver<ServerMessage>,
) -> Result<()> {
    // Subscribe before starting so nothing is missed.
    let mut events = classroom.event_stream();
    let mut playback = classroom.watch_playback();
    let mut sent = playback.borrow_and_update().clone();

    send_msg(
        &mut socket_tx,
        ServerMessage::Initialized {
            session: session.clone(),
            roster: classroom.roster().iter().cloned().collect(),
            playback: sent.clone(),
            transcript: classroom
                .transcript()
                .iter()
                .map(|entry| TranscriptLine::from(entry.as_ref()))
                .collect(),
        },
    )
    .await
    .context("Failed to send Initialized message to client")?;
    classroom.start();

    loop {
        tokio::select! {
            msg = socket_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let reply = match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(msg) => apply_client_message(msg, classroom, link),
                        Err(e) => {
                            warn!(error = %e, "Ignoring malformed client message");
                            Some(ServerMessage::Error { message: format!("Malformed message: {e}") })
                        }
                    };
                    if let Some(reply) = reply {
                        send_msg(&mut socket_tx, reply).await?;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Client closed the connection.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("Error receiving from client WebSocket: {:?}", e);
                    break;
                }
            },
            changed = playback.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = playback.borrow_and_update().clone();
                if let Some(update) = playback_update(&sent, &next) {
                    send_msg(&mut socket_tx, update).await?;
                }
                sent = next;
            },
            event = events.next() => match event {
                Some(Ok(ClassroomEvent::EntryAppended(entry))) => {
                    send_msg(&mut socket_tx, ServerMessage::Entry { entry: TranscriptLine::from(entry.as_ref()) }).await?;
                }
                Some(Ok(ClassroomEvent::Reaction { participant, reaction })) => {
                    send_msg(&mut socket_tx, ServerMessage::Reaction { participant, reaction }).await?;
                }
                Some(Ok(ClassroomEvent::ClassFinished)) => {
                    if let Err(e) = state.store.set_status(session.id, SessionStatus::Ended) {
                        warn!(error = %e, "Could not mark session ended");
                    }
                    send_msg(&mut socket_tx, ServerMessage::ClassFinished).await?;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Client fell behind on classroom events");
                }
                None => break,
            },
            Some(msg) = outbound_rx.recv() => {
                send_msg(&mut socket_tx, msg).await?;
            },
        }
    }
    Ok(())
}

/// Applies one client intent. Returns an error message for the client when
/// the intent was refused.
fn apply_client_message(
    msg: ClientMessage,
    classroom: &Classroom,
    link: &ClientLink,
) -> Option<ServerMessage> {
    let outcome = match msg {
        ClientMessage::Init { .. } => Err("Session already initialized".to_string()),
        ClientMessage::Pause => {
            classroom.pause();
            Ok(())
        }
        ClientMessage::Resume => {
            classroom.resume();
            Ok(())
        }
        ClientMessage::SetSpeed { speed } => classroom.set_speed(speed).map_err(|e| e.to_string()),
        ClientMessage::Skip => {
            classroom.skip();
            Ok(())
        }
        ClientMessage::EndClass => {
            classroom.end_class();
            Ok(())
        }
        ClientMessage::Join { name } => classroom
            .join_observer(&name)
            .map(|_| ())
            .map_err(|e| e.to_string()),
        ClientMessage::ObserverMessage { name, text } => classroom
            .send_observer_message(&name, &text)
            .map(|_| ())
            .map_err(|e| e.to_string()),
        ClientMessage::NarrationFinished { id } => {
            link.acknowledge(id);
            Ok(())
        }
    };
    outcome.err().map(|message| {
        warn!(%message, "Client intent refused");
        ServerMessage::Error { message }
    })
}

/// The message that brings a client holding `sent` up to `next`. A reveal
/// tick only ships the new characters.
fn playback_update(sent: &PlaybackSnapshot, next: &PlaybackSnapshot) -> Option<ServerMessage> {
    if sent == next {
        return None;
    }
    let only_text_grew = PlaybackSnapshot {
        board: Board {
            text: sent.board.text.clone(),
            ..next.board.clone()
        },
        ..next.clone()
    } == *sent;
    if only_text_grew {
        if let Some(revealed) = next.board.text.strip_prefix(sent.board.text.as_str()) {
            return Some(ServerMessage::BoardAppend {
                text: revealed.to_string(),
            });
        }
    }
    Some(ServerMessage::Playback {
        state: next.clone(),
    })
}

/// Serializes `msg` as a text frame.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
