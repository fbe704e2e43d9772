use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::channel::mpsc;
use futures::stream::{Stream, StreamExt};
use futures::sink::SinkExt;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::{broadcast, Mutex};
use tracing::info;

use crate::error::{TransportError, VoteInputError};
use crate::models::{
    game::ChannelId,
    notice::Notice,
    player::PlayerId,
    vote::{BallotInput, Choice, ChoiceRequest, SessionId, ViewHandle, VoteProgress},
};
use crate::state::AppState;
use crate::transport::{ChoiceSurface, Transport};

const CHANNEL_CAPACITY: usize = 1000;

/// Everything pushed to a connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    Notice(Notice),
    Choice(ChoiceRequest),
    Progress(VoteProgress),
}

/// Vote input frames sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Select { session_id: SessionId, choice: Choice },
    Confirm { session_id: SessionId },
}

impl ClientMessage {
    pub fn session_id(&self) -> SessionId {
        match self {
            ClientMessage::Select { session_id, .. } | ClientMessage::Confirm { session_id } => {
                *session_id
            }
        }
    }

    fn into_input(self) -> BallotInput {
        match self {
            ClientMessage::Select { choice, .. } => BallotInput::Select { choice },
            ClientMessage::Confirm { .. } => BallotInput::Confirm,
        }
    }
}

type RouteKey = (SessionId, PlayerId);
type Routes = Arc<StdMutex<HashMap<RouteKey, mpsc::UnboundedSender<BallotInput>>>>;

/// Websocket backed transport. Each connected player listens on a private
/// broadcast channel and optionally on the channel of their game; vote
/// inputs are routed to the session that presented the choice. Channel
/// entries live while at least one socket listens on them.
#[derive(Clone, Default)]
pub struct PlayerHub {
    players: Arc<Mutex<HashMap<PlayerId, broadcast::Sender<ServerMessage>>>>,
    channels: Arc<Mutex<HashMap<ChannelId, broadcast::Sender<ServerMessage>>>>,
    routes: Routes,
}

impl PlayerHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe_player(&self, player: PlayerId) -> broadcast::Receiver<ServerMessage> {
        let mut players = self.players.lock().await;
        players
            .entry(player)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    pub async fn subscribe_channel(
        &self,
        channel: ChannelId,
    ) -> broadcast::Receiver<ServerMessage> {
        let mut channels = self.channels.lock().await;
        channels
            .entry(channel)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Drops the player's and the channel's entries once no socket listens.
    pub async fn release(&self, player: PlayerId, channel: Option<ChannelId>) {
        let mut players = self.players.lock().await;
        if players
            .get(&player)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            players.remove(&player);
            debug!("Player {} has no open connection left", player);
        }
        drop(players);

        if let Some(channel) = channel {
            let mut channels = self.channels.lock().await;
            if channels
                .get(&channel)
                .is_some_and(|sender| sender.receiver_count() == 0)
            {
                channels.remove(&channel);
            }
        }
    }

    pub async fn connected_players(&self) -> usize {
        self.players.lock().await.len()
    }

    async fn push(&self, player: PlayerId, message: ServerMessage) -> Result<(), TransportError> {
        let sender = self
            .players
            .lock()
            .await
            .get(&player)
            .cloned()
            .ok_or(TransportError::Undeliverable(player))?;
        sender
            .send(message)
            .map(|_| ())
            .map_err(|_| TransportError::Undeliverable(player))
    }

    /// Hands one input to the session waiting for it.
    pub fn route(
        &self,
        session: SessionId,
        voter: PlayerId,
        input: BallotInput,
    ) -> Result<(), VoteInputError> {
        let routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = routes
            .get(&(session, voter))
            .ok_or(VoteInputError::SessionNotFound)?;
        sender
            .unbounded_send(input)
            .map_err(|_| VoteInputError::SessionNotFound)
    }

    pub fn dispatch(&self, voter: PlayerId, message: ClientMessage) -> Result<(), VoteInputError> {
        let session = message.session_id();
        self.route(session, voter, message.into_input())
    }

    pub fn open_routes(&self) -> usize {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A voter's inputs for one session. Dropping it closes the route.
struct BallotInbox {
    key: RouteKey,
    inputs: mpsc::UnboundedReceiver<BallotInput>,
    routes: Routes,
}

impl BallotInbox {
    fn open(routes: &Routes, key: RouteKey) -> Self {
        let (sender, inputs) = mpsc::unbounded();
        routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, sender);
        Self {
            key,
            inputs,
            routes: Arc::clone(routes),
        }
    }
}

impl Stream for BallotInbox {
    type Item = BallotInput;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inputs.poll_next_unpin(cx)
    }
}

impl Drop for BallotInbox {
    fn drop(&mut self) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[async_trait]
impl Transport for PlayerHub {
    async fn send_private(&self, player: PlayerId, notice: Notice) -> Result<(), TransportError> {
        self.push(player, ServerMessage::Notice(notice)).await
    }

    async fn send_public(&self, channel: ChannelId, notice: Notice) -> Result<(), TransportError> {
        let delivered = match self.channels.lock().await.get(&channel) {
            Some(sender) => sender.send(ServerMessage::Notice(notice)).is_ok(),
            None => false,
        };
        if !delivered {
            debug!("Nobody is listening on channel {}", channel);
        }
        Ok(())
    }

    async fn present_choice(
        &self,
        request: ChoiceRequest,
    ) -> Result<ChoiceSurface, TransportError> {
        let view = ViewHandle {
            session: request.session,
            voter: request.voter,
        };
        let inbox = BallotInbox::open(&self.routes, (view.session, view.voter));
        // on failure the inbox is dropped and takes its route with it
        self.push(view.voter, ServerMessage::Choice(request)).await?;
        Ok(ChoiceSurface {
            view,
            inputs: inbox.boxed(),
        })
    }

    async fn update_progress(
        &self,
        view: &ViewHandle,
        progress: &VoteProgress,
    ) -> Result<(), TransportError> {
        self.push(view.voter, ServerMessage::Progress(progress.clone()))
            .await
    }
}

#[derive(Debug, Deserialize)]
pub struct ChannelQuery {
    pub channel_id: Option<ChannelId>,
}

pub async fn handler(
    State(state): State<AppState>,
    Path(player_id): Path<u64>,
    Query(query): Query<ChannelQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub, PlayerId(player_id), query.channel_id))
}

pub async fn handle_socket(
    ws: WebSocket,
    hub: PlayerHub,
    player: PlayerId,
    channel: Option<ChannelId>,
) {
    info!("New WebSocket connection for player {}", player);
    let mut private_rx = hub.subscribe_player(player).await;
    let mut public_rx = match channel {
        Some(channel) => Some(hub.subscribe_channel(channel).await),
        None => None,
    };

    let (mut sender, mut receiver) = ws.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            let next = tokio::select! {
                message = private_rx.recv() => message,
                message = async {
                    match public_rx.as_mut() {
                        Some(rx) => rx.recv().await,
                        None => std::future::pending().await,
                    }
                } => message,
            };
            let message = match next {
                Ok(message) => message,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Player {} missed {} messages", player, skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Could not encode message for {}: {}", player, e);
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(text)).await {
                debug!("Connection to {} closed: {}", player, e);
                break;
            }
        }
    });

    let inbound_hub = hub.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            let Message::Text(text) = message else {
                continue;
            };
            let outcome = match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => inbound_hub
                    .dispatch(player, message)
                    .map_err(|e| e.to_string()),
                Err(e) => Err(format!("Invalid message: {}", e)),
            };
            if let Err(reason) = outcome {
                if let Err(e) = inbound_hub.send_private(player, Notice::text(reason)).await {
                    warn!("Could not report error to {}: {}", player, e);
                }
            }
        }
    });

    // wait for the aborted task so its receiver is gone before releasing
    tokio::select! {
        _ = &mut send_task => {
            receive_task.abort();
            let _ = receive_task.await;
        }
        _ = &mut receive_task => {
            send_task.abort();
            let _ = send_task.await;
        }
    }
    hub.release(player, channel).await;
    info!("WebSocket connection for player {} closed", player);
}
