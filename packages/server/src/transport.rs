use async_trait::async_trait;
use futures::future::join_all;
use futures::stream::BoxStream;
use log::warn;

use crate::error::TransportError;
use crate::models::{
    game::ChannelId,
    notice::Notice,
    player::PlayerId,
    vote::{BallotInput, ChoiceRequest, ViewHandle, VoteProgress},
};

pub type BallotStream = BoxStream<'static, BallotInput>;

/// A voter's private choice surface. The input stream belongs to the voting
/// session that asked for it; dropping it closes the route on the transport.
pub struct ChoiceSurface {
    pub view: ViewHandle,
    pub inputs: BallotStream,
}

/// How the game reaches players. The engine does not care whether messages
/// end up in a chat platform, a websocket, or a test recorder.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_private(&self, player: PlayerId, notice: Notice) -> Result<(), TransportError>;

    async fn send_public(&self, channel: ChannelId, notice: Notice) -> Result<(), TransportError>;

    async fn present_choice(&self, request: ChoiceRequest)
        -> Result<ChoiceSurface, TransportError>;

    async fn update_progress(
        &self,
        view: &ViewHandle,
        progress: &VoteProgress,
    ) -> Result<(), TransportError>;
}

/// Private message whose failure is logged and otherwise ignored.
pub async fn notify(transport: &dyn Transport, player: PlayerId, notice: Notice) {
    if let Err(e) = transport.send_private(player, notice).await {
        warn!("Failed to notify player {}: {}", player, e);
    }
}

pub async fn notify_all(
    transport: &dyn Transport,
    players: impl IntoIterator<Item = PlayerId>,
    notice: Notice,
) {
    join_all(
        players
            .into_iter()
            .map(|player| notify(transport, player, notice.clone())),
    )
    .await;
}

pub async fn announce(transport: &dyn Transport, channel: ChannelId, notice: Notice) {
    if let Err(e) = transport.send_public(channel, notice).await {
        warn!("Failed to announce in channel {}: {}", channel, e);
    }
}
