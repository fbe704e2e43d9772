use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::TransportError;
use crate::models::{
    game::ChannelId,
    notice::{Notice, NoticeBody},
    player::PlayerId,
    vote::{BallotInput, Choice, ChoiceRequest, ViewHandle, VoteProgress},
};
use crate::transport::{ChoiceSurface, Transport};

/// Decides what a voter sends for a given choice surface.
pub type VoterScript = Arc<dyn Fn(&ChoiceRequest) -> Vec<BallotInput> + Send + Sync>;

#[derive(Clone, Debug, PartialEq)]
pub enum Delivery {
    Private(PlayerId, Notice),
    Public(ChannelId, Notice),
    Choice(ChoiceRequest),
    Progress(ViewHandle, VoteProgress),
}

/// In-memory transport: records everything sent and answers every choice
/// surface from a script.
#[derive(Clone)]
pub struct ScriptedTransport {
    script: VoterScript,
    log: Arc<Mutex<Vec<Delivery>>>,
    unreachable: Arc<Mutex<HashSet<PlayerId>>>,
    // keep input streams open after the script runs out
    hold_open: bool,
}

pub fn pick(choice: Choice) -> Vec<BallotInput> {
    vec![BallotInput::Select { choice }, BallotInput::Confirm]
}

pub fn pick_player(id: PlayerId) -> Vec<BallotInput> {
    pick(Choice::Player(id))
}

impl ScriptedTransport {
    pub fn new(
        script: impl Fn(&ChoiceRequest) -> Vec<BallotInput> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Arc::new(script),
            log: Arc::new(Mutex::new(Vec::new())),
            unreachable: Arc::new(Mutex::new(HashSet::new())),
            hold_open: false,
        }
    }

    pub fn holding_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn unreachable(self, player: PlayerId) -> Self {
        lock(&self.unreachable).insert(player);
        self
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        lock(&self.log).clone()
    }

    pub fn choices(&self) -> Vec<ChoiceRequest> {
        self.deliveries()
            .into_iter()
            .filter_map(|d| match d {
                Delivery::Choice(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn choices_titled(&self, title: &str) -> Vec<ChoiceRequest> {
        self.choices()
            .into_iter()
            .filter(|request| request.title == title)
            .collect()
    }

    pub fn notices_for(&self, player: PlayerId) -> Vec<NoticeBody> {
        self.deliveries()
            .into_iter()
            .filter_map(|d| match d {
                Delivery::Private(to, notice) if to == player => Some(notice.body),
                _ => None,
            })
            .collect()
    }

    pub fn texts_for(&self, player: PlayerId) -> Vec<String> {
        self.notices_for(player)
            .into_iter()
            .filter_map(|body| match body {
                NoticeBody::Text { content } => Some(content),
                _ => None,
            })
            .collect()
    }

    pub fn public_notices(&self) -> Vec<NoticeBody> {
        self.deliveries()
            .into_iter()
            .filter_map(|d| match d {
                Delivery::Public(_, notice) => Some(notice.body),
                _ => None,
            })
            .collect()
    }

    pub fn progress_updates(&self) -> Vec<VoteProgress> {
        self.deliveries()
            .into_iter()
            .filter_map(|d| match d {
                Delivery::Progress(_, progress) => Some(progress),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        lock(&self.log).clear();
    }

    fn record(&self, delivery: Delivery) {
        lock(&self.log).push(delivery);
    }

    fn reachable(&self, player: PlayerId) -> Result<(), TransportError> {
        if lock(&self.unreachable).contains(&player) {
            Err(TransportError::Undeliverable(player))
        } else {
            Ok(())
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send_private(&self, player: PlayerId, notice: Notice) -> Result<(), TransportError> {
        self.reachable(player)?;
        self.record(Delivery::Private(player, notice));
        Ok(())
    }

    async fn send_public(&self, channel: ChannelId, notice: Notice) -> Result<(), TransportError> {
        self.record(Delivery::Public(channel, notice));
        Ok(())
    }

    async fn present_choice(
        &self,
        request: ChoiceRequest,
    ) -> Result<ChoiceSurface, TransportError> {
        self.reachable(request.voter)?;
        let scripted = stream::iter((self.script)(&request));
        let view = ViewHandle {
            session: request.session,
            voter: request.voter,
        };
        self.record(Delivery::Choice(request));

        let inputs = if self.hold_open {
            scripted.chain(stream::pending()).boxed()
        } else {
            scripted.boxed()
        };
        Ok(ChoiceSurface { view, inputs })
    }

    async fn update_progress(
        &self,
        view: &ViewHandle,
        progress: &VoteProgress,
    ) -> Result<(), TransportError> {
        self.record(Delivery::Progress(*view, progress.clone()));
        Ok(())
    }
}
