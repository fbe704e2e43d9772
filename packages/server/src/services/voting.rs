use futures::future::join_all;
use futures::stream::{self, select_all, BoxStream, StreamExt};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

use crate::error::VoteInputError;
use crate::models::{
    notice::Notice,
    player::{Player, PlayerId},
    vote::{
        BallotInput, BallotOption, Choice, ChoiceRequest, ProgressEntry, SessionId, Tally,
        ViewHandle, VoteProgress, VoteResult,
    },
};
use crate::transport::{notify, Transport};

const SKIP_LABEL: &str = "Skip";
const NO_VOTE_LABEL: &str = "No Vote";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteSettings {
    pub live_update: bool,
    pub skippable: bool,
    // extension point: unconfirmed voters are treated as Skip once it expires
    pub timeout: Option<Duration>,
}

impl VoteSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_update(mut self, live_update: bool) -> Self {
        self.live_update = live_update;
        self
    }

    pub fn skippable(mut self, skippable: bool) -> Self {
        self.skippable = skippable;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Accepted(Choice),
    Duplicate,
}

type TaggedInput = (PlayerId, Option<BallotInput>);

/// One round of choice collection. Created per vote, consumed by [`run`].
///
/// [`run`]: VotingSession::run
#[derive(Debug)]
pub struct VotingSession {
    id: SessionId,
    title: String,
    voters: Vec<(PlayerId, String)>,
    options: Vec<BallotOption>,
    settings: VoteSettings,
    votes: BTreeMap<PlayerId, Option<Choice>>,
    confirmed: BTreeSet<PlayerId>,
    abstained: BTreeSet<PlayerId>,
}

impl VotingSession {
    pub fn new<'a>(
        title: impl Into<String>,
        voters: impl IntoIterator<Item = &'a Player>,
        options: impl IntoIterator<Item = &'a Player>,
        settings: VoteSettings,
    ) -> Self {
        let voters: Vec<(PlayerId, String)> = voters
            .into_iter()
            .map(|p| (p.id, p.name.clone()))
            .collect();
        let options = options
            .into_iter()
            .map(|p| BallotOption {
                choice: Choice::Player(p.id),
                label: p.name.clone(),
            })
            .collect();
        let votes = voters.iter().map(|(id, _)| (*id, None)).collect();

        Self {
            id: SessionId::new(),
            title: title.into(),
            voters,
            options,
            settings,
            votes,
            confirmed: BTreeSet::new(),
            abstained: BTreeSet::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.confirmed.len() == self.votes.len()
    }

    /// Records a selection. `Ok(false)` means the voter already confirmed and
    /// the selection was ignored.
    pub fn select(&mut self, voter: PlayerId, choice: Choice) -> Result<bool, VoteInputError> {
        if !self.votes.contains_key(&voter) {
            return Err(VoteInputError::UnknownVoter);
        }
        if self.confirmed.contains(&voter) {
            return Ok(false);
        }
        match choice {
            Choice::Skip if !self.settings.skippable => return Err(VoteInputError::SkipNotAllowed),
            Choice::Player(_) if !self.options.iter().any(|o| o.choice == choice) => {
                return Err(VoteInputError::InvalidOption)
            }
            _ => {}
        }
        self.votes.insert(voter, Some(choice));
        Ok(true)
    }

    pub fn confirm(&mut self, voter: PlayerId) -> Result<Confirmation, VoteInputError> {
        let selection = *self
            .votes
            .get(&voter)
            .ok_or(VoteInputError::UnknownVoter)?;
        if self.confirmed.contains(&voter) {
            return Ok(Confirmation::Duplicate);
        }
        let choice = selection.ok_or(VoteInputError::NoSelection)?;
        self.confirmed.insert(voter);
        Ok(Confirmation::Accepted(choice))
    }

    /// Confirms a voter that can no longer answer as Skip.
    pub fn abstain(&mut self, voter: PlayerId) -> bool {
        if !self.votes.contains_key(&voter) || self.confirmed.contains(&voter) {
            return false;
        }
        self.votes.insert(voter, Some(Choice::Skip));
        self.confirmed.insert(voter);
        self.abstained.insert(voter);
        true
    }

    fn abstain_remaining(&mut self) {
        let pending: Vec<PlayerId> = self
            .votes
            .keys()
            .filter(|voter| !self.confirmed.contains(voter))
            .copied()
            .collect();
        for voter in pending {
            self.abstain(voter);
        }
    }

    pub fn tally(&self) -> Tally {
        Tally::from_choices(
            self.confirmed
                .iter()
                .filter_map(|voter| self.votes.get(voter).copied().flatten()),
        )
    }

    pub fn progress(&self) -> VoteProgress {
        let entries = self
            .voters
            .iter()
            .map(|(voter, name)| ProgressEntry {
                voter: *voter,
                name: name.clone(),
                selection: match self.votes.get(voter).copied().flatten() {
                    Some(choice) => self.label(choice),
                    None => NO_VOTE_LABEL.to_string(),
                },
                confirmed: self.confirmed.contains(voter),
            })
            .collect();
        VoteProgress {
            session: self.id,
            title: self.title.clone(),
            entries,
        }
    }

    fn label(&self, choice: Choice) -> String {
        match choice {
            Choice::Skip => SKIP_LABEL.to_string(),
            Choice::Player(id) => self
                .options
                .iter()
                .find(|o| o.choice == choice)
                .map(|o| o.label.clone())
                .unwrap_or_else(|| id.to_string()),
        }
    }

    fn request_for(&self, voter: PlayerId) -> ChoiceRequest {
        let mut options = self.options.clone();
        if self.settings.skippable {
            options.push(BallotOption {
                choice: Choice::Skip,
                label: SKIP_LABEL.to_string(),
            });
        }
        ChoiceRequest {
            session: self.id,
            voter,
            title: self.title.clone(),
            options,
            allow_skip: self.settings.skippable,
        }
    }

    /// Presents the vote, collects inputs until every voter has confirmed,
    /// and resolves the tally. Input streams are dropped before returning.
    pub async fn run(mut self, transport: &dyn Transport) -> VoteResult {
        if self.votes.is_empty() || (self.options.is_empty() && !self.settings.skippable) {
            debug!("Vote '{}' has nothing to decide", self.title);
            return self.finish();
        }

        let surfaces = join_all(
            self.voters
                .iter()
                .map(|(voter, _)| transport.present_choice(self.request_for(*voter))),
        )
        .await;

        let voter_ids: Vec<PlayerId> = self.voters.iter().map(|(id, _)| *id).collect();
        let mut views = Vec::new();
        let mut streams: Vec<BoxStream<'static, TaggedInput>> = Vec::new();
        for (voter, surface) in voter_ids.into_iter().zip(surfaces) {
            match surface {
                Ok(surface) => {
                    views.push(surface.view);
                    streams.push(
                        surface
                            .inputs
                            .map(move |input| (voter, Some(input)))
                            .chain(stream::once(async move { (voter, None) }))
                            .boxed(),
                    );
                }
                Err(e) => {
                    warn!(
                        "Could not present '{}' to player {}: {}",
                        self.title, voter, e
                    );
                    self.abstain(voter);
                }
            }
        }

        if self.settings.live_update {
            self.publish_progress(transport, &views).await;
        }

        let mut inputs = select_all(streams);
        let deadline = self.settings.timeout.map(|timeout| Instant::now() + timeout);
        while !self.is_complete() {
            let next = match deadline {
                Some(deadline) => match timeout_at(deadline, inputs.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        info!(
                            "Vote '{}' timed out, remaining voters skip",
                            self.title
                        );
                        self.abstain_remaining();
                        break;
                    }
                },
                None => inputs.next().await,
            };

            match next {
                Some((voter, Some(input))) => self.apply(transport, &views, voter, input).await,
                Some((voter, None)) => {
                    if self.abstain(voter) {
                        debug!("Player {} left '{}' without confirming", voter, self.title);
                        if self.settings.live_update {
                            self.publish_progress(transport, &views).await;
                        }
                    }
                }
                None => self.abstain_remaining(),
            }
        }
        drop(inputs);

        self.finish()
    }

    async fn apply(
        &mut self,
        transport: &dyn Transport,
        views: &[ViewHandle],
        voter: PlayerId,
        input: BallotInput,
    ) {
        match input {
            BallotInput::Select { choice } => match self.select(voter, choice) {
                Ok(true) => {
                    if self.settings.live_update {
                        self.publish_progress(transport, views).await;
                    }
                }
                Ok(false) => debug!("Ignoring selection from confirmed voter {}", voter),
                Err(e) => notify(transport, voter, Notice::text(e.to_string())).await,
            },
            BallotInput::Confirm => match self.confirm(voter) {
                Ok(Confirmation::Accepted(choice)) => {
                    let ack = match choice {
                        Choice::Skip => "Skipped vote".to_string(),
                        Choice::Player(_) => format!("Selected {}", self.label(choice)),
                    };
                    notify(transport, voter, Notice::text(ack)).await;
                    if self.settings.live_update {
                        self.publish_progress(transport, views).await;
                    }
                }
                Ok(Confirmation::Duplicate) => debug!("Duplicate confirm from {}", voter),
                Err(e) => notify(transport, voter, Notice::text(e.to_string())).await,
            },
        }
    }

    async fn publish_progress(&self, transport: &dyn Transport, views: &[ViewHandle]) {
        let progress = self.progress();
        let results = join_all(
            views
                .iter()
                .map(|view| transport.update_progress(view, &progress)),
        )
        .await;
        for (view, result) in views.iter().zip(results) {
            if let Err(e) = result {
                warn!("Failed to update progress for {}: {}", view.voter, e);
            }
        }
    }

    fn finish(self) -> VoteResult {
        let tally = self.tally();
        let outcome = tally.resolve();
        info!("Vote '{}' resolved: {:?}", self.title, outcome);
        VoteResult {
            outcome,
            tally,
            ballots: self.votes,
            abstained: self.abstained,
        }
    }
}
