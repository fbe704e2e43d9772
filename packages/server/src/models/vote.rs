use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

use super::player::PlayerId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a voter can pick. `Skip` is an explicit abstention, distinct from
/// not having picked anything yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    Player(PlayerId),
    Skip,
}

/// One event from a voter's choice surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BallotInput {
    Select { choice: Choice },
    Confirm,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotOption {
    pub choice: Choice,
    pub label: String,
}

/// Everything a transport needs to render one voter's private choice surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRequest {
    pub session: SessionId,
    pub voter: PlayerId,
    pub title: String,
    pub options: Vec<BallotOption>,
    pub allow_skip: bool,
}

impl ChoiceRequest {
    pub fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.options.iter().filter_map(|option| match option.choice {
            Choice::Player(id) => Some(id),
            Choice::Skip => None,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewHandle {
    pub session: SessionId,
    pub voter: PlayerId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub voter: PlayerId,
    pub name: String,
    pub selection: String,
    pub confirmed: bool,
}

/// Shared live view of a vote: one line per voter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteProgress {
    pub session: SessionId,
    pub title: String,
    pub entries: Vec<ProgressEntry>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteOutcome {
    Winner(PlayerId),
    Tie,
    Skipped,
    NoVotes,
}

impl VoteOutcome {
    pub fn winner(self) -> Option<PlayerId> {
        match self {
            VoteOutcome::Winner(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tally(BTreeMap<Choice, usize>);

impl Tally {
    pub fn from_choices(choices: impl IntoIterator<Item = Choice>) -> Self {
        let mut counts = BTreeMap::new();
        for choice in choices {
            *counts.entry(choice).or_insert(0) += 1;
        }
        Tally(counts)
    }

    pub fn count(&self, choice: Choice) -> usize {
        self.0.get(&choice).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Strict plurality wins; a shared maximum is a tie, and a Skip plurality
    /// never elects anyone.
    pub fn resolve(&self) -> VoteOutcome {
        let Some(max) = self.0.values().copied().max() else {
            return VoteOutcome::NoVotes;
        };
        let mut leaders = self.0.iter().filter(|(_, count)| **count == max);
        match (leaders.next(), leaders.next()) {
            (Some((Choice::Player(id), _)), None) => VoteOutcome::Winner(*id),
            (Some((Choice::Skip, _)), None) => VoteOutcome::Skipped,
            (Some(_), Some(_)) => VoteOutcome::Tie,
            (None, _) => VoteOutcome::NoVotes,
        }
    }
}

/// Final state of a resolved session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteResult {
    pub outcome: VoteOutcome,
    pub tally: Tally,
    pub ballots: BTreeMap<PlayerId, Option<Choice>>,
    // voters counted as Skip without answering themselves
    pub abstained: BTreeSet<PlayerId>,
}

impl VoteResult {
    /// True when at least one voter answered on their own.
    pub fn had_response(&self) -> bool {
        self.ballots.len() > self.abstained.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: u64) -> Choice {
        Choice::Player(PlayerId(id))
    }

    #[test]
    fn strict_plurality_wins() {
        let tally = Tally::from_choices([player(1), player(2), player(1)]);
        assert_eq!(tally.resolve(), VoteOutcome::Winner(PlayerId(1)));
        assert_eq!(tally.count(player(1)), 2);
        assert_eq!(tally.total(), 3);
    }

    #[test]
    fn split_votes_are_a_tie() {
        let tally = Tally::from_choices([player(1), player(2)]);
        assert_eq!(tally.resolve(), VoteOutcome::Tie);

        let tally = Tally::from_choices([player(1), player(2), player(3)]);
        assert_eq!(tally.resolve(), VoteOutcome::Tie);
    }

    #[test]
    fn skip_counts_but_never_wins() {
        let tally = Tally::from_choices([Choice::Skip, Choice::Skip, player(3)]);
        assert_eq!(tally.resolve(), VoteOutcome::Skipped);
        assert_eq!(tally.resolve().winner(), None);

        let tally = Tally::from_choices([Choice::Skip, player(3)]);
        assert_eq!(tally.resolve(), VoteOutcome::Tie);
    }

    #[test]
    fn empty_tally_has_no_winner() {
        assert_eq!(Tally::default().resolve(), VoteOutcome::NoVotes);
    }

    #[test]
    fn ballot_input_wire_format() {
        let select: BallotInput =
            serde_json::from_str(r#"{"type":"select","choice":{"player":7}}"#).unwrap();
        assert_eq!(select, BallotInput::Select { choice: player(7) });
        let skip: BallotInput =
            serde_json::from_str(r#"{"type":"select","choice":"skip"}"#).unwrap();
        assert_eq!(skip, BallotInput::Select { choice: Choice::Skip });
        let confirm: BallotInput = serde_json::from_str(r#"{"type":"confirm"}"#).unwrap();
        assert_eq!(confirm, BallotInput::Confirm);
    }
}
