use log::debug;
use std::time::Duration;

use super::voting::{VoteSettings, VotingSession};
use crate::models::{
    game::Game,
    notice::{Notice, NoticeBody},
    player::{Player, PlayerId},
    role::{RoleKind, Team},
    vote::Choice,
};
use crate::transport::{notify, Transport};

pub const SLEEP_MESSAGE: &str = "You sleep peacefully through the night...";

/// What a night action asks the engine to apply once the night is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NightEffect {
    Nothing,
    Protect(PlayerId),
}

/// Result of one player's night action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightOutcome {
    pub actor: PlayerId,
    // the actor's own pick, None when the role picks nothing
    pub ballot: Option<Choice>,
    pub effect: NightEffect,
}

impl NightOutcome {
    fn idle(actor: PlayerId) -> Self {
        Self {
            actor,
            ballot: None,
            effect: NightEffect::Nothing,
        }
    }
}

/// Role reveal sent when roles are handed out. Wolves also learn the whole
/// pack when they are not alone.
pub fn assign_action(player: &Player, game: &Game) -> Option<Notice> {
    let role = player.role?;
    let teammates = if role.team() == Team::Wolves {
        let pack: Vec<String> = game
            .players
            .values()
            .filter(|p| p.is_wolf())
            .map(|p| p.name.clone())
            .collect();
        if pack.len() > 1 {
            pack
        } else {
            Vec::new()
        }
    } else {
        Vec::new()
    };

    Some(Notice::new(NoticeBody::RoleReveal {
        role,
        team: role.team(),
        teammates,
    }))
}

/// Runs one player's private night action. Wolves act through the shared
/// wolf vote instead.
pub async fn night_action(
    actor: &Player,
    game: &Game,
    transport: &dyn Transport,
    timeout: Option<Duration>,
) -> NightOutcome {
    let Some(role) = actor.role else {
        return NightOutcome::idle(actor.id);
    };

    match role {
        RoleKind::Villager => {
            notify(transport, actor.id, Notice::text(SLEEP_MESSAGE)).await;
            NightOutcome::idle(actor.id)
        }
        RoleKind::Seer => {
            let ballot =
                private_pick(actor, game, transport, "Choose a player to see", timeout).await;
            if let Some(Choice::Player(target)) = ballot {
                let seen = match game.player(target).ok().and_then(|p| p.role) {
                    Some(role) => format!("{} is a {}", game.name_of(target), role),
                    None => format!("{} has no role", game.name_of(target)),
                };
                notify(transport, actor.id, Notice::text(seen)).await;
            }
            NightOutcome {
                ballot,
                ..NightOutcome::idle(actor.id)
            }
        }
        RoleKind::Medic => {
            let ballot =
                private_pick(actor, game, transport, "Choose a player to protect", timeout).await;
            let effect = match ballot {
                Some(Choice::Player(target)) => {
                    let message =
                        format!("You protected {} from the wolves", game.name_of(target));
                    notify(transport, actor.id, Notice::text(message)).await;
                    NightEffect::Protect(target)
                }
                _ => NightEffect::Nothing,
            };
            NightOutcome {
                actor: actor.id,
                ballot,
                effect,
            }
        }
        RoleKind::Werewolf => NightOutcome::idle(actor.id),
    }
}

/// Single voter, no live view, no skip, any other living player. Returns the
/// confirmed ballot; an actor that never answered comes back as Skip.
async fn private_pick(
    actor: &Player,
    game: &Game,
    transport: &dyn Transport,
    title: &str,
    timeout: Option<Duration>,
) -> Option<Choice> {
    let targets = game.living().filter(|p| p.id != actor.id);
    let settings = VoteSettings::new().timeout(timeout);
    let result = VotingSession::new(title, [actor], targets, settings)
        .run(transport)
        .await;
    debug!("{} night pick by {}: {:?}", title, actor.id, result.outcome);
    result.ballots.get(&actor.id).copied().flatten()
}
