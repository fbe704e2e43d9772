use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::models::{
    config::GameConfig,
    player::{Player, PlayerId},
    role::{RoleKind, Team},
};

/// Turns a community config into exactly `player_count` roles with at least
/// one wolf whenever there is anyone to play.
pub fn materialize_roles<R: Rng + ?Sized>(
    config: &GameConfig,
    player_count: usize,
    rng: &mut R,
) -> Result<Vec<RoleKind>, ConfigError> {
    config.validate()?;
    if player_count == 0 {
        return Ok(Vec::new());
    }

    let drawn = draw_roles(config, player_count, rng)?;
    debug!("Drew {} roles for {} players: {:?}", drawn.len(), player_count, drawn);
    let trimmed = trim_roles(drawn, player_count, rng);
    Ok(pad_roles(trimmed, player_count))
}

/// One Bernoulli trial per role entry; a hit adds `count` copies, never more
/// than there are players.
pub fn draw_roles<R: Rng + ?Sized>(
    config: &GameConfig,
    player_count: usize,
    rng: &mut R,
) -> Result<Vec<RoleKind>, ConfigError> {
    let mut roles = Vec::new();
    for (name, settings) in &config.roles {
        let kind =
            RoleKind::from_name(name).ok_or_else(|| ConfigError::UnknownRole(name.clone()))?;
        if rng.gen_range(0..100) < settings.chance {
            let copies = (settings.count as usize).min(player_count);
            roles.extend(std::iter::repeat(kind).take(copies));
        }
    }
    Ok(roles)
}

pub fn trim_roles<R: Rng + ?Sized>(
    mut roles: Vec<RoleKind>,
    player_count: usize,
    rng: &mut R,
) -> Vec<RoleKind> {
    if player_count == 0 {
        return Vec::new();
    }
    if !roles.iter().any(|role| role.team() == Team::Wolves) {
        roles.push(RoleKind::Werewolf);
    }
    if roles.len() <= player_count {
        return roles;
    }

    let wolves: Vec<usize> = roles
        .iter()
        .enumerate()
        .filter(|(_, role)| role.team() == Team::Wolves)
        .map(|(index, _)| index)
        .collect();
    let mut kept = Vec::with_capacity(player_count);
    if let Some(&index) = wolves.choose(rng) {
        kept.push(roles.swap_remove(index));
    }
    kept.extend(roles.choose_multiple(rng, player_count - kept.len()).copied());
    kept
}

pub fn pad_roles(mut roles: Vec<RoleKind>, player_count: usize) -> Vec<RoleKind> {
    if roles.len() < player_count {
        roles.resize(player_count, RoleKind::Villager);
    }
    roles
}

/// Shuffles players and roles independently and pairs them up.
pub fn assign_roles<R: Rng + ?Sized>(
    players: &mut BTreeMap<PlayerId, Player>,
    mut roles: Vec<RoleKind>,
    rng: &mut R,
) {
    let mut ids: Vec<PlayerId> = players.keys().copied().collect();
    ids.shuffle(rng);
    roles.shuffle(rng);

    for (id, role) in ids.into_iter().zip(roles) {
        if let Some(player) = players.get_mut(&id) {
            player.role = Some(role);
        }
    }
}
