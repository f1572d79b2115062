use serde::Deserialize;
use serde_json::Value;

use crate::error::{ScoutError, ScoutResult};
use crate::models::{Player, PlayerStats, Position, RejectedRecord, Team};
use crate::utils::{de_opt_f64, de_opt_u32, de_u32};

// ── Raw record schema ───────────────────────────────────────────────────────
//
// Each field's default lives here and nowhere else. Missing numerics become
// 0, a missing fitness flag becomes 100.0 and an explicit null fitness means
// the player carries no flag at all.

fn default_fitness() -> Option<f64> {
    Some(100.0)
}

#[derive(Debug, Deserialize)]
struct RawPlayer {
    #[serde(deserialize_with = "de_u32")]
    id: u32,
    #[serde(default)]
    web_name: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    second_name: Option<String>,
    #[serde(default)]
    photo: Option<String>,
    #[serde(deserialize_with = "de_u32")]
    element_type: u32,
    #[serde(deserialize_with = "de_u32")]
    team: u32,
    #[serde(default, deserialize_with = "de_u32")]
    now_cost: u32,
    #[serde(default = "default_fitness", deserialize_with = "de_opt_f64")]
    chance_of_playing_next_round: Option<f64>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    news: Option<String>,
    #[serde(flatten)]
    stats: PlayerStats,
}

#[derive(Debug, Deserialize)]
struct RawTeam {
    #[serde(deserialize_with = "de_u32")]
    id: u32,
    #[serde(default, deserialize_with = "de_u32")]
    code: u32,
    #[serde(default)]
    name: String,
    #[serde(default)]
    short_name: String,
    #[serde(default, deserialize_with = "de_opt_f64")]
    strength: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    strength_overall_home: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    strength_overall_away: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    strength_attack_home: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    strength_attack_away: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    strength_defence_home: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    strength_defence_away: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(deserialize_with = "de_u32")]
    id: u32,
    #[serde(default)]
    is_next: bool,
}

fn record_id(raw: &Value) -> Option<u32> {
    raw.get("id").and_then(Value::as_u64).and_then(|id| u32::try_from(id).ok())
}

// ── Entity constructors ─────────────────────────────────────────────────────

pub fn normalize_player(raw: &Value) -> ScoutResult<Player> {
    let raw_player = RawPlayer::deserialize(raw)
        .map_err(|e| ScoutError::input(format!("malformed player record: {}", e)))?;

    let position = Position::from_code(raw_player.element_type).ok_or_else(|| {
        ScoutError::input(format!(
            "player {} has unknown position code {}",
            raw_player.id, raw_player.element_type
        ))
    })?;

    let first_name = raw_player.first_name.unwrap_or_default();
    let second_name = raw_player.second_name.unwrap_or_default();
    let name = raw_player
        .web_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("{} {}", first_name, second_name).trim().to_string());

    Ok(Player {
        id: raw_player.id,
        name,
        first_name,
        second_name,
        photo: raw_player.photo,
        position,
        team_id: raw_player.team,
        price: raw_player.now_cost,
        fitness: raw_player.chance_of_playing_next_round,
        status: raw_player.status.unwrap_or_default(),
        news: raw_player.news.unwrap_or_default(),
        stats: raw_player.stats,
    })
}

pub fn normalize_team(raw: &Value) -> ScoutResult<Team> {
    let raw_team = RawTeam::deserialize(raw)
        .map_err(|e| ScoutError::input(format!("malformed team record: {}", e)))?;

    Ok(Team {
        id: raw_team.id,
        code: raw_team.code,
        name: raw_team.name,
        short_name: raw_team.short_name,
        strength: raw_team.strength,
        strength_overall_home: raw_team.strength_overall_home,
        strength_overall_away: raw_team.strength_overall_away,
        strength_attack_home: raw_team.strength_attack_home,
        strength_attack_away: raw_team.strength_attack_away,
        strength_defence_home: raw_team.strength_defence_home,
        strength_defence_away: raw_team.strength_defence_away,
    })
}

/// Normalise a batch; rejected records are returned alongside, never dropped.
pub fn normalize_players(raw: &[Value]) -> (Vec<Player>, Vec<RejectedRecord>) {
    let mut players = Vec::with_capacity(raw.len());
    let mut rejected = Vec::new();

    for record in raw {
        match normalize_player(record) {
            Ok(player) => players.push(player),
            Err(e) => {
                tracing::warn!("Rejected player record {:?}: {}", record_id(record), e);
                rejected.push(RejectedRecord {
                    id: record_id(record),
                    reason: e.to_string(),
                });
            }
        }
    }

    (players, rejected)
}

pub fn normalize_teams(raw: &[Value]) -> (Vec<Team>, Vec<RejectedRecord>) {
    let mut teams = Vec::with_capacity(raw.len());
    let mut rejected = Vec::new();

    for record in raw {
        match normalize_team(record) {
            Ok(team) => teams.push(team),
            Err(e) => {
                tracing::warn!("Rejected team record {:?}: {}", record_id(record), e);
                rejected.push(RejectedRecord {
                    id: record_id(record),
                    reason: e.to_string(),
                });
            }
        }
    }

    (teams, rejected)
}

/// The gameweek flagged `is_next` in the bootstrap `events` list
pub fn next_event(raw_events: &[Value]) -> Option<u32> {
    raw_events
        .iter()
        .filter_map(|e| RawEvent::deserialize(e).ok())
        .find(|e| e.is_next)
        .map(|e| e.id)
}
