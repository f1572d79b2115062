use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::utils::{de_f64, de_opt_f64, de_opt_u32, de_u32};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "GKP")]
    Gkp,
    #[serde(rename = "DEF")]
    Def,
    #[serde(rename = "MID")]
    Mid,
    #[serde(rename = "FWD")]
    Fwd,
}

impl Position {
    pub const ALL: [Position; 4] = [Position::Gkp, Position::Def, Position::Mid, Position::Fwd];

    /// Map the API's `element_type` code. Codes outside 1..=4 are not guessed.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Position::Gkp),
            2 => Some(Position::Def),
            3 => Some(Position::Mid),
            4 => Some(Position::Fwd),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Gkp => "GKP",
            Position::Def => "DEF",
            Position::Mid => "MID",
            Position::Fwd => "FWD",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GKP" | "GK" | "GOALKEEPER" => Ok(Position::Gkp),
            "DEF" | "DEFENDER" => Ok(Position::Def),
            "MID" | "MIDFIELDER" => Ok(Position::Mid),
            "FWD" | "FORWARD" => Ok(Position::Fwd),
            other => Err(format!("unknown position '{}'", other)),
        }
    }
}

/// Season-to-date rate stats. Every field has an explicit default applied at
/// deserialisation; the API sends many of them as numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    #[serde(default, deserialize_with = "de_f64")]
    pub form: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub points_per_game: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub selected_by_percent: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub total_points: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub bonus: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub minutes: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub starts: f64,

    #[serde(default, deserialize_with = "de_f64")]
    pub goals_scored: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub assists: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub clean_sheets: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub goals_conceded: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub own_goals: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub penalties_saved: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub penalties_missed: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub saves: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub yellow_cards: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub red_cards: f64,

    #[serde(default, deserialize_with = "de_f64")]
    pub influence: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub creativity: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub threat: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub ict_index: f64,

    #[serde(default, deserialize_with = "de_f64")]
    pub expected_goals: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub expected_assists: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub expected_goal_involvements: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub expected_goals_conceded: f64,

    #[serde(default, deserialize_with = "de_f64")]
    pub expected_goals_per_90: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub expected_assists_per_90: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub saves_per_90: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub starts_per_90: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub clean_sheets_per_90: f64,

    #[serde(default, deserialize_with = "de_u32")]
    pub influence_rank: u32,
    #[serde(default, deserialize_with = "de_u32")]
    pub creativity_rank: u32,
    #[serde(default, deserialize_with = "de_u32")]
    pub threat_rank: u32,
    #[serde(default, deserialize_with = "de_u32")]
    pub ict_index_rank: u32,

    #[serde(default, deserialize_with = "de_opt_u32")]
    pub penalties_order: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_u32")]
    pub corners_and_indirect_freekicks_order: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_u32")]
    pub direct_freekicks_order: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub first_name: String,
    pub second_name: String,
    pub photo: Option<String>,
    pub position: Position,
    pub team_id: u32,
    /// Price in tenths (55 = 5.5)
    pub price: u32,
    /// Chance of playing next round, 0-100; `None` means no flag (fully fit)
    pub fitness: Option<f64>,
    pub status: String,
    pub news: String,
    pub stats: PlayerStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Team {
    pub id: u32,
    pub code: u32,
    pub name: String,
    pub short_name: String,
    pub strength: Option<f64>,
    pub strength_overall_home: Option<f64>,
    pub strength_overall_away: Option<f64>,
    pub strength_attack_home: Option<f64>,
    pub strength_attack_away: Option<f64>,
    pub strength_defence_home: Option<f64>,
    pub strength_defence_away: Option<f64>,
}

/// Which directional strength rating to read from a team
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthKind {
    AttackHome,
    AttackAway,
    DefenceHome,
    DefenceAway,
}

impl Team {
    pub fn strength(&self, kind: StrengthKind) -> Option<f64> {
        match kind {
            StrengthKind::AttackHome => self.strength_attack_home,
            StrengthKind::AttackAway => self.strength_attack_away,
            StrengthKind::DefenceHome => self.strength_defence_home,
            StrengthKind::DefenceAway => self.strength_defence_away,
        }
    }
}

/// Teams looked up by id
#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamIndex {
    teams: HashMap<u32, Team>,
}

impl TeamIndex {
    pub fn new(teams: Vec<Team>) -> Self {
        Self {
            teams: teams.into_iter().map(|t| (t.id, t)).collect(),
        }
    }

    pub fn get(&self, id: u32) -> Option<&Team> {
        self.teams.get(&id)
    }

    pub fn short_name(&self, id: u32) -> String {
        self.get(id)
            .map(|t| t.short_name.clone())
            .unwrap_or_else(|| "???".to_string())
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

/// One played fixture for a player (element-summary `history`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameweekRecord {
    #[serde(default, deserialize_with = "de_u32")]
    pub round: u32,
    #[serde(default, deserialize_with = "de_u32")]
    pub fixture: u32,
    #[serde(default, deserialize_with = "de_opt_u32")]
    pub opponent_team: Option<u32>,
    #[serde(default)]
    pub was_home: Option<bool>,
    #[serde(default, deserialize_with = "de_opt_u32")]
    pub team_h: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_u32")]
    pub team_a: Option<u32>,
    #[serde(default, deserialize_with = "de_f64")]
    pub minutes: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub total_points: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub goals_scored: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub assists: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub clean_sheets: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub goals_conceded: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub bonus: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub ict_index: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub expected_goals: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub expected_assists: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub expected_goal_involvements: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub expected_goals_conceded: f64,
}

/// A scheduled fixture for a player (element-summary `fixtures`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureRecord {
    #[serde(default, deserialize_with = "de_u32")]
    pub id: u32,
    /// Gameweek number; `None` while the fixture is unscheduled
    #[serde(default, deserialize_with = "de_opt_u32")]
    pub event: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_u32")]
    pub opponent_team: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_u32")]
    pub team_h: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_u32")]
    pub team_a: Option<u32>,
    #[serde(default)]
    pub is_home: Option<bool>,
    #[serde(default, deserialize_with = "de_opt_u32")]
    pub difficulty: Option<u32>,
    #[serde(default)]
    pub kickoff_time: Option<String>,
    #[serde(default)]
    pub finished: bool,
}

/// Aggregated past-season totals (element-summary `history_past`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonHistoryRecord {
    /// "YYYY/YY"
    #[serde(default)]
    pub season_name: String,
    #[serde(default, deserialize_with = "de_f64")]
    pub minutes: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub total_points: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub goals_scored: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub assists: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub clean_sheets: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub ict_index: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub expected_goals: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub expected_assists: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub expected_goal_involvements: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub expected_goals_conceded: f64,
}

impl SeasonHistoryRecord {
    /// Start year parsed from the season label, e.g. 2022 for "2022/23"
    pub fn start_year(&self) -> Option<i32> {
        self.season_name.split('/').next()?.trim().parse().ok()
    }
}

/// Everything the data provider returns for one player
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerSummary {
    #[serde(default)]
    pub history: Vec<GameweekRecord>,
    #[serde(default)]
    pub fixtures: Vec<FixtureRecord>,
    #[serde(default)]
    pub history_past: Vec<SeasonHistoryRecord>,
}

/// A raw record the normaliser refused, kept so nothing is dropped silently
#[derive(Debug, Clone, Serialize)]
pub struct RejectedRecord {
    pub id: Option<u32>,
    pub reason: String,
}

/// The full in-memory input for one run
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub players: Vec<Player>,
    pub teams: TeamIndex,
    pub summaries: HashMap<u32, PlayerSummary>,
    pub next_event: Option<u32>,
    pub rejected: Vec<RejectedRecord>,
}

/// Derived ranking row, one per scored player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPlayer {
    pub id: u32,
    pub name: String,
    pub position: Position,
    pub team_id: u32,
    pub team_name: String,
    /// Price in tenths
    pub price: u32,
    pub availability: f64,
    pub gameweek_scores: Vec<f64>,
    /// Recency-weighted performance including the history multiplier
    pub performance: f64,
    pub history_multiplier: f64,
    pub previous_difficulty: f64,
    pub upcoming_difficulty: f64,
    pub performance_score: f64,
    pub combined_score: f64,
    /// Combined score scaled by availability; the ranking key
    pub final_score: f64,
    /// Short-horizon score for lineup decisions
    pub gameweek_score: f64,
    pub skipped_fixtures: usize,
    pub beyond_horizon: usize,
}

/// A completed squad
#[derive(Debug, Clone, Default, Serialize)]
pub struct Squad {
    pub players: Vec<ScoredPlayer>,
}

impl Squad {
    /// Total price in tenths
    pub fn total_cost(&self) -> u32 {
        self.players.iter().map(|p| p.price).sum()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn position_count(&self, position: Position) -> usize {
        self.players.iter().filter(|p| p.position == position).count()
    }

    pub fn club_count(&self, team_id: u32) -> usize {
        self.players.iter().filter(|p| p.team_id == team_id).count()
    }

    pub fn contains(&self, player_id: u32) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Lineup {
    pub starters: Vec<ScoredPlayer>,
    pub bench: Vec<ScoredPlayer>,
}

// API Response types
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}
