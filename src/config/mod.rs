use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::env;

use crate::models::Position;

/// Top-level configuration, built from defaults then overridden by the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the fantasy API (no trailing slash)
    pub api_base: String,

    /// Directory holding cached API responses
    pub cache_dir: String,

    /// Cached files older than this are refetched
    pub cache_max_age_hours: i64,

    /// Pause between per-player summary requests
    pub request_delay_ms: u64,

    pub scoring: ScoringConfig,
    pub selection: SelectionConfig,
    pub lineup: LineupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Blend past-season totals into the performance aggregate
    pub include_history: bool,

    /// Scale applied to every past season's contribution
    pub history_decay: f64,

    /// Gameweeks per season used to normalise past-season totals
    pub season_gameweeks: f64,

    /// Start year of the current season (e.g. 2024 for "2024/25")
    pub current_season: Option<i32>,

    /// Only count upcoming fixtures this many gameweeks past the next one
    pub fixture_horizon: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionLimits {
    pub gkp: usize,
    pub def: usize,
    pub mid: usize,
    pub fwd: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub squad_size: usize,
    pub limits: PositionLimits,

    /// Budget ceiling in tenths (1000 = 100.0)
    pub budget: u32,

    /// Maximum squad members from one club
    pub club_cap: usize,

    /// Multiplier applied to pinned players' priority
    pub pin_boost: f64,

    /// Spend (tenths) at or above which a repair evicts three players instead of one
    pub near_budget_threshold: u32,

    /// Price exponent in the eviction score
    pub eviction_exponent: f64,

    /// Hard bound on selection passes
    pub max_iterations: usize,

    /// Only admit a candidate if the open slots can still be filled at the cheapest remaining prices
    pub reserve_budget: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineupConfig {
    pub starters: usize,

    /// Minimum starters per position; goalkeepers start exactly this many
    pub minimums: PositionLimits,
}

impl PositionLimits {
    pub fn get(&self, position: Position) -> usize {
        match position {
            Position::Gkp => self.gkp,
            Position::Def => self.def,
            Position::Mid => self.mid,
            Position::Fwd => self.fwd,
        }
    }

    pub fn total(&self) -> usize {
        self.gkp + self.def + self.mid + self.fwd
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            include_history: false,
            history_decay: 0.5,
            season_gameweeks: 38.0,
            current_season: None,
            fixture_horizon: None,
        }
    }
}

impl ScoringConfig {
    /// Season start year, falling back to the clock: seasons start in August.
    pub fn season_start_year(&self) -> i32 {
        self.current_season.unwrap_or_else(|| {
            let today = Utc::now().date_naive();
            if today.month() >= 8 {
                today.year()
            } else {
                today.year() - 1
            }
        })
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            squad_size: 15,
            limits: PositionLimits {
                gkp: 2,
                def: 5,
                mid: 5,
                fwd: 3,
            },
            budget: 1000,
            club_cap: 3,
            pin_boost: 12.0,
            near_budget_threshold: 955,
            eviction_exponent: 0.005,
            max_iterations: 10_000,
            reserve_budget: true,
        }
    }
}

impl Default for LineupConfig {
    fn default() -> Self {
        Self {
            starters: 11,
            minimums: PositionLimits {
                gkp: 1,
                def: 3,
                mid: 3,
                fwd: 1,
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: "https://fantasy.premierleague.com/api".to_string(),
            cache_dir: "fpl_data".to_string(),
            cache_max_age_hours: 24,
            request_delay_ms: 0,
            scoring: ScoringConfig::default(),
            selection: SelectionConfig::default(),
            lineup: LineupConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(base) = env::var("FPL_API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }

        if let Ok(dir) = env::var("FPL_CACHE_DIR") {
            config.cache_dir = dir;
        }

        if let Ok(hours) = env::var("FPL_CACHE_MAX_AGE_HOURS") {
            config.cache_max_age_hours = hours.parse().unwrap_or(24);
        }

        if let Ok(budget) = env::var("FPL_BUDGET") {
            config.selection.budget = budget.parse().unwrap_or(1000);
        }

        if let Ok(delay) = env::var("FPL_REQUEST_DELAY_MS") {
            config.request_delay_ms = delay.parse().unwrap_or(0);
        }

        if let Ok(decay) = env::var("FPL_HISTORY_DECAY") {
            config.scoring.history_decay = decay.parse().unwrap_or(0.5);
        }

        if let Ok(season) = env::var("FPL_SEASON") {
            config.scoring.current_season = season.parse().ok();
        }

        Ok(config)
    }
}
