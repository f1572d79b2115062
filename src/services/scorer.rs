
use serde::Serialize;

use crate::config::ScoringConfig;
use crate::error::ScoutResult;
use crate::models::{
    Dataset, FixtureRecord, GameweekRecord, Player, PlayerSummary, Position, RejectedRecord,
    ScoredPlayer, SeasonHistoryRecord, TeamIndex,
};
use crate::services::difficulty::player_fixture_difficulty;
use crate::utils::{mean, proximity_weight, recency_weight, round2};

/// Availability fraction from the fitness flag. No flag means fully fit.
pub fn availability(fitness: Option<f64>) -> f64 {
    match fitness {
        Some(f) if !f.is_nan() => (f / 100.0).clamp(0.0, 1.0),
        _ => 1.0,
    }
}

/// Performance per unit of price on a log scale; free players score nothing.
pub fn price_adjusted(performance: f64, price: u32) -> f64 {
    if price == 0 {
        return 0.0;
    }
    performance / (price as f64 + 1.0).ln()
}

/// Expected-goal family, minus expected conceded for non-forwards, plus ICT and points.
fn stat_line_score(
    position: Position,
    expected_goals: f64,
    expected_assists: f64,
    expected_goal_involvements: f64,
    expected_goals_conceded: f64,
    ict_index: f64,
    total_points: f64,
) -> f64 {
    let mut expected = expected_goals + expected_assists + expected_goal_involvements;
    if position != Position::Fwd {
        expected -= expected_goals_conceded;
    }
    round2(ict_index + total_points + expected).max(0.0)
}

pub fn gameweek_performance(position: Position, gw: &GameweekRecord) -> f64 {
    stat_line_score(
        position,
        gw.expected_goals,
        gw.expected_assists,
        gw.expected_goal_involvements,
        gw.expected_goals_conceded,
        gw.ict_index,
        gw.total_points,
    )
}

pub fn season_performance(position: Position, season: &SeasonHistoryRecord) -> f64 {
    stat_line_score(
        position,
        season.expected_goals,
        season.expected_assists,
        season.expected_goal_involvements,
        season.expected_goals_conceded,
        season.ict_index,
        season.total_points,
    )
}

/// Gameweeks the player actually featured in, ordered by round (stable for doubles).
pub fn played_gameweeks(history: &[GameweekRecord]) -> Vec<&GameweekRecord> {
    let mut played: Vec<&GameweekRecord> = history.iter().filter(|gw| gw.minutes > 0.0).collect();
    played.sort_by_key(|gw| gw.round);
    played
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpcomingDifficulty {
    pub total: f64,
    /// Ratio for the single nearest scheduled fixture
    pub nearest: Option<f64>,
    /// Unscheduled or already played fixtures
    pub skipped: usize,
    /// Fixtures past the configured horizon
    pub beyond_horizon: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RankingReport {
    /// Sorted by final score, highest first
    pub table: Vec<ScoredPlayer>,
    /// Players left out because their availability is zero
    pub excluded: Vec<u32>,
    pub failures: Vec<RejectedRecord>,
    pub skipped_fixtures: usize,
    pub beyond_horizon: usize,
}

pub struct PerformanceScorer {
    config: ScoringConfig,
    season: i32,
}

impl PerformanceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        let season = config.season_start_year();
        Self { config, season }
    }

    /// Recency-weighted sum over played gameweeks, plus the raw per-gameweek scores.
    pub fn aggregate_performance(&self, position: Position, history: &[GameweekRecord]) -> (f64, Vec<f64>) {
        let played = played_gameweeks(history);
        let last_round = played.iter().map(|gw| gw.round).max().unwrap_or(0);

        let mut total = 0.0;
        let mut scores = Vec::with_capacity(played.len());
        for gw in played {
            let score = gameweek_performance(position, gw);
            total += score * recency_weight(gw.round, last_round);
            scores.push(score);
        }

        (total, scores)
    }

    /// Multiplier blended from past seasons; 1.0 when history is off or absent.
    pub fn history_multiplier(&self, position: Position, past: &[SeasonHistoryRecord]) -> f64 {
        if !self.config.include_history {
            return 1.0;
        }

        let seasons: Vec<(i32, &SeasonHistoryRecord)> = past
            .iter()
            .filter_map(|s| s.start_year().map(|year| (year, s)))
            .collect();
        if seasons.is_empty() {
            return 1.0;
        }

        let total_seasons = seasons.len() as f64;
        let max_minutes = seasons.iter().map(|(_, s)| s.minutes).fold(0.0, f64::max);

        let accumulated: f64 = seasons
            .iter()
            .map(|(year, season)| {
                let age = (self.season - year).max(0) as f64;
                let recency = 1.0 + age / total_seasons;
                let minutes = if max_minutes > 0.0 {
                    1.0 + season.minutes / max_minutes
                } else {
                    1.0
                };
                self.config.history_decay * season_performance(position, season) * recency * minutes
            })
            .sum();

        1.0 + accumulated / (self.config.season_gameweeks * total_seasons)
    }

    /// Difficulty of past matches, weighted like performance.
    pub fn previous_difficulty(
        &self,
        player: &Player,
        history: &[GameweekRecord],
        teams: &TeamIndex,
    ) -> ScoutResult<f64> {
        let played = played_gameweeks(history);
        let last_round = played.iter().map(|gw| gw.round).max().unwrap_or(0);

        let mut total = 0.0;
        for gw in played {
            total += player_fixture_difficulty(player, gw, teams)? * recency_weight(gw.round, last_round);
        }
        Ok(total)
    }

    /// Difficulty of scheduled fixtures; nearer gameweeks weigh more.
    pub fn upcoming_difficulty(
        &self,
        player: &Player,
        fixtures: &[FixtureRecord],
        teams: &TeamIndex,
        next_event: Option<u32>,
    ) -> ScoutResult<UpcomingDifficulty> {
        let mut result = UpcomingDifficulty::default();
        let next_event = next_event.or_else(|| fixtures.iter().filter(|f| !f.finished).filter_map(|f| f.event).min());
        let mut nearest_event: Option<u32> = None;

        for fixture in fixtures {
            let (Some(event), Some(next)) = (fixture.event, next_event) else {
                tracing::debug!("Player {}: skipping unscheduled fixture {}", player.id, fixture.id);
                result.skipped += 1;
                continue;
            };

            if fixture.finished || event < next {
                tracing::debug!("Player {}: skipping played fixture {} (GW{})", player.id, fixture.id, event);
                result.skipped += 1;
                continue;
            }

            if let Some(horizon) = self.config.fixture_horizon {
                if event >= next.saturating_add(horizon) {
                    result.beyond_horizon += 1;
                    continue;
                }
            }

            let ratio = player_fixture_difficulty(player, fixture, teams)?;
            result.total += ratio * proximity_weight(event, next);

            if nearest_event.map_or(true, |e| event < e) {
                nearest_event = Some(event);
                result.nearest = Some(ratio);
            }
        }

        Ok(result)
    }

    /// Score one player. `Ok(None)` when the player is unavailable.
    pub fn score_player(
        &self,
        player: &Player,
        summary: &PlayerSummary,
        teams: &TeamIndex,
        next_event: Option<u32>,
    ) -> ScoutResult<Option<ScoredPlayer>> {
        let availability = availability(player.fitness);
        if availability == 0.0 {
            tracing::debug!("Excluding {} ({}): unavailable", player.name, player.id);
            return Ok(None);
        }

        let (aggregate, gameweek_scores) = self.aggregate_performance(player.position, &summary.history);
        let history_multiplier = self.history_multiplier(player.position, &summary.history_past);
        let performance = aggregate * history_multiplier;

        let previous_difficulty = self.previous_difficulty(player, &summary.history, teams)?;
        let upcoming = self.upcoming_difficulty(player, &summary.fixtures, teams, next_event)?;

        let performance_score = price_adjusted(performance, player.price);
        let combined_score =
            performance_score / (1.0 + (previous_difficulty - upcoming.total).abs());
        let final_score = combined_score * availability;
        let gameweek_score = mean(&gameweek_scores) / (1.0 + upcoming.nearest.unwrap_or(0.0));

        Ok(Some(ScoredPlayer {
            id: player.id,
            name: player.name.clone(),
            position: player.position,
            team_id: player.team_id,
            team_name: teams.short_name(player.team_id),
            price: player.price,
            availability,
            gameweek_scores,
            performance,
            history_multiplier,
            previous_difficulty,
            upcoming_difficulty: upcoming.total,
            performance_score,
            combined_score,
            final_score,
            gameweek_score,
            skipped_fixtures: upcoming.skipped,
            beyond_horizon: upcoming.beyond_horizon,
        }))
    }
}

/// Descending by the given key; equal keys keep input order and NaN keys sort last.
pub fn sort_descending_by<T, F: Fn(&T) -> f64>(rows: &mut [T], key: F) {
    let key = |row: &T| {
        let value = key(row);
        if value.is_nan() {
            f64::NEG_INFINITY
        } else {
            value
        }
    };
    rows.sort_by(|a, b| key(b).total_cmp(&key(a)));
}

/// Score the whole pool. Per-player input errors are recorded and skipped.
pub fn rank_players(dataset: &Dataset, config: &ScoringConfig) -> RankingReport {
    let scorer = PerformanceScorer::new(config.clone());
    let empty = PlayerSummary::default();
    let mut report = RankingReport::default();

    for player in &dataset.players {
        let summary = dataset.summaries.get(&player.id).unwrap_or(&empty);
        match scorer.score_player(player, summary, &dataset.teams, dataset.next_event) {
            Ok(Some(scored)) => {
                report.skipped_fixtures += scored.skipped_fixtures;
                report.beyond_horizon += scored.beyond_horizon;
                report.table.push(scored);
            }
            Ok(None) => report.excluded.push(player.id),
            Err(e) => {
                tracing::warn!("Skipping {} ({}): {}", player.name, player.id, e);
                report.failures.push(RejectedRecord {
                    id: Some(player.id),
                    reason: e.to_string(),
                });
            }
        }
    }

    sort_descending_by(&mut report.table, |p| p.final_score);

    tracing::info!(
        "Ranked {} players ({} excluded, {} failed, {} unscheduled fixtures skipped)",
        report.table.len(),
        report.excluded.len(),
        report.failures.len(),
        report.skipped_fixtures
    );

    report
}
