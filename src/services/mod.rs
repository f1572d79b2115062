pub mod data_fetcher;
pub mod difficulty;
pub mod lineup;
pub mod normalizer;
pub mod scorer;
pub mod selector;
pub mod strategy;

pub use lineup::LineupSplitter;
pub use scorer::{rank_players, PerformanceScorer, RankingReport};
pub use selector::{SelectionOutcome, SquadSelector};
pub use strategy::{AvailabilityDecision, AvailabilityStrategy, DiscountAvailability, ExcludeDoubtful, IgnoreAvailability};

use serde::Serialize;
use std::collections::HashSet;

use crate::config::{LineupConfig, SelectionConfig};
use crate::error::ScoutResult;
use crate::models::{Lineup, ScoredPlayer};

/// A selected squad and its starting split
#[derive(Debug, Clone, Serialize)]
pub struct SquadPlan {
    pub selection: SelectionOutcome,
    pub lineup: Lineup,
}

/// Select a squad from a ranked table and split it into starters and bench.
pub fn plan_squad(
    table: &[ScoredPlayer],
    pinned: &HashSet<u32>,
    selection: &SelectionConfig,
    lineup: &LineupConfig,
    strategy: &mut dyn AvailabilityStrategy,
) -> ScoutResult<SquadPlan> {
    let outcome = SquadSelector::new(selection.clone()).select(table, pinned, strategy)?;
    let lineup = LineupSplitter::new(lineup.clone()).split(&outcome.squad)?;
    Ok(SquadPlan {
        selection: outcome,
        lineup,
    })
}
