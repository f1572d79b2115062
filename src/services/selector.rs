use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::config::SelectionConfig;
use crate::error::{ScoutError, ScoutResult};
use crate::models::{Position, ScoredPlayer, Squad};
use crate::services::scorer::sort_descending_by;
use crate::services::strategy::{AvailabilityDecision, AvailabilityStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SelectionPhase {
    Building,
    Repairing,
    Reconsidering,
    Complete,
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub player: ScoredPlayer,
    pub priority: f64,
}

/// Result of one pass over the candidate pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Squad reached its target size
    Complete,
    /// Some candidates were admitted but slots remain
    Progress(usize),
    /// A candidate was discounted; selections were cleared
    Restarted,
    /// Nobody could be admitted
    Stuck,
}

/// Everything the selector mutates during one run
#[derive(Debug, Clone)]
pub struct SelectorState {
    /// Remaining pool, highest priority first; input order breaks ties
    pub candidates: Vec<Candidate>,
    pub squad: Vec<Candidate>,
    /// Tenths
    pub spent: u32,
    pub position_counts: HashMap<Position, usize>,
    pub club_counts: HashMap<u32, usize>,
    /// Candidates whose availability has already been decided
    pub resolved: HashSet<u32>,
    pub evicted: Vec<u32>,
    pub excluded: Vec<u32>,
    pub phase: SelectionPhase,
}

impl SelectorState {
    pub fn is_selected(&self, player_id: u32) -> bool {
        self.squad.iter().any(|c| c.player.id == player_id)
    }

    /// Pool members not currently in the squad
    pub fn bench_pool(&self) -> usize {
        self.candidates
            .iter()
            .filter(|c| !self.is_selected(c.player.id))
            .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionOutcome {
    pub squad: Squad,
    pub passes: usize,
    pub repairs: usize,
    pub restarts: usize,
    pub evicted: Vec<u32>,
    pub excluded: Vec<u32>,
}

pub struct SquadSelector {
    config: SelectionConfig,
}

impl SquadSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    /// Build the starting pool. Pinned ids get their priority boosted; duplicate ids keep the first row.
    pub fn initial_state(&self, table: &[ScoredPlayer], pinned: &HashSet<u32>) -> SelectorState {
        let mut seen = HashSet::new();
        let mut candidates: Vec<Candidate> = table
            .iter()
            .filter(|p| seen.insert(p.id))
            .map(|p| {
                let boost = if pinned.contains(&p.id) { self.config.pin_boost } else { 1.0 };
                Candidate {
                    player: p.clone(),
                    priority: p.combined_score * boost,
                }
            })
            .collect();
        sort_descending_by(&mut candidates, |c| c.priority);

        SelectorState {
            candidates,
            squad: Vec::with_capacity(self.config.squad_size),
            spent: 0,
            position_counts: HashMap::new(),
            club_counts: HashMap::new(),
            resolved: HashSet::new(),
            evicted: Vec::new(),
            excluded: Vec::new(),
            phase: SelectionPhase::Building,
        }
    }

    /// Slot open, affordable, not already picked, club below its cap.
    pub fn can_admit(&self, state: &SelectorState, candidate: &Candidate) -> bool {
        let player = &candidate.player;
        let position_filled = state.position_counts.get(&player.position).copied().unwrap_or(0);
        let club_filled = state.club_counts.get(&player.team_id).copied().unwrap_or(0);

        state.squad.len() < self.config.squad_size
            && position_filled < self.config.limits.get(player.position)
            && state.spent.checked_add(player.price).map_or(false, |total| total <= self.config.budget)
            && club_filled < self.config.club_cap
            && !state.is_selected(player.id)
            && (!self.config.reserve_budget || self.leaves_headroom(state, candidate))
    }

    /// Cheapest cost of filling every slot that would remain open after admitting `candidate`.
    /// Positions the pool cannot fill at all are left to the capacity check.
    pub fn cheapest_fill(&self, state: &SelectorState, candidate: &Candidate) -> u32 {
        Position::ALL
            .iter()
            .map(|&position| {
                let filled = state.position_counts.get(&position).copied().unwrap_or(0)
                    + usize::from(position == candidate.player.position);
                let open = self.config.limits.get(position).saturating_sub(filled);
                if open == 0 {
                    return 0;
                }

                let mut prices: Vec<u32> = state
                    .candidates
                    .iter()
                    .filter(|c| c.player.position == position)
                    .filter(|c| c.player.id != candidate.player.id && !state.is_selected(c.player.id))
                    .map(|c| c.player.price)
                    .collect();
                if prices.len() < open {
                    return 0;
                }
                prices.sort_unstable();
                prices.iter().take(open).fold(0u32, |sum, &price| sum.saturating_add(price))
            })
            .fold(0u32, u32::saturating_add)
    }

    fn leaves_headroom(&self, state: &SelectorState, candidate: &Candidate) -> bool {
        state
            .spent
            .checked_add(candidate.player.price)
            .and_then(|total| total.checked_add(self.cheapest_fill(state, candidate)))
            .map_or(false, |total| total <= self.config.budget)
    }

    /// Add the pool entry at `index` to the squad.
    pub fn admit(&self, state: &mut SelectorState, index: usize) {
        let candidate = state.candidates[index].clone();
        state.spent = state.spent.saturating_add(candidate.player.price);
        *state.position_counts.entry(candidate.player.position).or_insert(0) += 1;
        *state.club_counts.entry(candidate.player.team_id).or_insert(0) += 1;
        tracing::debug!(
            "Admitted {} ({} {}) priority {:.3}, spent {}",
            candidate.player.name,
            candidate.player.position,
            candidate.player.team_name,
            candidate.priority,
            state.spent
        );
        state.squad.push(candidate);
    }

    pub fn eviction_score(&self, candidate: &Candidate) -> f64 {
        let price = candidate.player.price.max(1) as f64;
        candidate.priority / price.powf(self.config.eviction_exponent)
    }

    /// Drop the least cost-effective squad members from the squad and the pool.
    /// Three go at once when spend is near the budget, otherwise one.
    pub fn evict_weakest(&self, state: &mut SelectorState) -> ScoutResult<Vec<u32>> {
        if state.squad.is_empty() {
            return Err(ScoutError::input("cannot evict from an empty squad"));
        }

        state.phase = SelectionPhase::Repairing;
        let count = if state.spent >= self.config.near_budget_threshold { 3 } else { 1 };
        let mut evicted = Vec::with_capacity(count);

        for _ in 0..count.min(state.squad.len()) {
            let weakest = state
                .squad
                .iter()
                .enumerate()
                .fold(None::<(usize, f64)>, |best, (i, c)| {
                    let score = self.eviction_score(c);
                    match best {
                        Some((_, best_score)) if best_score <= score => best,
                        _ => Some((i, score)),
                    }
                })
                .map(|(i, _)| i);

            let Some(index) = weakest else { break };
            let removed = state.squad.remove(index);
            state.spent = state.spent.saturating_sub(removed.player.price);
            if let Some(n) = state.position_counts.get_mut(&removed.player.position) {
                *n -= 1;
            }
            if let Some(n) = state.club_counts.get_mut(&removed.player.team_id) {
                *n -= 1;
            }
            state.candidates.retain(|c| c.player.id != removed.player.id);

            tracing::info!(
                "Evicted {} ({}, {}) to free budget; spent now {}",
                removed.player.name,
                removed.player.position,
                removed.player.price,
                state.spent
            );
            state.evicted.push(removed.player.id);
            evicted.push(removed.player.id);
        }

        Ok(evicted)
    }

    /// Clear all selections and re-sort the pool by current priority.
    pub fn restart(&self, state: &mut SelectorState) {
        state.phase = SelectionPhase::Reconsidering;
        state.squad.clear();
        state.spent = 0;
        state.position_counts.clear();
        state.club_counts.clear();
        sort_descending_by(&mut state.candidates, |c| c.priority);
        tracing::info!("Restarting selection with {} candidates", state.candidates.len());
    }

    /// One greedy sweep over the pool in priority order.
    pub fn run_pass(&self, state: &mut SelectorState, strategy: &mut dyn AvailabilityStrategy) -> PassOutcome {
        state.phase = SelectionPhase::Building;
        let mut admitted = 0;
        let mut index = 0;

        while index < state.candidates.len() && state.squad.len() < self.config.squad_size {
            if !self.can_admit(state, &state.candidates[index]) {
                index += 1;
                continue;
            }

            let player_id = state.candidates[index].player.id;
            let availability = state.candidates[index].player.availability;

            if availability < 1.0 && state.resolved.insert(player_id) {
                match strategy.decide(&state.candidates[index].player) {
                    AvailabilityDecision::Discount => {
                        state.candidates[index].priority *= availability;
                        self.restart(state);
                        return PassOutcome::Restarted;
                    }
                    AvailabilityDecision::Exclude => {
                        tracing::info!("Excluding {} (availability {:.2})", state.candidates[index].player.name, availability);
                        state.candidates.remove(index);
                        state.excluded.push(player_id);
                        continue;
                    }
                    AvailabilityDecision::Ignore => {}
                }
            }

            self.admit(state, index);
            admitted += 1;
            index += 1;
        }

        if state.squad.len() == self.config.squad_size {
            state.phase = SelectionPhase::Complete;
            PassOutcome::Complete
        } else if admitted > 0 {
            PassOutcome::Progress(admitted)
        } else {
            PassOutcome::Stuck
        }
    }

    /// Build a full squad from a ranked table.
    pub fn select(
        &self,
        table: &[ScoredPlayer],
        pinned: &HashSet<u32>,
        strategy: &mut dyn AvailabilityStrategy,
    ) -> ScoutResult<SelectionOutcome> {
        let target = self.config.squad_size;
        if self.config.limits.total() != target {
            return Err(ScoutError::input(format!(
                "position limits sum to {} but squad size is {}",
                self.config.limits.total(),
                target
            )));
        }

        let mut state = self.initial_state(table, pinned);
        let (mut passes, mut repairs, mut restarts) = (0usize, 0usize, 0usize);

        loop {
            if passes >= self.config.max_iterations {
                return Err(ScoutError::Capacity {
                    selected: state.squad.len(),
                    target,
                    reason: format!("no complete squad after {} passes", passes),
                });
            }
            passes += 1;

            match self.run_pass(&mut state, strategy) {
                PassOutcome::Complete => break,
                PassOutcome::Progress(_) => continue,
                PassOutcome::Restarted => restarts += 1,
                PassOutcome::Stuck => {
                    if state.squad.is_empty() || state.bench_pool() == 0 {
                        return Err(ScoutError::Capacity {
                            selected: state.squad.len(),
                            target,
                            reason: "candidate pool exhausted under position, budget and club limits"
                                .to_string(),
                        });
                    }
                    self.evict_weakest(&mut state)?;
                    repairs += 1;
                }
            }
        }

        let squad = Squad {
            players: state.squad.into_iter().map(|c| c.player).collect(),
        };

        tracing::info!(
            "Squad complete: {} players, cost {} after {} passes ({} repairs, {} restarts)",
            squad.len(),
            squad.total_cost(),
            passes,
            repairs,
            restarts
        );

        Ok(SelectionOutcome {
            squad,
            passes,
            repairs,
            restarts,
            evicted: state.evicted,
            excluded: state.excluded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PositionLimits;
    use crate::services::strategy::{DiscountAvailability, IgnoreAvailability};
    use proptest::prelude::*;

    fn candidate(id: u32, position: Position, team_id: u32, price: u32, score: f64) -> ScoredPlayer {
        ScoredPlayer {
            id,
            name: format!("P{}", id),
            position,
            team_id,
            team_name: format!("T{}", team_id),
            price,
            availability: 1.0,
            gameweek_scores: vec![],
            performance: score,
            history_multiplier: 1.0,
            previous_difficulty: 0.0,
            upcoming_difficulty: 0.0,
            performance_score: score,
            combined_score: score,
            final_score: score,
            gameweek_score: score,
            skipped_fixtures: 0,
            beyond_horizon: 0,
        }
    }

    fn small_config(budget: u32) -> SelectionConfig {
        SelectionConfig {
            squad_size: 3,
            limits: PositionLimits { gkp: 1, def: 1, mid: 1, fwd: 0 },
            budget,
            near_budget_threshold: 10_000,
            reserve_budget: false,
            ..SelectionConfig::default()
        }
    }

    fn assert_valid(squad: &Squad, config: &SelectionConfig) {
        assert_eq!(squad.len(), config.squad_size);
        assert!(squad.total_cost() <= config.budget);
        for position in Position::ALL {
            assert_eq!(squad.position_count(position), config.limits.get(position));
        }
        for p in &squad.players {
            assert!(squad.club_count(p.team_id) <= config.club_cap);
        }
        let ids: HashSet<u32> = squad.players.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), squad.len());
    }

    /// Exactly fifteen players from fifteen clubs, costing exactly the budget
    fn exact_pool() -> Vec<ScoredPlayer> {
        let layout = [
            (Position::Gkp, 2),
            (Position::Def, 5),
            (Position::Mid, 5),
            (Position::Fwd, 3),
        ];
        let mut pool = Vec::new();
        let mut id = 1;
        for (position, count) in layout {
            for _ in 0..count {
                pool.push(candidate(id, position, id, 0, 100.0 - id as f64));
                id += 1;
            }
        }
        // 14 × 66 + 76 = 1000
        for p in pool.iter_mut() {
            p.price = 66;
        }
        pool[14].price = 76;
        pool
    }

    /// Deterministic pool: stars that bust the budget plus plenty of cheap fodder
    fn mixed_pool() -> Vec<ScoredPlayer> {
        let mut pool = Vec::new();
        let mut id = 1;
        for position in Position::ALL {
            for star in 0..3 {
                pool.push(candidate(id, position, 1 + (id % 20), 130, 50.0 - star as f64));
                id += 1;
            }
            for fodder in 0..10 {
                let price = 40 + (fodder * 3) % 10;
                pool.push(candidate(id, position, 1 + (id % 20), price, 10.0 - fodder as f64 * 0.5));
                id += 1;
            }
        }
        pool
    }

    #[test]
    fn test_exact_pool_completes_in_one_pass() {
        let config = SelectionConfig::default();
        let selector = SquadSelector::new(config.clone());
        let outcome = selector
            .select(&exact_pool(), &HashSet::new(), &mut IgnoreAvailability)
            .unwrap();

        assert_eq!(outcome.passes, 1);
        assert_eq!(outcome.repairs, 0);
        assert_eq!(outcome.squad.total_cost(), 1000);
        assert_valid(&outcome.squad, &config);
    }

    #[test]
    fn test_budget_headroom_keeps_stars_affordable() {
        let config = SelectionConfig::default();
        let selector = SquadSelector::new(config.clone());
        let outcome = selector
            .select(&mixed_pool(), &HashSet::new(), &mut IgnoreAvailability)
            .unwrap();

        assert_eq!(outcome.repairs, 0);
        assert_valid(&outcome.squad, &config);
        // The top star of each position still makes it in
        for star in [1, 14, 27, 40] {
            assert!(outcome.squad.contains(star));
        }
    }

    #[test]
    fn test_plain_greedy_exhausts_pool_under_budget_pressure() {
        let selector = SquadSelector::new(SelectionConfig {
            reserve_budget: false,
            ..SelectionConfig::default()
        });
        let err = selector
            .select(&mixed_pool(), &HashSet::new(), &mut IgnoreAvailability)
            .unwrap_err();
        assert!(matches!(err, ScoutError::Capacity { .. }));
    }

    #[test]
    fn test_cheapest_fill() {
        let config = small_config(1000);
        let pool = vec![
            candidate(1, Position::Gkp, 1, 50, 10.0),
            candidate(2, Position::Def, 2, 45, 9.0),
            candidate(3, Position::Def, 3, 40, 8.0),
            candidate(4, Position::Mid, 4, 70, 7.0),
        ];
        let selector = SquadSelector::new(config);
        let state = selector.initial_state(&pool, &HashSet::new());
        // Admitting the goalkeeper leaves one DEF (40) and one MID (70) to buy
        assert_eq!(selector.cheapest_fill(&state, &state.candidates[0]), 110);
    }

    #[test]
    fn test_repair_evicts_least_cost_effective() {
        let config = small_config(100);
        let pool = vec![
            candidate(1, Position::Mid, 1, 80, 100.0),
            candidate(2, Position::Def, 2, 30, 50.0),
            candidate(3, Position::Gkp, 3, 20, 40.0),
            candidate(4, Position::Def, 4, 15, 10.0),
            candidate(5, Position::Gkp, 5, 5, 5.0),
        ];
        let selector = SquadSelector::new(config.clone());
        let outcome = selector.select(&pool, &HashSet::new(), &mut IgnoreAvailability).unwrap();

        assert_eq!(outcome.repairs, 1);
        assert_eq!(outcome.evicted, vec![3]);
        let ids: Vec<u32> = outcome.squad.players.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 4, 5]);
        assert_valid(&outcome.squad, &config);
    }

    #[test]
    fn test_near_budget_evicts_three() {
        let config = SelectionConfig {
            squad_size: 5,
            limits: PositionLimits { gkp: 1, def: 2, mid: 2, fwd: 0 },
            budget: 100,
            near_budget_threshold: 90,
            reserve_budget: false,
            ..SelectionConfig::default()
        };
        let pool = vec![
            candidate(1, Position::Mid, 1, 30, 40.0),
            candidate(2, Position::Mid, 2, 20, 30.0),
            candidate(3, Position::Def, 3, 20, 20.0),
            candidate(4, Position::Def, 4, 25, 10.0),
        ];
        let selector = SquadSelector::new(config);
        let mut state = selector.initial_state(&pool, &HashSet::new());
        for _ in 0..4 {
            let index = state.squad.len();
            selector.admit(&mut state, index);
        }
        assert_eq!(state.spent, 95);

        let evicted = selector.evict_weakest(&mut state).unwrap();
        assert_eq!(evicted, vec![4, 3, 2]);
        assert_eq!(state.spent, 30);
        assert_eq!(state.squad.len(), 1);
        assert_eq!(state.candidates.len(), 1);
        assert_eq!(state.phase, SelectionPhase::Repairing);
    }

    #[test]
    fn test_evict_from_empty_squad_is_input_error() {
        let selector = SquadSelector::new(SelectionConfig::default());
        let mut state = selector.initial_state(&[], &HashSet::new());
        assert!(selector.evict_weakest(&mut state).unwrap_err().is_input());
    }

    #[test]
    fn test_club_cap_respected() {
        let config = SelectionConfig::default();
        let mut pool = exact_pool();
        // Five top midfielders from the same club
        for i in 0..5 {
            pool.push(candidate(100 + i, Position::Mid, 99, 50, 500.0 - i as f64));
        }
        let selector = SquadSelector::new(config.clone());
        let outcome = selector.select(&pool, &HashSet::new(), &mut IgnoreAvailability).unwrap();

        assert_eq!(outcome.squad.club_count(99), 3);
        assert_valid(&outcome.squad, &config);
    }

    #[test]
    fn test_insufficient_pool_is_capacity_error() {
        let mut pool = exact_pool();
        pool.retain(|p| p.position != Position::Gkp || p.id == 1);
        let selector = SquadSelector::new(SelectionConfig::default());
        let err = selector
            .select(&pool, &HashSet::new(), &mut IgnoreAvailability)
            .unwrap_err();
        assert!(matches!(err, ScoutError::Capacity { target: 15, .. }));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let config = small_config(1000);
        let pool = vec![
            candidate(1, Position::Gkp, 1, 50, 10.0),
            candidate(2, Position::Gkp, 2, 50, 10.0),
            candidate(3, Position::Def, 3, 50, 10.0),
            candidate(4, Position::Mid, 4, 50, 10.0),
        ];
        let selector = SquadSelector::new(config);
        let first = selector.select(&pool, &HashSet::new(), &mut IgnoreAvailability).unwrap();
        let second = selector.select(&pool, &HashSet::new(), &mut IgnoreAvailability).unwrap();

        let ids = |o: &SelectionOutcome| o.squad.players.iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), vec![1, 3, 4]);
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_pinned_players_are_boosted() {
        let config = small_config(1000);
        let pool = vec![
            candidate(1, Position::Gkp, 1, 50, 10.0),
            candidate(2, Position::Gkp, 2, 50, 1.0),
            candidate(3, Position::Def, 3, 50, 10.0),
            candidate(4, Position::Mid, 4, 50, 10.0),
        ];
        let pinned: HashSet<u32> = [2].into_iter().collect();
        let selector = SquadSelector::new(config);
        let outcome = selector.select(&pool, &pinned, &mut IgnoreAvailability).unwrap();
        assert!(outcome.squad.contains(2));
        assert!(!outcome.squad.contains(1));
    }

    #[test]
    fn test_discount_restarts_with_lower_priority() {
        let config = small_config(1000);
        let mut doubtful = candidate(1, Position::Gkp, 1, 50, 10.0);
        doubtful.availability = 0.25;
        let pool = vec![
            doubtful,
            candidate(2, Position::Gkp, 2, 50, 8.0),
            candidate(3, Position::Def, 3, 50, 9.0),
            candidate(4, Position::Mid, 4, 50, 7.0),
        ];
        let selector = SquadSelector::new(config);
        let outcome = selector.select(&pool, &HashSet::new(), &mut DiscountAvailability).unwrap();

        assert_eq!(outcome.restarts, 1);
        assert!(outcome.squad.contains(2));
        assert!(!outcome.squad.contains(1));
    }

    #[test]
    fn test_exclude_and_ignore_decisions() {
        let config = small_config(1000);
        let mut doubtful_gkp = candidate(1, Position::Gkp, 1, 50, 10.0);
        doubtful_gkp.availability = 0.5;
        let mut doubtful_def = candidate(3, Position::Def, 3, 50, 9.0);
        doubtful_def.availability = 0.75;
        let pool = vec![
            doubtful_gkp,
            candidate(2, Position::Gkp, 2, 50, 8.0),
            doubtful_def,
            candidate(4, Position::Mid, 4, 50, 7.0),
        ];

        let mut asked = Vec::new();
        let mut strategy = |p: &ScoredPlayer| {
            asked.push(p.id);
            if p.position == Position::Gkp {
                AvailabilityDecision::Exclude
            } else {
                AvailabilityDecision::Ignore
            }
        };
        let selector = SquadSelector::new(config);
        let outcome = selector.select(&pool, &HashSet::new(), &mut strategy).unwrap();

        assert_eq!(asked, vec![1, 3]);
        assert_eq!(outcome.excluded, vec![1]);
        let ids: Vec<u32> = outcome.squad.players.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 2, 4]);
    }

    #[test]
    fn test_restart_clears_selection() {
        let config = small_config(1000);
        let pool = vec![
            candidate(1, Position::Gkp, 1, 50, 10.0),
            candidate(2, Position::Def, 2, 40, 9.0),
        ];
        let selector = SquadSelector::new(config);
        let mut state = selector.initial_state(&pool, &HashSet::new());
        assert_eq!(selector.run_pass(&mut state, &mut IgnoreAvailability), PassOutcome::Progress(2));
        assert_eq!(state.spent, 90);

        selector.restart(&mut state);
        assert!(state.squad.is_empty());
        assert_eq!(state.spent, 0);
        assert!(state.club_counts.is_empty());
        assert_eq!(state.candidates.len(), 2);
        assert_eq!(state.phase, SelectionPhase::Reconsidering);
    }

    #[test]
    fn test_overflowing_prices_are_never_affordable() {
        let config = SelectionConfig {
            squad_size: 3,
            limits: PositionLimits { gkp: 1, def: 0, mid: 2, fwd: 0 },
            budget: 1000,
            near_budget_threshold: 10_000,
            reserve_budget: true,
            ..SelectionConfig::default()
        };
        let pool = vec![
            candidate(1, Position::Gkp, 1, 50, 10.0),
            candidate(2, Position::Mid, 2, u32::MAX, 9.0),
            candidate(3, Position::Mid, 3, u32::MAX, 8.0),
        ];
        let selector = SquadSelector::new(config.clone());
        let mut state = selector.initial_state(&pool, &HashSet::new());

        // Two open midfield slots at u32::MAX each saturate instead of wrapping
        assert_eq!(selector.cheapest_fill(&state, &state.candidates[0]), u32::MAX);
        assert!(!selector.can_admit(&state, &state.candidates[0]));

        let plain = SquadSelector::new(SelectionConfig {
            reserve_budget: false,
            ..config
        });
        plain.admit(&mut state, 0);
        assert_eq!(state.spent, 50);
        assert!(!plain.can_admit(&state, &state.candidates[1]));

        let err = plain
            .select(&pool, &HashSet::new(), &mut IgnoreAvailability)
            .unwrap_err();
        assert!(matches!(err, ScoutError::Capacity { .. }));
    }

    fn pool_strategy() -> impl Strategy<Value = Vec<ScoredPlayer>> {
        prop::collection::vec((0usize..4, 40u32..=130, 1u32..=20, 0.0f64..100.0), 15..60).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (position, price, team_id, score))| {
                    candidate(i as u32 + 1, Position::ALL[position], team_id, price, score)
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// A returned squad always satisfies every limit; anything else is a capacity failure
        #[test]
        fn prop_select_returns_valid_squad_or_capacity_error(
            pool in pool_strategy(),
            reserve_budget in any::<bool>()
        ) {
            let config = SelectionConfig {
                reserve_budget,
                ..SelectionConfig::default()
            };
            let selector = SquadSelector::new(config.clone());
            match selector.select(&pool, &HashSet::new(), &mut IgnoreAvailability) {
                Ok(outcome) => {
                    assert_valid(&outcome.squad, &config);
                    for p in &outcome.squad.players {
                        prop_assert!(!outcome.evicted.contains(&p.id));
                    }
                }
                Err(err) => {
                    prop_assert!(matches!(err, ScoutError::Capacity { .. }), "unexpected error: {}", err);
                }
            }
        }
    }
}
