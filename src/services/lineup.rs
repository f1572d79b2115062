use std::collections::HashSet;

use crate::config::LineupConfig;
use crate::error::{ScoutError, ScoutResult};
use crate::models::{Lineup, Position, ScoredPlayer, Squad};
use crate::services::scorer::sort_descending_by;

/// Splits a completed squad into starters and bench by short-horizon gameweek score.
pub struct LineupSplitter {
    config: LineupConfig,
}

impl LineupSplitter {
    pub fn new(config: LineupConfig) -> Self {
        Self { config }
    }

    fn validate(&self, players: &[ScoredPlayer]) -> ScoutResult<()> {
        let minimums = &self.config.minimums;
        if minimums.total() > self.config.starters {
            return Err(ScoutError::input(format!(
                "formation minimums need {} starters but only {} may start",
                minimums.total(),
                self.config.starters
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = players.iter().find(|p| !seen.insert(p.id)) {
            return Err(ScoutError::input(format!("player {} appears twice in the squad", dup.id)));
        }

        for position in Position::ALL {
            let available = players.iter().filter(|p| p.position == position).count();
            if available < minimums.get(position) {
                return Err(ScoutError::input(format!(
                    "squad has {} {} but {} must start",
                    available,
                    position,
                    minimums.get(position)
                )));
            }
        }

        let outfield = players.iter().filter(|p| p.position != Position::Gkp).count();
        if minimums.gkp + outfield < self.config.starters {
            return Err(ScoutError::input(format!(
                "squad cannot field {} starters ({} outfield players)",
                self.config.starters, outfield
            )));
        }

        Ok(())
    }

    pub fn split(&self, squad: &Squad) -> ScoutResult<Lineup> {
        let mut ranked = squad.players.clone();
        sort_descending_by(&mut ranked, |p| p.gameweek_score);
        self.validate(&ranked)?;

        let mut starting = vec![false; ranked.len()];

        // Formation minimums first, best-scoring at each position
        for position in Position::ALL {
            let indices: Vec<usize> = ranked
                .iter()
                .enumerate()
                .filter(|(_, p)| p.position == position)
                .map(|(i, _)| i)
                .take(self.config.minimums.get(position))
                .collect();
            for i in indices {
                starting[i] = true;
            }
        }

        // Goalkeepers start exactly at their minimum; everyone else competes for the rest
        let mut filled = self.config.minimums.total();
        for (i, player) in ranked.iter().enumerate() {
            if filled >= self.config.starters {
                break;
            }
            if !starting[i] && player.position != Position::Gkp {
                starting[i] = true;
                filled += 1;
            }
        }

        let (starters, bench): (Vec<_>, Vec<_>) = ranked
            .into_iter()
            .zip(starting)
            .partition(|(_, starts)| *starts);

        let lineup = Lineup {
            starters: starters.into_iter().map(|(p, _)| p).collect(),
            bench: bench.into_iter().map(|(p, _)| p).collect(),
        };

        tracing::debug!(
            "Lineup: {} starters, {} on the bench",
            lineup.starters.len(),
            lineup.bench.len()
        );
        Ok(lineup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn player(id: u32, position: Position, gameweek_score: f64) -> ScoredPlayer {
        ScoredPlayer {
            id,
            name: format!("P{}", id),
            position,
            team_id: id,
            team_name: format!("T{}", id),
            price: 50,
            availability: 1.0,
            gameweek_scores: vec![],
            performance: 1.0,
            history_multiplier: 1.0,
            previous_difficulty: 0.0,
            upcoming_difficulty: 0.0,
            performance_score: 1.0,
            combined_score: 1.0,
            final_score: 1.0,
            gameweek_score,
            skipped_fixtures: 0,
            beyond_horizon: 0,
        }
    }

    fn squad() -> Squad {
        let rows = [
            (Position::Gkp, 9.0),
            (Position::Gkp, 8.0),
            (Position::Def, 7.0),
            (Position::Def, 6.0),
            (Position::Def, 5.0),
            (Position::Def, 1.0),
            (Position::Def, 0.5),
            (Position::Mid, 10.0),
            (Position::Mid, 4.0),
            (Position::Mid, 3.0),
            (Position::Mid, 2.0),
            (Position::Mid, 1.5),
            (Position::Fwd, 0.1),
            (Position::Fwd, 0.2),
            (Position::Fwd, 0.3),
        ];
        Squad {
            players: rows
                .iter()
                .enumerate()
                .map(|(i, (position, score))| player(i as u32 + 1, *position, *score))
                .collect(),
        }
    }

    fn count(players: &[ScoredPlayer], position: Position) -> usize {
        players.iter().filter(|p| p.position == position).count()
    }

    #[test]
    fn test_formation_minimums_hold() {
        let lineup = LineupSplitter::new(LineupConfig::default()).split(&squad()).unwrap();

        assert_eq!(lineup.starters.len(), 11);
        assert_eq!(lineup.bench.len(), 4);
        assert_eq!(count(&lineup.starters, Position::Gkp), 1);
        assert!(count(&lineup.starters, Position::Def) >= 3);
        assert!(count(&lineup.starters, Position::Mid) >= 3);
        assert!(count(&lineup.starters, Position::Fwd) >= 1);
    }

    #[test]
    fn test_partition_covers_squad_once() {
        let squad = squad();
        let lineup = LineupSplitter::new(LineupConfig::default()).split(&squad).unwrap();

        let starters: HashSet<u32> = lineup.starters.iter().map(|p| p.id).collect();
        let bench: HashSet<u32> = lineup.bench.iter().map(|p| p.id).collect();
        let all: HashSet<u32> = squad.players.iter().map(|p| p.id).collect();

        assert!(starters.is_disjoint(&bench));
        assert_eq!(&starters | &bench, all);
    }

    #[test]
    fn test_best_outfielders_fill_remaining_slots() {
        let lineup = LineupSplitter::new(LineupConfig::default()).split(&squad()).unwrap();

        let starter_scores: Vec<f64> = lineup.starters.iter().map(|p| p.gameweek_score).collect();
        assert_eq!(
            starter_scores,
            vec![10.0, 9.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.5, 1.0, 0.3]
        );

        // Second keeper outscores them but never starts; bench keeps score order
        let bench_scores: Vec<f64> = lineup.bench.iter().map(|p| p.gameweek_score).collect();
        assert_eq!(bench_scores, vec![8.0, 0.5, 0.2, 0.1]);
    }

    #[test]
    fn test_squad_without_goalkeeper_is_input_error() {
        let mut squad = squad();
        squad.players.retain(|p| p.position != Position::Gkp);
        let err = LineupSplitter::new(LineupConfig::default()).split(&squad).unwrap_err();
        assert!(err.is_input());
    }

    #[test]
    fn test_short_squad_is_input_error() {
        let mut squad = squad();
        squad.players.truncate(9);
        assert!(LineupSplitter::new(LineupConfig::default())
            .split(&squad)
            .unwrap_err()
            .is_input());
    }

    proptest! {
        /// Any scoring of a 2/5/5/3 squad yields a legal formation that partitions the squad
        #[test]
        fn prop_split_respects_formation(scores in prop::collection::vec(-5.0f64..20.0, 15)) {
            let mut squad = squad();
            for (p, score) in squad.players.iter_mut().zip(&scores) {
                p.gameweek_score = *score;
            }
            let lineup = LineupSplitter::new(LineupConfig::default()).split(&squad).unwrap();

            prop_assert_eq!(lineup.starters.len(), 11);
            prop_assert_eq!(lineup.bench.len(), 4);
            prop_assert_eq!(count(&lineup.starters, Position::Gkp), 1);
            prop_assert!(count(&lineup.starters, Position::Def) >= 3);
            prop_assert!(count(&lineup.starters, Position::Mid) >= 3);
            prop_assert!(count(&lineup.starters, Position::Fwd) >= 1);

            let starters: HashSet<u32> = lineup.starters.iter().map(|p| p.id).collect();
            let bench: HashSet<u32> = lineup.bench.iter().map(|p| p.id).collect();
            let all: HashSet<u32> = squad.players.iter().map(|p| p.id).collect();
            prop_assert!(starters.is_disjoint(&bench));
            prop_assert_eq!(&starters | &bench, all);
        }
    }
}
