use serde::Serialize;

use crate::models::ScoredPlayer;

/// What to do with a doubtful candidate (availability below 1.0) that would otherwise be admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AvailabilityDecision {
    /// Scale the candidate's priority by its availability and restart selection
    Discount,
    /// Remove the candidate from the pool for the rest of the run
    Exclude,
    /// Admit the candidate as if fully fit
    Ignore,
}

/// Decides doubtful candidates during squad selection. Each candidate is asked at most once per run.
pub trait AvailabilityStrategy {
    fn decide(&mut self, candidate: &ScoredPlayer) -> AvailabilityDecision;
}

impl<F> AvailabilityStrategy for F
where
    F: FnMut(&ScoredPlayer) -> AvailabilityDecision,
{
    fn decide(&mut self, candidate: &ScoredPlayer) -> AvailabilityDecision {
        self(candidate)
    }
}

/// Batch default: availability never blocks a pick
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreAvailability;

impl AvailabilityStrategy for IgnoreAvailability {
    fn decide(&mut self, _candidate: &ScoredPlayer) -> AvailabilityDecision {
        AvailabilityDecision::Ignore
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiscountAvailability;

impl AvailabilityStrategy for DiscountAvailability {
    fn decide(&mut self, _candidate: &ScoredPlayer) -> AvailabilityDecision {
        AvailabilityDecision::Discount
    }
}

/// Excludes anyone below the threshold, ignores the flag otherwise
#[derive(Debug, Clone, Copy)]
pub struct ExcludeDoubtful {
    pub threshold: f64,
}

impl Default for ExcludeDoubtful {
    fn default() -> Self {
        Self { threshold: 0.75 }
    }
}

impl AvailabilityStrategy for ExcludeDoubtful {
    fn decide(&mut self, candidate: &ScoredPlayer) -> AvailabilityDecision {
        if candidate.availability < self.threshold {
            AvailabilityDecision::Exclude
        } else {
            AvailabilityDecision::Ignore
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Position;

    fn doubtful(availability: f64) -> ScoredPlayer {
        ScoredPlayer {
            id: 1,
            name: "Doubt".to_string(),
            position: Position::Def,
            team_id: 1,
            team_name: "ARS".to_string(),
            price: 50,
            availability,
            gameweek_scores: vec![],
            performance: 0.0,
            history_multiplier: 1.0,
            previous_difficulty: 0.0,
            upcoming_difficulty: 0.0,
            performance_score: 0.0,
            combined_score: 0.0,
            final_score: 0.0,
            gameweek_score: 0.0,
            skipped_fixtures: 0,
            beyond_horizon: 0,
        }
    }

    #[test]
    fn test_exclude_doubtful_threshold() {
        let mut strategy = ExcludeDoubtful::default();
        assert_eq!(strategy.decide(&doubtful(0.5)), AvailabilityDecision::Exclude);
        assert_eq!(strategy.decide(&doubtful(0.75)), AvailabilityDecision::Ignore);
    }

    #[test]
    fn test_closures_are_strategies() {
        let mut calls = 0;
        let mut strategy = |_: &ScoredPlayer| {
            calls += 1;
            AvailabilityDecision::Discount
        };
        assert_eq!(strategy.decide(&doubtful(0.25)), AvailabilityDecision::Discount);
        assert_eq!(IgnoreAvailability.decide(&doubtful(0.25)), AvailabilityDecision::Ignore);
        drop(strategy);
        assert_eq!(calls, 1);
    }
}
