use crate::error::{ScoutError, ScoutResult};
use crate::models::{FixtureRecord, GameweekRecord, Player, Position, StrengthKind, TeamIndex};

/// Rating assumed for a team, or a single rating, that is absent
pub const DEFAULT_STRENGTH: f64 = 1000.0;

/// Anything that describes a match from one player's point of view:
/// played gameweeks and scheduled fixtures both qualify.
pub trait FixtureContext {
    fn opponent_team(&self) -> Option<u32>;
    fn team_h(&self) -> Option<u32>;
    fn team_a(&self) -> Option<u32>;
    fn was_home(&self) -> Option<bool>;
}

impl FixtureContext for GameweekRecord {
    fn opponent_team(&self) -> Option<u32> {
        self.opponent_team
    }
    fn team_h(&self) -> Option<u32> {
        self.team_h
    }
    fn team_a(&self) -> Option<u32> {
        self.team_a
    }
    fn was_home(&self) -> Option<bool> {
        self.was_home
    }
}

impl FixtureContext for FixtureRecord {
    fn opponent_team(&self) -> Option<u32> {
        self.opponent_team
    }
    fn team_h(&self) -> Option<u32> {
        self.team_h
    }
    fn team_a(&self) -> Option<u32> {
        self.team_a
    }
    fn was_home(&self) -> Option<bool> {
        self.is_home
    }
}

/// Opponent id: the explicit field first, otherwise whichever side the player's team is not.
pub fn resolve_opponent<F: FixtureContext + ?Sized>(team_id: u32, fixture: &F) -> ScoutResult<u32> {
    if let Some(opponent) = fixture.opponent_team() {
        return Ok(opponent);
    }

    match (fixture.team_h(), fixture.team_a()) {
        (Some(home), Some(away)) if home == team_id => Ok(away),
        (Some(home), Some(away)) if away == team_id => Ok(home),
        (home, away) => Err(ScoutError::input(format!(
            "no opponent for team {} in fixture (team_h={:?}, team_a={:?})",
            team_id, home, away
        ))),
    }
}

/// Home orientation: an explicit flag wins, otherwise the home side id.
pub fn is_home<F: FixtureContext + ?Sized>(team_id: u32, fixture: &F) -> bool {
    match fixture.was_home() {
        Some(flag) => flag,
        None => fixture.team_h() == Some(team_id),
    }
}

/// Rating pair for (player's team, opponent). Forwards pit attack against the
/// opponent's defence; every other position pits defence against attack.
pub fn strength_pairing(position: Position, home: bool) -> (StrengthKind, StrengthKind) {
    match (position, home) {
        (Position::Fwd, true) => (StrengthKind::AttackHome, StrengthKind::DefenceAway),
        (Position::Fwd, false) => (StrengthKind::AttackAway, StrengthKind::DefenceHome),
        (_, true) => (StrengthKind::DefenceHome, StrengthKind::AttackAway),
        (_, false) => (StrengthKind::DefenceAway, StrengthKind::AttackHome),
    }
}

/// Ratio of the player's team strength to the opponent's relevant strength.
pub fn fixture_difficulty<F: FixtureContext + ?Sized>(
    team_id: u32,
    position: Position,
    fixture: &F,
    teams: &TeamIndex,
) -> ScoutResult<f64> {
    let opponent_id = resolve_opponent(team_id, fixture)?;
    let home = is_home(team_id, fixture);
    let (own_kind, opponent_kind) = strength_pairing(position, home);

    let own = teams
        .get(team_id)
        .and_then(|t| t.strength(own_kind))
        .unwrap_or(DEFAULT_STRENGTH);
    let opponent = teams
        .get(opponent_id)
        .and_then(|t| t.strength(opponent_kind))
        .unwrap_or(DEFAULT_STRENGTH);

    // A zero or negative rating cannot form a ratio
    let own = if own > 0.0 { own } else { DEFAULT_STRENGTH };
    let opponent = if opponent > 0.0 { opponent } else { DEFAULT_STRENGTH };

    Ok(own / opponent)
}

pub fn player_fixture_difficulty<F: FixtureContext + ?Sized>(
    player: &Player,
    fixture: &F,
    teams: &TeamIndex,
) -> ScoutResult<f64> {
    fixture_difficulty(player.team_id, player.position, fixture, teams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Team;

    fn team(id: u32, attack_home: f64, attack_away: f64, defence_home: f64, defence_away: f64) -> Team {
        Team {
            id,
            code: id,
            name: format!("Team {}", id),
            short_name: format!("T{}", id),
            strength: None,
            strength_overall_home: None,
            strength_overall_away: None,
            strength_attack_home: Some(attack_home),
            strength_attack_away: Some(attack_away),
            strength_defence_home: Some(defence_home),
            strength_defence_away: Some(defence_away),
        }
    }

    fn index() -> TeamIndex {
        TeamIndex::new(vec![
            team(1, 1300.0, 1250.0, 1200.0, 1150.0),
            team(2, 1100.0, 1050.0, 1000.0, 1080.0),
        ])
    }

    #[test]
    fn test_forward_home_uses_attack_vs_defence() {
        let gw = GameweekRecord {
            opponent_team: Some(2),
            was_home: Some(true),
            ..Default::default()
        };
        let ratio = fixture_difficulty(1, Position::Fwd, &gw, &index()).unwrap();
        assert!((ratio - 1300.0 / 1080.0).abs() < 1e-12);
    }

    #[test]
    fn test_defender_away_uses_defence_vs_attack() {
        let gw = GameweekRecord {
            opponent_team: Some(2),
            was_home: Some(false),
            ..Default::default()
        };
        let ratio = fixture_difficulty(1, Position::Def, &gw, &index()).unwrap();
        assert!((ratio - 1150.0 / 1100.0).abs() < 1e-12);
    }

    #[test]
    fn test_opponent_inferred_from_home_away_ids() {
        let fixture = FixtureRecord {
            event: Some(5),
            team_h: Some(2),
            team_a: Some(1),
            ..Default::default()
        };
        assert_eq!(resolve_opponent(1, &fixture).unwrap(), 2);
        assert!(!is_home(1, &fixture));
        assert!(is_home(2, &fixture));

        let ratio = fixture_difficulty(1, Position::Mid, &fixture, &index()).unwrap();
        assert!((ratio - 1150.0 / 1100.0).abs() < 1e-12);
    }

    #[test]
    fn test_unresolvable_opponent_is_input_error() {
        let missing = FixtureRecord::default();
        assert!(fixture_difficulty(1, Position::Mid, &missing, &index())
            .unwrap_err()
            .is_input());

        let foreign = FixtureRecord {
            team_h: Some(5),
            team_a: Some(6),
            ..Default::default()
        };
        assert!(fixture_difficulty(1, Position::Mid, &foreign, &index())
            .unwrap_err()
            .is_input());
    }

    #[test]
    fn test_missing_teams_give_neutral_ratio() {
        let gw = GameweekRecord {
            opponent_team: Some(99),
            was_home: Some(true),
            ..Default::default()
        };
        let ratio = fixture_difficulty(98, Position::Gkp, &gw, &TeamIndex::default()).unwrap();
        assert_eq!(ratio, 1.0);
    }

    #[test]
    fn test_home_away_swap_is_reciprocal() {
        // Team 1 forward at home vs team 2, and team 2 defender away at team 1
        let teams = index();
        let forward_view = FixtureRecord {
            team_h: Some(1),
            team_a: Some(2),
            ..Default::default()
        };
        let there = fixture_difficulty(1, Position::Fwd, &forward_view, &teams).unwrap();
        let back = fixture_difficulty(2, Position::Def, &forward_view, &teams).unwrap();
        // FWD@1 home: 1.attack_home / 2.defence_away; DEF@2 away: 2.defence_away / 1.attack_home
        assert!((there * back - 1.0).abs() < 1e-12);
    }
}
