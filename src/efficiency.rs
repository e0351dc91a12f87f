use crate::error::RatingError;
use crate::game::{TeamGame, TeamId};

/// Season-aggregate raw efficiency for one team.
///
/// Both sides are pooled ratios (total points over total possessions), not
/// means of per-game ratios, so a high-possession game contributes exactly
/// its share of the season's scoring and no more.
#[derive(Clone, Copy, Debug)]
pub struct RawEfficiency {
    /// Points scored per 100 possessions.
    pub offensive: f64,
    /// Points allowed per 100 opponent possessions.
    pub defensive: f64,
    /// Season total estimated possessions; the weight used for league
    /// re-centering.
    pub possessions: f64,
    /// Season-average game pace (possessions per game).
    pub tempo: f64,
    pub games: u32,
}

impl RawEfficiency {
    pub fn net(&self) -> f64 {
        self.offensive - self.defensive
    }
}

/// Pool a team's season into raw offensive/defensive efficiency.
///
/// Fewer than `min_games` valid games is an `InsufficientData` error: a one
/// or two game sample produces ratings too unstable to feed the solver, and
/// a silent default would corrupt downstream matchup predictions.
pub fn season_efficiency(
    team_id: TeamId,
    games: &[TeamGame],
    min_games: u32,
) -> Result<RawEfficiency, RatingError> {
    if (games.len() as u32) < min_games {
        return Err(RatingError::InsufficientData {
            team_id,
            games: games.len() as u32,
            required: min_games,
        });
    }

    let mut points = 0.0;
    let mut points_allowed = 0.0;
    let mut possessions = 0.0;
    let mut opponent_possessions = 0.0;
    let mut pace = 0.0;
    for g in games {
        points += g.points;
        points_allowed += g.points_allowed;
        possessions += g.possessions;
        opponent_possessions += g.opponent_possessions;
        pace += g.pace;
    }

    Ok(RawEfficiency {
        offensive: points / possessions * 100.0,
        defensive: points_allowed / opponent_possessions * 100.0,
        possessions,
        tempo: pace / games.len() as f64,
        games: games.len() as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Venue;

    fn game(points: f64, allowed: f64, poss: f64) -> TeamGame {
        TeamGame {
            game_id: 0,
            opponent_id: 99,
            points,
            points_allowed: allowed,
            possessions: poss,
            opponent_possessions: poss,
            pace: poss,
            venue: Venue::Neutral,
        }
    }

    #[test]
    fn test_pooled_not_averaged() {
        // Deliberately uneven possession counts: the pooled ratio and the
        // mean of per-game ratios disagree, and the pooled one is correct.
        let games = vec![game(60.0, 55.0, 50.0), game(90.0, 80.0, 90.0), game(77.0, 70.0, 70.0)];

        let eff = season_efficiency(1, &games, 3).unwrap();
        let pooled = (60.0 + 90.0 + 77.0) / (50.0 + 90.0 + 70.0) * 100.0;
        assert!((eff.offensive - pooled).abs() < 1e-12);

        let mean_of_ratios =
            (60.0 / 50.0 + 90.0 / 90.0 + 77.0 / 70.0) / 3.0 * 100.0;
        assert!((eff.offensive - mean_of_ratios).abs() > 0.1);

        let pooled_def = (55.0 + 80.0 + 70.0) / (50.0 + 90.0 + 70.0) * 100.0;
        assert!((eff.defensive - pooled_def).abs() < 1e-12);
    }

    #[test]
    fn test_min_games_boundary() {
        let games: Vec<TeamGame> = (0..2).map(|_| game(70.0, 65.0, 68.0)).collect();
        let err = season_efficiency(5, &games, 3).unwrap_err();
        assert_eq!(
            err,
            RatingError::InsufficientData { team_id: 5, games: 2, required: 3 }
        );

        let games: Vec<TeamGame> = (0..3).map(|_| game(70.0, 65.0, 68.0)).collect();
        assert!(season_efficiency(5, &games, 3).is_ok());
    }

    #[test]
    fn test_tempo_is_mean_pace() {
        let games = vec![game(70.0, 65.0, 60.0), game(70.0, 65.0, 70.0), game(70.0, 65.0, 80.0)];
        let eff = season_efficiency(1, &games, 3).unwrap();
        assert!((eff.tempo - 70.0).abs() < 1e-12);
    }
}
