use crate::error::RatingError;
use crate::game::BoxScoreLine;

/// Raw possession formula over box-score counts.
///
/// `fga + coeff * fta - oreb + tov`. An offensive rebound continues the same
/// possession, so it subtracts; the free-throw coefficient is the share of
/// free-throw trips that end a possession.
pub fn raw_estimate(fga: u32, fta: u32, oreb: u32, tov: u32, ft_coeff: f64) -> f64 {
    f64::from(fga) + ft_coeff * f64::from(fta) - f64::from(oreb) + f64::from(tov)
}

/// Estimated possessions for one team in one game.
///
/// A non-positive estimate cannot be a real basketball outcome; it means the
/// box score is corrupt, so the record is rejected rather than zeroed.
pub fn estimate_possessions(line: &BoxScoreLine, ft_coeff: f64) -> Result<f64, RatingError> {
    let possessions = raw_estimate(
        line.field_goal_attempts,
        line.free_throw_attempts,
        line.offensive_rebounds,
        line.turnovers,
        ft_coeff,
    );

    if possessions > 0.0 {
        Ok(possessions)
    } else {
        Err(RatingError::DataQuality {
            game_id: line.game_id,
            team_id: line.team_id,
            reason: format!("non-positive possession estimate {:.2}", possessions),
        })
    }
}
