use statrs::distribution::{ContinuousCDF, Normal};

use crate::constants::{AVG_EFFICIENCY, AVG_TEMPO, SCORING_STDDEV};
use crate::error::RatingError;
use crate::game::{TeamId, Venue};
use crate::rating::{SeasonRatings, TeamRating};

/// Pairwise matchup predictor over one season's frozen ratings.
///
/// The home-court term is an external input: it belongs to the Home Court
/// Advantage feature, not to this core, so the caller supplies it in points.
pub struct MatchupPredictor<'a> {
    ratings: &'a SeasonRatings,
    home_advantage: f64,
}

impl<'a> MatchupPredictor<'a> {
    pub fn new(ratings: &'a SeasonRatings, home_advantage: f64) -> Self {
        MatchupPredictor { ratings, home_advantage }
    }

    fn rating(&self, team: TeamId) -> Result<&TeamRating, RatingError> {
        self.ratings.get(team).ok_or(RatingError::UnknownTeam {
            team_id: team,
            season: self.ratings.season,
        })
    }

    /// Expected possessions when these two teams meet.
    fn expected_pace(a: &TeamRating, b: &TeamRating) -> f64 {
        (a.tempo * b.tempo) / AVG_TEMPO
    }

    /// Expected point differential, team A minus team B, with `venue` from
    /// A's perspective.
    ///
    /// The base margin pits A's adjusted offense against B's adjusted
    /// defense (and vice versa) at the matchup's expected tempo; both teams'
    /// opponent-strength and pace coefficients are then applied against the
    /// other team's specific strength and the tempo shift each team faces.
    pub fn predict(&self, a: TeamId, b: TeamId, venue: Venue) -> Result<f64, RatingError> {
        let ra = self.rating(a)?;
        let rb = self.rating(b)?;

        let pace = Self::expected_pace(ra, rb);
        let base = ((ra.adjusted_offense + rb.adjusted_defense)
            - (rb.adjusted_offense + ra.adjusted_defense))
            * pace
            / 100.0;

        // Re-centering pins the league-average relative rating at zero, so
        // each opponent's relative rating is already its strength deviation.
        let strength_term = ra.opponent_strength_adjustment * rb.relative_rating()
            - rb.opponent_strength_adjustment * ra.relative_rating();
        let pace_term = ra.pace_adjustment * (pace - ra.tempo)
            - rb.pace_adjustment * (pace - rb.tempo);
        let venue_term = match venue {
            Venue::Home => self.home_advantage,
            Venue::Away => -self.home_advantage,
            Venue::Neutral => 0.0,
        };

        Ok(base + strength_term + pace_term + venue_term)
    }

    /// Projected final scores, (team A, team B).
    pub fn expected_scores(
        &self,
        a: TeamId,
        b: TeamId,
        venue: Venue,
    ) -> Result<(f64, f64), RatingError> {
        let ra = self.rating(a)?;
        let rb = self.rating(b)?;
        let pace = Self::expected_pace(ra, rb);

        let a_base = (ra.adjusted_offense + rb.adjusted_defense - AVG_EFFICIENCY) * pace / 100.0;
        let b_base = (rb.adjusted_offense + ra.adjusted_defense - AVG_EFFICIENCY) * pace / 100.0;
        let total = a_base + b_base;

        let margin = self.predict(a, b, venue)?;
        Ok(((total + margin) / 2.0, (total - margin) / 2.0))
    }

    /// Probability of team A beating team B: normal-CDF transform of the
    /// predicted margin, with the margin stddev scaled by tempo.
    pub fn win_probability(&self, a: TeamId, b: TeamId, venue: Venue) -> Result<f64, RatingError> {
        let ra = self.rating(a)?;
        let rb = self.rating(b)?;
        let pace = Self::expected_pace(ra, rb);

        let margin = self.predict(a, b, venue)?;
        let stddev = SCORING_STDDEV * (pace / AVG_TEMPO);

        let normal = Normal::new(0.0, 1.0).unwrap();
        Ok(normal.cdf(margin / stddev))
    }
}
