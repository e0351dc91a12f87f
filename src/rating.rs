use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RatingError;
use crate::game::{Season, TeamId};

/// A team's frozen season rating: the converged solver state plus the raw
/// efficiencies it started from.
#[derive(Clone, Debug)]
pub struct TeamRating {
    pub team_id: TeamId,
    pub season: Season,
    pub raw_offense: f64,
    pub raw_defense: f64,
    /// Opponent-adjusted points scored per 100 possessions.
    pub adjusted_offense: f64,
    /// Opponent-adjusted points allowed per 100 possessions (lower is better).
    pub adjusted_defense: f64,
    /// Slope of margin residuals on opponent strength: positive means the
    /// team outperforms its own average specifically against strong fields.
    pub opponent_strength_adjustment: f64,
    /// Slope of margin residuals on pace: positive means the team plays up
    /// in faster-than-usual games.
    pub pace_adjustment: f64,
    /// Season-average possessions per game.
    pub tempo: f64,
    /// Season total estimated possessions (the re-centering weight).
    pub possessions: f64,
    pub games: u32,
}

impl TeamRating {
    /// The composed scalar: net efficiency margin against a league-average
    /// opponent at league-average pace.
    pub fn relative_rating(&self) -> f64 {
        self.adjusted_offense - self.adjusted_defense
    }
}

/// One season's frozen solve result. Shared read-only once produced; a
/// changed game set means a full re-solve, never an incremental patch.
#[derive(Clone, Debug)]
pub struct SeasonRatings {
    pub season: Season,
    pub ratings: BTreeMap<TeamId, TeamRating>,
    /// Iterations actually run before convergence or the cap.
    pub iterations: u32,
    /// False when the iteration cap was hit: ratings are best-so-far and
    /// downstream consumers may flag the season as low-confidence.
    pub converged: bool,
    /// Max per-team Relative Rating change after each iteration.
    pub delta_history: Vec<f64>,
    /// Every record or team dropped on the way here, in input order.
    pub exclusions: Vec<RatingError>,
}

impl SeasonRatings {
    pub fn get(&self, team: TeamId) -> Option<&TeamRating> {
        self.ratings.get(&team)
    }

    /// Teams sorted by Relative Rating, best first.
    pub fn rankings(&self) -> Vec<&TeamRating> {
        let mut teams: Vec<&TeamRating> = self.ratings.values().collect();
        teams.sort_by(|a, b| {
            b.relative_rating()
                .partial_cmp(&a.relative_rating())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        teams
    }

    /// Flat rows for the downstream feature store, keyed by (team, season).
    pub fn export_rows(&self) -> Vec<RatingRow> {
        self.ratings
            .values()
            .map(|r| RatingRow {
                team_id: r.team_id,
                season: r.season,
                raw_offensive_efficiency: r.raw_offense,
                raw_defensive_efficiency: r.raw_defense,
                adjusted_offensive_rating: r.adjusted_offense,
                adjusted_defensive_rating: r.adjusted_defense,
                opponent_strength_adjustment: r.opponent_strength_adjustment,
                pace_adjustment: r.pace_adjustment,
                relative_rating: r.relative_rating(),
                iterations_to_converge: self.iterations,
                converged: self.converged,
            })
            .collect()
    }
}

/// The feature-export row consumed by model training.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RatingRow {
    pub team_id: TeamId,
    pub season: Season,
    pub raw_offensive_efficiency: f64,
    pub raw_defensive_efficiency: f64,
    pub adjusted_offensive_rating: f64,
    pub adjusted_defensive_rating: f64,
    pub opponent_strength_adjustment: f64,
    pub pace_adjustment: f64,
    pub relative_rating: f64,
    pub iterations_to_converge: u32,
    pub converged: bool,
}
