//! Rating Core - opponent-adjusted team rating solver for NCAA basketball.
//!
//! Given one season's validated box-score table, this library estimates
//! possessions, pools raw per-100-possession efficiencies, builds the
//! season's opponent graph, and runs a Jacobi fixed-point solve that jointly
//! fits each team's adjusted offense/defense plus opponent-strength and pace
//! coefficients. The composed scalar ("Relative Rating") and a pairwise
//! matchup predictor feed the downstream feature store and bracket work.
//!
//! Python bindings for the feature pipeline live behind the `python`
//! feature.

pub mod config;
pub mod constants;
pub mod efficiency;
pub mod error;
pub mod game;
pub mod graph;
pub mod possession;
pub mod predict;
pub mod rating;
pub mod solver;

#[cfg(feature = "python")]
pub mod py;

pub use config::SolverConfig;
pub use constants::{AVG_EFFICIENCY, AVG_TEMPO, FT_POSSESSION_COEFF, SCORING_STDDEV};
pub use efficiency::{season_efficiency, RawEfficiency};
pub use error::RatingError;
pub use game::{BoxScoreLine, GameRecord, Season, TeamGame, TeamId, Venue};
pub use graph::{OpponentEdge, OpponentGraph};
pub use possession::estimate_possessions;
pub use predict::MatchupPredictor;
pub use rating::{RatingRow, SeasonRatings, TeamRating};
pub use solver::{solve_season, solve_season_with_cancel, SeasonSolver};
