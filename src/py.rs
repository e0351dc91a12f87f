//! Python bindings for the rating core.
//!
//! The surrounding feature pipeline is Python; it hands the season's
//! box-score table in, receives frozen ratings back, and queries the
//! matchup predictor during bracket work.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::SolverConfig;
use crate::constants::{AVG_EFFICIENCY, AVG_TEMPO, FT_POSSESSION_COEFF, SCORING_STDDEV};
use crate::error::RatingError;
use crate::game::{BoxScoreLine, Venue};
use crate::predict::MatchupPredictor;
use crate::rating::SeasonRatings;
use crate::solver;

impl From<RatingError> for PyErr {
    fn from(err: RatingError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

fn parse_venue(venue: &str) -> PyResult<Venue> {
    match venue.to_ascii_lowercase().as_str() {
        "home" => Ok(Venue::Home),
        "away" => Ok(Venue::Away),
        "neutral" => Ok(Venue::Neutral),
        other => Err(PyValueError::new_err(format!(
            "venue must be 'home', 'away' or 'neutral', got {other:?}"
        ))),
    }
}

/// One team's box-score row for one game.
#[pyclass(name = "BoxScoreLine")]
#[derive(Clone)]
pub struct PyBoxScoreLine {
    inner: BoxScoreLine,
}

#[pymethods]
impl PyBoxScoreLine {
    #[new]
    #[pyo3(signature = (
        game_id, season, team_id, opponent_id, points,
        field_goal_attempts, free_throw_attempts, offensive_rebounds,
        turnovers, venue = "neutral"
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        game_id: u64,
        season: u16,
        team_id: u32,
        opponent_id: u32,
        points: u32,
        field_goal_attempts: u32,
        free_throw_attempts: u32,
        offensive_rebounds: u32,
        turnovers: u32,
        venue: &str,
    ) -> PyResult<Self> {
        Ok(PyBoxScoreLine {
            inner: BoxScoreLine {
                game_id,
                season,
                team_id,
                opponent_id,
                points,
                field_goal_attempts,
                free_throw_attempts,
                offensive_rebounds,
                turnovers,
                venue: parse_venue(venue)?,
            },
        })
    }

    fn __repr__(&self) -> String {
        format!(
            "BoxScoreLine(game={}, team={}, opp={}, pts={})",
            self.inner.game_id, self.inner.team_id, self.inner.opponent_id, self.inner.points
        )
    }
}

/// One season's frozen ratings plus the matchup predictor over them.
#[pyclass(name = "SeasonRatings")]
pub struct PySeasonRatings {
    inner: SeasonRatings,
}

#[pymethods]
impl PySeasonRatings {
    #[getter]
    fn season(&self) -> u16 {
        self.inner.season
    }

    #[getter]
    fn converged(&self) -> bool {
        self.inner.converged
    }

    #[getter]
    fn iterations(&self) -> u32 {
        self.inner.iterations
    }

    /// Rated team ids, best Relative Rating first.
    fn rankings(&self) -> Vec<u32> {
        self.inner.rankings().iter().map(|r| r.team_id).collect()
    }

    fn relative_rating(&self, team_id: u32) -> PyResult<f64> {
        self.inner
            .get(team_id)
            .map(|r| r.relative_rating())
            .ok_or_else(|| {
                RatingError::UnknownTeam { team_id, season: self.inner.season }.into()
            })
    }

    /// Feature-export rows as a JSON array (one object per team).
    fn export_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner.export_rows())
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Human-readable exclusion reasons, one per dropped record or team.
    fn exclusions(&self) -> Vec<String> {
        self.inner.exclusions.iter().map(|e| e.to_string()).collect()
    }

    /// Expected point differential, team A minus team B.
    #[pyo3(signature = (team_a, team_b, venue = "neutral", home_advantage = 0.0))]
    fn predict(
        &self,
        team_a: u32,
        team_b: u32,
        venue: &str,
        home_advantage: f64,
    ) -> PyResult<f64> {
        let predictor = MatchupPredictor::new(&self.inner, home_advantage);
        Ok(predictor.predict(team_a, team_b, parse_venue(venue)?)?)
    }

    #[pyo3(signature = (team_a, team_b, venue = "neutral", home_advantage = 0.0))]
    fn win_probability(
        &self,
        team_a: u32,
        team_b: u32,
        venue: &str,
        home_advantage: f64,
    ) -> PyResult<f64> {
        let predictor = MatchupPredictor::new(&self.inner, home_advantage);
        Ok(predictor.win_probability(team_a, team_b, parse_venue(venue)?)?)
    }

    #[pyo3(signature = (team_a, team_b, venue = "neutral", home_advantage = 0.0))]
    fn expected_scores(
        &self,
        team_a: u32,
        team_b: u32,
        venue: &str,
        home_advantage: f64,
    ) -> PyResult<(f64, f64)> {
        let predictor = MatchupPredictor::new(&self.inner, home_advantage);
        Ok(predictor.expected_scores(team_a, team_b, parse_venue(venue)?)?)
    }

    fn __repr__(&self) -> String {
        format!(
            "SeasonRatings(season={}, teams={}, iterations={}, converged={})",
            self.inner.season,
            self.inner.ratings.len(),
            self.inner.iterations,
            self.inner.converged
        )
    }
}

/// Solve one season's ratings from its box-score table.
#[pyfunction]
#[pyo3(signature = (
    lines, min_games = 3, convergence_tolerance = 0.05, max_iterations = 25,
    ft_possession_coeff = 0.475, min_season_games = 50
))]
fn solve_season(
    lines: Vec<PyBoxScoreLine>,
    min_games: u32,
    convergence_tolerance: f64,
    max_iterations: u32,
    ft_possession_coeff: f64,
    min_season_games: u32,
) -> PyResult<PySeasonRatings> {
    let config = SolverConfig {
        min_games,
        convergence_tolerance,
        max_iterations,
        ft_possession_coeff,
        min_season_games,
    };
    let rows: Vec<BoxScoreLine> = lines.into_iter().map(|l| l.inner).collect();
    let inner = solver::solve_season(&rows, &config)?;
    Ok(PySeasonRatings { inner })
}

/// Python module definition
#[pymodule]
fn rating_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyBoxScoreLine>()?;
    m.add_class::<PySeasonRatings>()?;
    m.add_function(wrap_pyfunction!(solve_season, m)?)?;

    m.add("AVG_EFFICIENCY", AVG_EFFICIENCY)?;
    m.add("AVG_TEMPO", AVG_TEMPO)?;
    m.add("SCORING_STDDEV", SCORING_STDDEV)?;
    m.add("FT_POSSESSION_COEFF", FT_POSSESSION_COEFF)?;

    Ok(())
}
