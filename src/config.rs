use crate::constants::{
    DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_GAMES, DEFAULT_MIN_SEASON_GAMES, DEFAULT_TOLERANCE,
    FT_POSSESSION_COEFF,
};

/// Numeric knobs for a season solve.
///
/// These are the only parameters that affect algorithm behavior; everything
/// else (anchor constant, league tempo) is a fixed league-level constant.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    /// Teams with fewer valid games than this are excluded from the season.
    pub min_games: u32,

    /// Converged when the max per-team Relative Rating change in one
    /// iteration falls below this.
    pub convergence_tolerance: f64,

    /// Hard iteration cap; hitting it yields best-so-far ratings flagged
    /// unconverged rather than an error.
    pub max_iterations: u32,

    /// Share of free-throw attempts that end a possession.
    pub ft_possession_coeff: f64,

    /// Fatal floor on total valid games in the season.
    pub min_season_games: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            min_games: DEFAULT_MIN_GAMES,
            convergence_tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            ft_possession_coeff: FT_POSSESSION_COEFF,
            min_season_games: DEFAULT_MIN_SEASON_GAMES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let cfg = SolverConfig::default();
        assert_eq!(cfg.min_games, 3);
        assert!((cfg.convergence_tolerance - 0.05).abs() < 1e-12);
        assert_eq!(cfg.max_iterations, 25);
        assert!((cfg.ft_possession_coeff - 0.475).abs() < 1e-12);
    }
}
