/// League-average efficiency anchor (points per 100 possessions).
///
/// Every solver iteration re-centers adjusted offense and defense so their
/// possession-weighted league averages sit exactly here.
pub const AVG_EFFICIENCY: f64 = 104.6;

/// League-average tempo (possessions per game).
pub const AVG_TEMPO: f64 = 67.7;

/// Standard deviation of single-game scoring margin.
pub const SCORING_STDDEV: f64 = 11.0;

/// Free-throw possession coefficient: the share of free-throw attempts that
/// end a possession.
pub const FT_POSSESSION_COEFF: f64 = 0.475;

/// Minimum games a team must play before its season efficiency is usable.
pub const DEFAULT_MIN_GAMES: u32 = 3;

/// Convergence tolerance on the max per-iteration Relative Rating change.
pub const DEFAULT_TOLERANCE: f64 = 0.05;

/// Hard cap on solver iterations.
pub const DEFAULT_MAX_ITERATIONS: u32 = 25;

/// Floor on total valid games in a season; below this no meaningful ratings
/// can be produced and the solve fails outright.
pub const DEFAULT_MIN_SEASON_GAMES: u32 = 50;

/// Clamp range for the per-game opponent-strength reweighting factor, so a
/// large adjustment coefficient can never zero out or invert a game's
/// contribution to the pooled efficiency.
pub const GAME_WEIGHT_MIN: f64 = 0.25;
pub const GAME_WEIGHT_MAX: f64 = 4.0;
