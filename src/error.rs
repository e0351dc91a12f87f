use thiserror::Error;

use crate::game::{GameId, Season, TeamId};

/// Errors surfaced by the rating core.
///
/// Only `SeasonTooSparse` aborts a solve. `DataQuality` and
/// `InsufficientData` are handled locally: the offending record or team is
/// excluded, logged, and carried in the season output's exclusion list so
/// the drop can be traced back to source data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RatingError {
    /// Malformed per-game input: non-positive possession estimate,
    /// self-play, or a game without exactly two box-score lines.
    #[error("bad box score for team {team_id} in game {game_id}: {reason}")]
    DataQuality {
        game_id: GameId,
        team_id: TeamId,
        reason: String,
    },

    /// A team played fewer valid games than the configured minimum; it gets
    /// no rating at all rather than a numerically unstable one.
    #[error("team {team_id} has {games} valid games, {required} required")]
    InsufficientData {
        team_id: TeamId,
        games: u32,
        required: u32,
    },

    /// The whole season is unusable: too few valid games survived
    /// validation for any meaningful rating to exist.
    #[error("season {season} has only {valid_games} valid games, {required} required")]
    SeasonTooSparse {
        season: Season,
        valid_games: u32,
        required: u32,
    },

    /// A matchup prediction referenced a team with no rating this season.
    #[error("no rating for team {team_id} in season {season}")]
    UnknownTeam { team_id: TeamId, season: Season },
}

pub type Result<T> = std::result::Result<T, RatingError>;
