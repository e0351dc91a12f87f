use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::SolverConfig;
use crate::error::RatingError;
use crate::possession::estimate_possessions;

pub type TeamId = u32;
pub type GameId = u64;
pub type Season = u16;

/// Floor location from one team's perspective.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Away,
    Neutral,
}

impl Venue {
    /// The same game seen from the other bench.
    pub fn flipped(self) -> Venue {
        match self {
            Venue::Home => Venue::Away,
            Venue::Away => Venue::Home,
            Venue::Neutral => Venue::Neutral,
        }
    }
}

/// One team's box-score row for one completed game, exactly as delivered by
/// the upstream data layer (already deduplicated and type-correct).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoxScoreLine {
    pub game_id: GameId,
    pub season: Season,
    pub team_id: TeamId,
    pub opponent_id: TeamId,
    pub points: u32,
    pub field_goal_attempts: u32,
    pub free_throw_attempts: u32,
    pub offensive_rebounds: u32,
    pub turnovers: u32,
    pub venue: Venue,
}

/// A completed game assembled from its two box-score lines.
#[derive(Clone, Debug)]
pub struct GameRecord {
    pub game_id: GameId,
    pub season: Season,
    pub lines: [BoxScoreLine; 2],
}

impl GameRecord {
    pub fn neutral_site(&self) -> bool {
        self.lines[0].venue == Venue::Neutral
    }
}

/// One validated game from a single team's perspective, with possession
/// estimates resolved. This is the unit the efficiency calculator and the
/// opponent graph consume.
#[derive(Clone, Debug)]
pub struct TeamGame {
    pub game_id: GameId,
    pub opponent_id: TeamId,
    pub points: f64,
    pub points_allowed: f64,
    /// This team's estimated possessions in the game.
    pub possessions: f64,
    pub opponent_possessions: f64,
    /// Game pace: mean of the two teams' possession estimates.
    pub pace: f64,
    pub venue: Venue,
}

impl TeamGame {
    pub fn point_diff(&self) -> f64 {
        self.points - self.points_allowed
    }

    /// Offensive efficiency in this game alone (points per 100 possessions).
    pub fn game_offense(&self) -> f64 {
        self.points / self.possessions * 100.0
    }

    /// Defensive efficiency in this game alone.
    pub fn game_defense(&self) -> f64 {
        self.points_allowed / self.opponent_possessions * 100.0
    }
}

/// Pair box-score lines into games, rejecting malformed groups.
///
/// Games come back sorted by game id so every downstream aggregation is
/// reproducible regardless of input row order. Rejected records are returned
/// as exclusions, not raised: one bad game must not abort the season.
pub fn pair_games(lines: &[BoxScoreLine]) -> (Vec<GameRecord>, Vec<RatingError>) {
    let mut by_game: BTreeMap<GameId, Vec<&BoxScoreLine>> = BTreeMap::new();
    for line in lines {
        by_game.entry(line.game_id).or_default().push(line);
    }

    let mut games = Vec::with_capacity(by_game.len());
    let mut exclusions = Vec::new();

    for (game_id, group) in by_game {
        if group.len() != 2 {
            let team_id = group.first().map(|l| l.team_id).unwrap_or_default();
            log::warn!(
                "game {game_id}: expected 2 box-score lines, found {} (team {team_id}); dropped",
                group.len()
            );
            exclusions.push(RatingError::DataQuality {
                game_id,
                team_id,
                reason: format!("expected 2 box-score lines, found {}", group.len()),
            });
            continue;
        }

        let (a, b) = (group[0], group[1]);
        if let Err(err) = validate_pair(a, b) {
            log::warn!("game {game_id}: {err}; dropped");
            exclusions.push(err);
            continue;
        }

        games.push(GameRecord {
            game_id,
            season: a.season,
            lines: [a.clone(), b.clone()],
        });
    }

    (games, exclusions)
}

fn validate_pair(a: &BoxScoreLine, b: &BoxScoreLine) -> Result<(), RatingError> {
    if a.team_id == b.team_id {
        return Err(RatingError::DataQuality {
            game_id: a.game_id,
            team_id: a.team_id,
            reason: "team listed on both sides of the game".into(),
        });
    }
    if a.opponent_id != b.team_id || b.opponent_id != a.team_id {
        return Err(RatingError::DataQuality {
            game_id: a.game_id,
            team_id: a.team_id,
            reason: format!(
                "opponent ids do not cross-reference ({} vs {}, {} vs {})",
                a.team_id, a.opponent_id, b.team_id, b.opponent_id
            ),
        });
    }
    if a.season != b.season {
        return Err(RatingError::DataQuality {
            game_id: a.game_id,
            team_id: a.team_id,
            reason: format!("season mismatch between lines ({} vs {})", a.season, b.season),
        });
    }
    Ok(())
}

/// Resolve possession estimates and split each game into its two team-side
/// views. A game is dropped whole if either side's box score is corrupt:
/// pace needs both estimates.
pub fn build_team_games(
    games: &[GameRecord],
    config: &SolverConfig,
) -> (BTreeMap<TeamId, Vec<TeamGame>>, Vec<RatingError>) {
    let mut team_games: BTreeMap<TeamId, Vec<TeamGame>> = BTreeMap::new();
    let mut exclusions = Vec::new();

    for game in games {
        let [a, b] = &game.lines;
        let poss = match (
            estimate_possessions(a, config.ft_possession_coeff),
            estimate_possessions(b, config.ft_possession_coeff),
        ) {
            (Ok(pa), Ok(pb)) => [pa, pb],
            (res_a, res_b) => {
                for err in [res_a.err(), res_b.err()].into_iter().flatten() {
                    log::warn!("{err}; game {} dropped", game.game_id);
                    exclusions.push(err);
                }
                continue;
            }
        };

        let pace = (poss[0] + poss[1]) / 2.0;
        for (this, other) in [(0usize, 1usize), (1, 0)] {
            let line = &game.lines[this];
            let opp = &game.lines[other];
            team_games.entry(line.team_id).or_default().push(TeamGame {
                game_id: game.game_id,
                opponent_id: opp.team_id,
                points: f64::from(line.points),
                points_allowed: f64::from(opp.points),
                possessions: poss[this],
                opponent_possessions: poss[other],
                pace,
                venue: line.venue,
            });
        }
    }

    (team_games, exclusions)
}
