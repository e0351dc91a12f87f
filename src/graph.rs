use std::collections::BTreeMap;

use crate::efficiency::RawEfficiency;
use crate::game::{TeamGame, TeamId, Venue};

/// One game from one team's perspective, joined with opponent context.
///
/// Each game contributes two edges (A's view of B, B's view of A); the data
/// is symmetric but the context carried on each edge is not.
#[derive(Clone, Debug)]
pub struct OpponentEdge {
    pub opponent: TeamId,
    /// The opponent's season raw defensive efficiency: the backdrop against
    /// which this team's offensive showing in the game is judged.
    pub opponent_raw_defense: f64,
    /// Actual margin from this team's perspective (negative = a loss).
    pub point_diff: f64,
    pub pace: f64,
    /// Game pace minus this team's season-average pace.
    pub pace_diff: f64,
    pub points: f64,
    pub points_allowed: f64,
    pub possessions: f64,
    pub opponent_possessions: f64,
    pub venue: Venue,
}

impl OpponentEdge {
    pub fn game_offense(&self) -> f64 {
        self.points / self.possessions * 100.0
    }

    pub fn game_defense(&self) -> f64 {
        self.points_allowed / self.opponent_possessions * 100.0
    }
}

/// Adjacency list over one season's rateable teams.
///
/// Rebuilt from scratch for every solve; there is no persistence and no
/// incremental update. Construction is O(games). Edges to teams that were
/// excluded for insufficient data are dropped with the team: an unrated
/// opponent provides no usable context.
#[derive(Clone, Debug, Default)]
pub struct OpponentGraph {
    adjacency: BTreeMap<TeamId, Vec<OpponentEdge>>,
    games: u32,
}

impl OpponentGraph {
    pub fn build(
        team_games: &BTreeMap<TeamId, Vec<TeamGame>>,
        efficiencies: &BTreeMap<TeamId, RawEfficiency>,
    ) -> Self {
        let mut adjacency: BTreeMap<TeamId, Vec<OpponentEdge>> = BTreeMap::new();
        let mut edges = 0u32;

        for (&team_id, games) in team_games {
            let Some(eff) = efficiencies.get(&team_id) else {
                continue;
            };
            let edge_list: Vec<OpponentEdge> = games
                .iter()
                .filter_map(|g| {
                    let opp = efficiencies.get(&g.opponent_id)?;
                    Some(OpponentEdge {
                        opponent: g.opponent_id,
                        opponent_raw_defense: opp.defensive,
                        point_diff: g.point_diff(),
                        pace: g.pace,
                        pace_diff: g.pace - eff.tempo,
                        points: g.points,
                        points_allowed: g.points_allowed,
                        possessions: g.possessions,
                        opponent_possessions: g.opponent_possessions,
                        venue: g.venue,
                    })
                })
                .collect();
            edges += edge_list.len() as u32;
            adjacency.insert(team_id, edge_list);
        }

        OpponentGraph { adjacency, games: edges / 2 }
    }

    pub fn edges(&self, team: TeamId) -> &[OpponentEdge] {
        self.adjacency.get(&team).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Team ids in ascending order; the solver's dense index follows this.
    pub fn teams(&self) -> impl Iterator<Item = TeamId> + '_ {
        self.adjacency.keys().copied()
    }

    pub fn team_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn game_count(&self) -> u32 {
        self.games
    }

    /// Mean pace across all edges. Every game appears twice with the same
    /// pace, so this equals the per-game mean.
    pub fn league_pace(&self) -> f64 {
        let (sum, n) = self
            .adjacency
            .values()
            .flatten()
            .fold((0.0, 0u32), |(s, n), e| (s + e.pace, n + 1));
        if n == 0 {
            crate::constants::AVG_TEMPO
        } else {
            sum / f64::from(n)
        }
    }
}
