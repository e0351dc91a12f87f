use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::config::SolverConfig;
use crate::constants::{AVG_EFFICIENCY, GAME_WEIGHT_MAX, GAME_WEIGHT_MIN};
use crate::efficiency::{season_efficiency, RawEfficiency};
use crate::error::RatingError;
use crate::game::{build_team_games, pair_games, BoxScoreLine, TeamId};
use crate::graph::OpponentGraph;
use crate::rating::{SeasonRatings, TeamRating};

/// One team's mutable rating state at some iteration.
#[derive(Clone, Copy, Debug)]
pub struct TeamState {
    pub off: f64,
    pub def: f64,
    pub opp_adj: f64,
    pub pace_adj: f64,
}

impl TeamState {
    pub fn relative(&self) -> f64 {
        self.off - self.def
    }
}

/// A graph edge with opponent ids resolved to dense indices, precomputed
/// once so the per-iteration update touches no maps.
#[derive(Clone, Copy, Debug)]
struct GameView {
    opp: usize,
    point_diff: f64,
    pace_diff: f64,
    game_offense: f64,
    game_defense: f64,
    possessions: f64,
    opponent_possessions: f64,
}

/// Result of a fixed-point solve, before composition into `SeasonRatings`.
#[derive(Clone, Debug)]
pub struct SolveOutcome {
    pub states: Vec<TeamState>,
    pub iterations: u32,
    pub converged: bool,
    pub delta_history: Vec<f64>,
}

/// Jacobi fixed-point solver over one season's opponent graph.
///
/// Every iteration reads a frozen snapshot of all teams' states and writes
/// a fresh one, so per-team updates are order-independent and run in
/// parallel; iterations themselves are strictly sequential. After each
/// write the whole state is re-centered on the league anchor, which pins
/// the zero point the two regression coefficients would otherwise drift
/// around.
pub struct SeasonSolver<'a> {
    config: &'a SolverConfig,
    teams: Vec<TeamId>,
    raw: Vec<RawEfficiency>,
    games: Vec<Vec<GameView>>,
    league_pace: f64,
}

impl<'a> SeasonSolver<'a> {
    pub fn new(
        graph: &OpponentGraph,
        efficiencies: &BTreeMap<TeamId, RawEfficiency>,
        config: &'a SolverConfig,
    ) -> Self {
        let teams: Vec<TeamId> = graph.teams().collect();
        let index: BTreeMap<TeamId, usize> =
            teams.iter().enumerate().map(|(i, &t)| (t, i)).collect();

        let raw: Vec<RawEfficiency> = teams.iter().map(|t| efficiencies[t]).collect();
        let games: Vec<Vec<GameView>> = teams
            .iter()
            .map(|&t| {
                graph
                    .edges(t)
                    .iter()
                    .map(|e| GameView {
                        opp: index[&e.opponent],
                        point_diff: e.point_diff,
                        pace_diff: e.pace_diff,
                        game_offense: e.game_offense(),
                        game_defense: e.game_defense(),
                        possessions: e.possessions,
                        opponent_possessions: e.opponent_possessions,
                    })
                    .collect()
            })
            .collect();

        SeasonSolver {
            config,
            teams,
            raw,
            games,
            league_pace: graph.league_pace(),
        }
    }

    pub fn team_ids(&self) -> &[TeamId] {
        &self.teams
    }

    pub fn solve(&self) -> SolveOutcome {
        self.solve_with_cancel(None)
    }

    /// Run the fixed-point iteration. The cancellation flag is sampled only
    /// at the iteration barrier, never mid-update, so a cancelled solve
    /// still returns an internally consistent best-so-far state.
    pub fn solve_with_cancel(&self, cancel: Option<&AtomicBool>) -> SolveOutcome {
        let n = self.teams.len();
        let mut state: Vec<TeamState> = self
            .raw
            .iter()
            .map(|r| TeamState {
                off: r.offensive,
                def: r.defensive,
                opp_adj: 0.0,
                pace_adj: 0.0,
            })
            .collect();
        self.recenter(&mut state);

        let mut delta_history = Vec::new();
        let mut iterations = 0;
        let mut converged = n == 0;

        for _ in 0..self.config.max_iterations {
            if converged {
                break;
            }
            if let Some(flag) = cancel {
                if flag.load(Ordering::Relaxed) {
                    log::info!("solve cancelled at iteration {iterations}; returning best-so-far");
                    break;
                }
            }

            let overall_mean = self.weighted_overall_mean(&state);
            let mut next: Vec<TeamState> = (0..n)
                .into_par_iter()
                .map(|i| self.update_team(i, &state, overall_mean))
                .collect();
            self.recenter(&mut next);

            let delta = state
                .iter()
                .zip(&next)
                .map(|(a, b)| (a.relative() - b.relative()).abs())
                .fold(0.0, f64::max);
            delta_history.push(delta);

            state = next;
            iterations += 1;
            converged = delta < self.config.convergence_tolerance;
        }

        SolveOutcome {
            states: state,
            iterations,
            converged,
            delta_history,
        }
    }

    /// Synchronous per-team update: reads only the iteration-k snapshot.
    fn update_team(&self, i: usize, prev: &[TeamState], overall_mean: f64) -> TeamState {
        let games = &self.games[i];
        if games.is_empty() {
            // All of this team's opponents were excluded; nothing to adjust
            // against, so its state carries through unchanged.
            return TeamState {
                opp_adj: 0.0,
                pace_adj: 0.0,
                ..prev[i]
            };
        }

        let me = prev[i];
        let mut strength_resid = Vec::with_capacity(games.len());
        let mut pace_resid = Vec::with_capacity(games.len());
        for g in games {
            let opp = prev[g.opp];
            // Expected margin against this opponent at league-average pace.
            let expected =
                ((me.off + opp.def) - (opp.off + me.def)) * self.league_pace / 100.0;
            let residual = g.point_diff - expected;
            strength_resid.push((opp.relative() - overall_mean, residual));
            pace_resid.push((g.pace_diff, residual));
        }
        let opp_adj = ols_slope(&strength_resid);
        let pace_adj = ols_slope(&pace_resid);

        // Re-derive pooled efficiencies with each game normalized by what the
        // opponent typically allows/scores and reweighted by the previous
        // iteration's opponent-strength coefficient (Jacobi lag: never the
        // coefficient computed just above).
        let mut off_num = 0.0;
        let mut off_den = 0.0;
        let mut def_num = 0.0;
        let mut def_den = 0.0;
        for g in games {
            let opp = prev[g.opp];
            let strength = opp.relative() - overall_mean;
            let w = (1.0 + me.opp_adj * strength).clamp(GAME_WEIGHT_MIN, GAME_WEIGHT_MAX);
            let adj_off = g.game_offense - (opp.def - AVG_EFFICIENCY);
            let adj_def = g.game_defense - (opp.off - AVG_EFFICIENCY);
            off_num += w * g.possessions * adj_off;
            off_den += w * g.possessions;
            def_num += w * g.opponent_possessions * adj_def;
            def_den += w * g.opponent_possessions;
        }

        TeamState {
            off: off_num / off_den,
            def: def_num / def_den,
            opp_adj,
            pace_adj,
        }
    }

    /// Shift all offenses and all defenses so their possession-weighted
    /// league averages sit exactly on the anchor. Without this the system
    /// has no fixed zero point and drifts as a whole.
    fn recenter(&self, states: &mut [TeamState]) {
        let total: f64 = self.raw.iter().map(|r| r.possessions).sum();
        if total <= 0.0 {
            return;
        }
        let mut off_mean = 0.0;
        let mut def_mean = 0.0;
        for (s, r) in states.iter().zip(&self.raw) {
            off_mean += s.off * r.possessions / total;
            def_mean += s.def * r.possessions / total;
        }
        for s in states.iter_mut() {
            s.off += AVG_EFFICIENCY - off_mean;
            s.def += AVG_EFFICIENCY - def_mean;
        }
    }

    fn weighted_overall_mean(&self, states: &[TeamState]) -> f64 {
        let total: f64 = self.raw.iter().map(|r| r.possessions).sum();
        if total <= 0.0 {
            return 0.0;
        }
        states
            .iter()
            .zip(&self.raw)
            .map(|(s, r)| s.relative() * r.possessions / total)
            .sum()
    }
}

/// Closed-form OLS slope of y on x. Degenerate regressors (fewer than two
/// points, or zero variance) yield a zero slope rather than a NaN that
/// would poison the whole state vector.
fn ols_slope(pairs: &[(f64, f64)]) -> f64 {
    if pairs.len() < 2 {
        return 0.0;
    }
    let n = pairs.len() as f64;
    let x_mean = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let y_mean = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var = 0.0;
    for (x, y) in pairs {
        cov += (x - x_mean) * (y - y_mean);
        var += (x - x_mean) * (x - x_mean);
    }
    if var < 1e-9 {
        0.0
    } else {
        cov / var
    }
}

/// Solve one season end to end: pair and validate the box-score table,
/// aggregate raw efficiencies, build the opponent graph, run the solver,
/// and freeze the result.
///
/// Data-quality and insufficient-data drops are local (logged and carried
/// in the output's exclusion list); only a season with too few valid games
/// overall is fatal.
pub fn solve_season(
    lines: &[BoxScoreLine],
    config: &SolverConfig,
) -> Result<SeasonRatings, RatingError> {
    solve_season_with_cancel(lines, config, None)
}

pub fn solve_season_with_cancel(
    lines: &[BoxScoreLine],
    config: &SolverConfig,
    cancel: Option<&AtomicBool>,
) -> Result<SeasonRatings, RatingError> {
    let season = lines.first().map(|l| l.season).unwrap_or_default();

    let (games, mut exclusions) = pair_games(lines);
    let (team_games, drops) = build_team_games(&games, config);
    exclusions.extend(drops);

    let valid_games = team_games.values().map(|v| v.len() as u32).sum::<u32>() / 2;
    if valid_games < config.min_season_games {
        return Err(RatingError::SeasonTooSparse {
            season,
            valid_games,
            required: config.min_season_games,
        });
    }

    let mut efficiencies = BTreeMap::new();
    for (&team, games) in &team_games {
        match season_efficiency(team, games, config.min_games) {
            Ok(eff) => {
                efficiencies.insert(team, eff);
            }
            Err(err) => {
                log::warn!("{err}; excluded from season {season}");
                exclusions.push(err);
            }
        }
    }

    let graph = OpponentGraph::build(&team_games, &efficiencies);
    let solver = SeasonSolver::new(&graph, &efficiencies, config);
    let outcome = solver.solve_with_cancel(cancel);

    if !outcome.converged {
        log::warn!(
            "season {season}: stopped after {} iterations without convergence \
             (last delta {:.4}); ratings are best-so-far",
            outcome.iterations,
            outcome.delta_history.last().copied().unwrap_or(f64::NAN),
        );
    }

    let mut ratings = BTreeMap::new();
    for (i, &team_id) in solver.team_ids().iter().enumerate() {
        let raw = &efficiencies[&team_id];
        let s = outcome.states[i];
        ratings.insert(
            team_id,
            TeamRating {
                team_id,
                season,
                raw_offense: raw.offensive,
                raw_defense: raw.defensive,
                adjusted_offense: s.off,
                adjusted_defense: s.def,
                opponent_strength_adjustment: s.opp_adj,
                pace_adjustment: s.pace_adj,
                tempo: raw.tempo,
                possessions: raw.possessions,
                games: raw.games,
            },
        );
    }

    Ok(SeasonRatings {
        season,
        ratings,
        iterations: outcome.iterations,
        converged: outcome.converged,
        delta_history: outcome.delta_history,
        exclusions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::test_support::game_lines;
    use crate::game::GameId;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_config() -> SolverConfig {
        SolverConfig {
            min_season_games: 4,
            ..SolverConfig::default()
        }
    }

    /// The four-team round robin: A beats B by 10 at home, B beats C by 5
    /// neutral, C beats D by 20 at home, D beats A by 2 neutral, A beats C
    /// by 15 neutral, B beats D by 8 at home.
    fn four_team_lines(ids: [TeamId; 4]) -> Vec<BoxScoreLine> {
        let [a, b, c, d] = ids;
        let mut lines = Vec::new();
        lines.extend(game_lines(1, 2024, a, b, 75, 65, 66, 66, false));
        lines.extend(game_lines(2, 2024, b, c, 70, 65, 64, 64, true));
        lines.extend(game_lines(3, 2024, c, d, 85, 65, 70, 70, false));
        lines.extend(game_lines(4, 2024, d, a, 72, 70, 68, 68, true));
        lines.extend(game_lines(5, 2024, a, c, 80, 65, 67, 67, true));
        lines.extend(game_lines(6, 2024, b, d, 78, 70, 69, 69, false));
        lines
    }

    /// Single round robin among ten teams of graded strength, with paces
    /// that vary by matchup.
    fn round_robin_lines(n: u32) -> Vec<BoxScoreLine> {
        let mut lines = Vec::new();
        let mut game_id: GameId = 1;
        for i in 0..n {
            for j in (i + 1)..n {
                let pts_i = 76 + 2 * i;
                let pts_j = 75 + 2 * j;
                let poss = 64 + (i + j) % 8;
                lines.extend(game_lines(
                    game_id,
                    2024,
                    100 + i,
                    100 + j,
                    pts_i,
                    pts_j,
                    poss,
                    poss,
                    true,
                ));
                game_id += 1;
            }
        }
        lines
    }

    #[test]
    fn test_end_to_end_four_teams() {
        let [a, _b, _c, d] = [1, 2, 3, 4];
        let season = solve_season(&four_team_lines([1, 2, 3, 4]), &test_config()).unwrap();

        assert!(season.converged, "round robin must converge within the cap");
        assert!(season.iterations <= 25);
        assert_eq!(season.ratings.len(), 4);
        assert!(season.exclusions.is_empty());

        let rel_a = season.get(a).unwrap().relative_rating();
        let rel_d = season.get(d).unwrap().relative_rating();
        assert!(
            rel_a > rel_d,
            "A beat the field convincingly, D mostly lost: {rel_a} vs {rel_d}"
        );
    }

    #[test]
    fn test_relabeling_preserves_order() {
        let forward = solve_season(&four_team_lines([1, 2, 3, 4]), &test_config()).unwrap();
        // Same schedule with ids reversed: team 1's games now belong to 4.
        let reversed = solve_season(&four_team_lines([4, 3, 2, 1]), &test_config()).unwrap();

        let order_fwd: Vec<TeamId> = forward.rankings().iter().map(|r| r.team_id).collect();
        let order_rev: Vec<TeamId> =
            reversed.rankings().iter().map(|r| 5 - r.team_id).collect();
        assert_eq!(order_fwd, order_rev);
    }

    #[test]
    fn test_determinism_under_shuffled_input() {
        let mut lines = round_robin_lines(10);
        let baseline = solve_season(&lines, &test_config()).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..5 {
            lines.shuffle(&mut rng);
            let shuffled = solve_season(&lines, &test_config()).unwrap();
            assert_eq!(shuffled.iterations, baseline.iterations);
            for (team, rating) in &baseline.ratings {
                let other = shuffled.get(*team).unwrap();
                assert!(
                    (rating.relative_rating() - other.relative_rating()).abs() < 1e-9,
                    "team {team} rating changed under input reordering"
                );
                assert!(
                    (rating.opponent_strength_adjustment - other.opponent_strength_adjustment)
                        .abs()
                        < 1e-9
                );
                assert!((rating.pace_adjustment - other.pace_adjustment).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_recentering_invariant() {
        let season = solve_season(&round_robin_lines(10), &test_config()).unwrap();

        let total: f64 = season.ratings.values().map(|r| r.possessions).sum();
        let off_mean: f64 = season
            .ratings
            .values()
            .map(|r| r.adjusted_offense * r.possessions / total)
            .sum();
        let def_mean: f64 = season
            .ratings
            .values()
            .map(|r| r.adjusted_defense * r.possessions / total)
            .sum();

        assert!((off_mean - AVG_EFFICIENCY).abs() < 1e-9);
        assert!((def_mean - AVG_EFFICIENCY).abs() < 1e-9);
    }

    #[test]
    fn test_soft_monotonic_convergence() {
        let season = solve_season(&round_robin_lines(10), &test_config()).unwrap();
        assert!(season.converged);
        assert!(season.delta_history.len() >= 3);

        // A well-connected graph should not oscillate once the transient
        // from the raw initialization dies out.
        for pair in season.delta_history.windows(2).skip(2) {
            assert!(
                pair[1] <= pair[0] + 1e-9,
                "delta increased late in the solve: {:?}",
                season.delta_history
            );
        }
    }

    #[test]
    fn test_insufficient_data_team_excluded() {
        let mut lines = four_team_lines([1, 2, 3, 4]);
        // Team 9 plays only two games: one short of the default minimum.
        lines.extend(game_lines(7, 2024, 9, 1, 70, 75, 66, 66, false));
        lines.extend(game_lines(8, 2024, 9, 2, 68, 74, 66, 66, false));

        let season = solve_season(&lines, &test_config()).unwrap();
        assert!(season.get(9).is_none());
        assert!(season.exclusions.contains(&RatingError::InsufficientData {
            team_id: 9,
            games: 2,
            required: 3,
        }));
        // The other four all meet the minimum and keep their ratings.
        assert_eq!(season.ratings.len(), 4);
    }

    #[test]
    fn test_iteration_cap_yields_best_so_far() {
        let config = SolverConfig {
            max_iterations: 1,
            convergence_tolerance: 1e-12,
            min_season_games: 4,
            ..SolverConfig::default()
        };
        let season = solve_season(&four_team_lines([1, 2, 3, 4]), &config).unwrap();
        assert!(!season.converged);
        assert_eq!(season.iterations, 1);
        assert_eq!(season.ratings.len(), 4);
        assert!(season.ratings.values().all(|r| r.relative_rating().is_finite()));
    }

    #[test]
    fn test_sparse_season_is_fatal() {
        let err = solve_season(&four_team_lines([1, 2, 3, 4]), &SolverConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            RatingError::SeasonTooSparse { season: 2024, valid_games: 6, required: 50 }
        );
    }

    #[test]
    fn test_cancel_between_iterations() {
        let cancel = AtomicBool::new(true);
        let season =
            solve_season_with_cancel(&four_team_lines([1, 2, 3, 4]), &test_config(), Some(&cancel))
                .unwrap();
        assert!(!season.converged);
        assert_eq!(season.iterations, 0);
        // Best-so-far state is the re-centered raw initialization.
        assert_eq!(season.ratings.len(), 4);
    }

    #[test]
    fn test_ols_slope() {
        // y = 2x + 1 exactly.
        let pairs = [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)];
        assert!((ols_slope(&pairs) - 2.0).abs() < 1e-12);

        // Constant regressor: no usable signal.
        let flat = [(3.0, 1.0), (3.0, 9.0)];
        assert_eq!(ols_slope(&flat), 0.0);
        assert_eq!(ols_slope(&[(1.0, 1.0)]), 0.0);
    }

    #[test]
    fn test_stronger_opponents_raise_adjusted_rating() {
        // Two teams with identical raw numbers, but team 201 earned them
        // against the strong half of the league and 202 against the weak
        // half. Adjustment must separate them.
        let mut lines = round_robin_lines(8); // teams 100..107, graded weak to strong
        let mut game_id = 1000;
        for opp in [104, 105, 106] {
            lines.extend(game_lines(game_id, 2024, 201, opp, 72, 70, 66, 66, true));
            game_id += 1;
        }
        for opp in [100, 101, 102] {
            lines.extend(game_lines(game_id, 2024, 202, opp, 72, 70, 66, 66, true));
            game_id += 1;
        }

        let season = solve_season(&lines, &test_config()).unwrap();
        let strong_sched = season.get(201).unwrap().relative_rating();
        let weak_sched = season.get(202).unwrap().relative_rating();
        assert!(
            strong_sched > weak_sched,
            "same results against stronger opponents must rate higher: \
             {strong_sched} vs {weak_sched}"
        );
    }
}
