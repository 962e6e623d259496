//! Deterministic memory-two strategies and the analytic checks defined over them.

use std::fmt;

use nalgebra::{SMatrix, SVector};

use crate::action::{Action, C};
use crate::error::AnalysisError;
use crate::graph::DirectedGraph;
use crate::state::State;

/// The default implementation-noise probability used by [`Strategy::is_efficient_default`] and
/// [`Strategy::is_distinguishable_default`], matching the reference implementation.
pub const DEFAULT_EPSILON: f64 = 1e-5;

/// The default stationary-mass threshold used by [`Strategy::is_efficient_default`] and
/// [`Strategy::is_distinguishable_default`].
pub const DEFAULT_THETA: f64 = 0.95;

const NUM_STATES: usize = 16;

/// A deterministic memory-two strategy: a total function from [`State`] to [`Action`], stored as
/// a 16-entry table indexed by [`State::id`].
///
/// A `Strategy` owns its action table and does not reference any other strategy; analyses that
/// need a second player (the stationary-state computation) take that coplayer as an explicit
/// argument.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Strategy {
    actions: [Action; NUM_STATES],
}

impl Strategy {
    /// Construct a strategy directly from its 16-entry action table, indexed by [`State::id`].
    pub fn new(actions: [Action; NUM_STATES]) -> Self {
        Strategy { actions }
    }

    /// Parse a strategy from its 16-character textual form over `{'c', 'd'}`.
    ///
    /// # Panics
    ///
    /// Panics if `s` is not exactly 16 characters drawn from `{'c', 'd'}`.
    pub fn from_str16(s: &str) -> Self {
        let chars: Vec<char> = s.chars().collect();
        assert_eq!(
            chars.len(),
            NUM_STATES,
            "strategy string must be exactly 16 characters, got {:?}",
            s
        );
        let mut actions = [C; NUM_STATES];
        for (i, &c) in chars.iter().enumerate() {
            actions[i] = Action::from_char(c);
        }
        Strategy { actions }
    }

    /// The always-cooperate strategy, `"cccccccccccccccc"`.
    pub fn all_c() -> Self {
        Strategy::new([C; NUM_STATES])
    }

    /// The action this strategy prescribes at the given state.
    pub fn action_at(&self, state: &State) -> Action {
        self.actions[state.id() as usize]
    }

    /// Overwrite the action prescribed at the given state.
    pub fn set_action(&mut self, state: &State, action: Action) {
        self.actions[state.id() as usize] = action;
    }

    /// The two states A's prescribed action (at `current`) could lead to, depending on B's move.
    fn next_possible_states(&self, current: &State) -> [State; 2] {
        let act_a = self.action_at(current);
        [
            current.next_state(act_a, C),
            current.next_state(act_a, Action::Defect),
        ]
    }

    /// Advance the intra-transition graph by one step from `s`: both players play their role in
    /// this same strategy.
    fn next_itg_state(&self, s: &State) -> u8 {
        let move_a = self.action_at(s);
        let move_b = self.action_at(&s.swap_ab());
        s.next_state(move_a, move_b).id()
    }

    /// Build the intra-transition graph (ITG): the 16-node functional graph induced by this
    /// strategy playing itself, with A playing `action_at(s)` and B playing
    /// `action_at(s.swap_ab())` at every state `s`. Every node has out-degree 1.
    pub fn itg(&self) -> DirectedGraph {
        let mut g = DirectedGraph::new(NUM_STATES);
        for i in 0..NUM_STATES as u8 {
            let next = self.next_itg_state(&State::from_id(i));
            g.add_link(i as usize, next as usize);
        }
        g
    }

    /// For every start state, the ID of the unique node on the cycle its ITG orbit enters.
    ///
    /// Walks from each starting state, memoizing destinations across walks so that a walk which
    /// joins a previously traced orbit inherits that orbit's destination without re-walking it.
    pub fn dests_of_itg(&self) -> [u8; NUM_STATES] {
        let mut dests = [0u8; NUM_STATES];
        let mut fixed = [false; NUM_STATES];

        for i in 0..NUM_STATES {
            let mut visited = [false; NUM_STATES];
            visited[i] = true;
            let mut next = self.next_itg_state(&State::from_id(i as u8)) as usize;
            while !visited[next] && !fixed[next] {
                visited[next] = true;
                next = self.next_itg_state(&State::from_id(next as u8)) as usize;
            }
            let destination = if fixed[next] { dests[next] } else { next as u8 };
            for (j, was_visited) in visited.iter().enumerate() {
                if *was_visited {
                    dests[j] = destination;
                    fixed[j] = true;
                }
            }
        }

        dests
    }

    /// Is this strategy defensible — can no opponent sequence of moves drive A's long-run payoff
    /// below B's by more than a bounded transient?
    ///
    /// Builds the 16x16 matrix of relative payoffs along A's two prescribed-action successors at
    /// each state and runs Floyd–Warshall shortest paths, rejecting as soon as any negative-weight
    /// cycle is detected.
    pub fn is_defensible(&self) -> bool {
        const INF: i32 = 32; // strictly greater than any achievable path weight (-16..=16).
        let mut d = [[INF; NUM_STATES]; NUM_STATES];

        for i in 0..NUM_STATES {
            let si = State::from_id(i as u8);
            for successor in self.next_possible_states(&si) {
                let j = successor.id() as usize;
                d[i][j] = si.relative_payoff();
            }
            if d[i][i] < 0 {
                return false;
            }
        }

        for k in 0..NUM_STATES {
            for i in 0..NUM_STATES {
                for j in 0..NUM_STATES {
                    let via = d[i][k] + d[k][j];
                    if via < d[i][j] {
                        d[i][j] = via;
                    }
                }
                if d[i][i] < 0 {
                    return false;
                }
            }
        }

        true
    }

    /// The stationary probability distribution over states under per-action implementation noise
    /// `epsilon`, when this strategy plays `coplayer` (defaulting to itself).
    ///
    /// Solves the overdetermined 17x16 system stacking `(P - I) pi = 0` with the normalization
    /// constraint `1^T pi = 1` via singular value decomposition, nalgebra's rectangular
    /// least-squares solve (`ColPivQR::solve` only accepts square systems).
    pub fn stationary_state(
        &self,
        epsilon: f64,
        coplayer: Option<&Strategy>,
    ) -> Result<[f64; NUM_STATES], AnalysisError> {
        let coplayer = coplayer.unwrap_or(self);

        let mut a = SMatrix::<f64, 17, 16>::zeros();
        for i in 0..NUM_STATES {
            let si = State::from_id(i as u8);
            for j in 0..NUM_STATES {
                let sj = State::from_id(j as u8);
                let act_a = self.action_at(&sj);
                let act_b = coplayer.action_at(&sj.swap_ab());
                let next = sj.next_state(act_a, act_b);
                let d = next.num_diff_in_t1(&si);
                let p = match d {
                    0 => (1.0 - epsilon) * (1.0 - epsilon),
                    1 => (1.0 - epsilon) * epsilon,
                    2 => epsilon * epsilon,
                    _ => 0.0,
                };
                a[(i, j)] = p;
            }
            a[(i, i)] -= 1.0;
        }
        for j in 0..NUM_STATES {
            a[(16, j)] = 1.0;
        }

        let mut b = SVector::<f64, 17>::zeros();
        b[16] = 1.0;

        const SVD_TOLERANCE: f64 = 1e-12;
        let solution = a
            .svd(true, true)
            .solve(&b, SVD_TOLERANCE)
            .map_err(|reason| AnalysisError::SolverDidNotConverge {
                strategy: self.to_string(),
                reason: reason.to_string(),
            })?;

        let mut result = [0.0; NUM_STATES];
        result.copy_from_slice(solution.as_slice());
        Ok(result)
    }

    /// Is this strategy efficient: under noise `epsilon`, does self-play concentrate at least
    /// `theta` stationary mass on mutual cooperation (`State(0)`)?
    pub fn is_efficient(&self, epsilon: f64, theta: f64) -> Result<bool, AnalysisError> {
        Ok(self.stationary_state(epsilon, None)?[0] > theta)
    }

    /// [`Strategy::is_efficient`] at the default noise and threshold.
    pub fn is_efficient_default(&self) -> Result<bool, AnalysisError> {
        self.is_efficient(DEFAULT_EPSILON, DEFAULT_THETA)
    }

    /// Is this strategy distinguishable from AllC: against an always-cooperate coplayer, does
    /// stationary mass at `State(0)` fall *below* `theta`?
    pub fn is_distinguishable(&self, epsilon: f64, theta: f64) -> Result<bool, AnalysisError> {
        let allc = Strategy::all_c();
        Ok(self.stationary_state(epsilon, Some(&allc))?[0] < theta)
    }

    /// [`Strategy::is_distinguishable`] at the default noise and threshold.
    pub fn is_distinguishable_default(&self) -> Result<bool, AnalysisError> {
        self.is_distinguishable(DEFAULT_EPSILON, DEFAULT_THETA)
    }

    /// A noise-free topological surrogate for [`Strategy::is_efficient_default`].
    ///
    /// Rejects immediately unless `action_at(State(0)) == Cooperate`. Otherwise walks the ITG
    /// outward from `State(0)`, repeatedly expanding sink SCCs with single-bit noise edges (on
    /// `a_1` and `b_1`) until every state either can only reach `State(0)` (never back from it) or
    /// a two-way reachability with `State(0)` is found, in which case the strategy is inefficient.
    pub fn is_efficient_topo(&self) -> bool {
        if self.action_at(&State::from_id(0)) != C {
            return false;
        }

        let mut checked = [false; NUM_STATES];
        checked[0] = true;
        let mut gn = self.itg();

        let mut round = 0u32;
        while !all_checked(&checked) {
            if round > 0 {
                expand_with_single_bit_noise(&mut gn);
            }
            for i in 1..NUM_STATES {
                if checked[i] {
                    continue;
                }
                if gn.reachable(i, 0) {
                    if gn.reachable(0, i) {
                        return false;
                    }
                    checked[i] = true;
                }
            }
            round += 1;
        }

        true
    }

    /// The dual topological check against an AllC coplayer, a noise-free surrogate for
    /// [`Strategy::is_distinguishable_default`].
    ///
    /// Accepts (distinguishable) immediately if `action_at(State(0)) != Cooperate`. Otherwise
    /// builds the one-outgoing-edge graph where A plays its prescribed action and B always
    /// cooperates, and applies the same checked/expand loop as
    /// [`Strategy::is_efficient_topo`], returning distinguishable as soon as a two-way
    /// reachability with `State(0)` is found.
    pub fn is_distinguishable_topo(&self) -> bool {
        if self.action_at(&State::from_id(0)) != C {
            return true;
        }

        let mut gn = DirectedGraph::new(NUM_STATES);
        for i in 0..NUM_STATES as u8 {
            let sa = State::from_id(i);
            let act_a = self.action_at(&sa);
            let j = sa.next_state(act_a, C).id();
            gn.add_link(i as usize, j as usize);
        }

        let mut checked = [false; NUM_STATES];
        checked[0] = true;

        let mut round = 0u32;
        while !all_checked(&checked) {
            if round > 0 {
                expand_with_single_bit_noise(&mut gn);
            }
            for i in 1..NUM_STATES {
                if checked[i] {
                    continue;
                }
                if gn.reachable(i, 0) {
                    if gn.reachable(0, i) {
                        return true;
                    }
                    checked[i] = true;
                }
            }
            round += 1;
        }

        false
    }

    /// Check that the topological and numeric formulations of efficiency and distinguishability
    /// agree at the default noise and threshold, per the cross-check contract.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::CrossCheckContradiction`] if they disagree, or propagates a
    /// [`AnalysisError::SolverDidNotConverge`] from the underlying stationary-state solves.
    pub fn assert_cross_check_consistent(&self) -> Result<(), AnalysisError> {
        let numeric_efficient = self.is_efficient_default()?;
        let topo_efficient = self.is_efficient_topo();
        if numeric_efficient != topo_efficient {
            log::error!(
                "efficiency cross-check contradiction for strategy {}",
                self
            );
            return Err(AnalysisError::CrossCheckContradiction {
                strategy: self.to_string(),
                check: "efficiency",
                topological: topo_efficient,
                numeric: numeric_efficient,
            });
        }

        let numeric_distinguishable = self.is_distinguishable_default()?;
        let topo_distinguishable = self.is_distinguishable_topo();
        if numeric_distinguishable != topo_distinguishable {
            log::error!(
                "distinguishability cross-check contradiction for strategy {}",
                self
            );
            return Err(AnalysisError::CrossCheckContradiction {
                strategy: self.to_string(),
                check: "distinguishability",
                topological: topo_distinguishable,
                numeric: numeric_distinguishable,
            });
        }

        Ok(())
    }
}

fn all_checked(checked: &[bool; NUM_STATES]) -> bool {
    checked.iter().all(|&c| c)
}

/// Expand every sink SCC's vertices with the two single-bit noise edges (flipping `b_1` via `^1`
/// and `a_1` via `^4`), modeling one independent noise event in the most recent round.
fn expand_with_single_bit_noise(gn: &mut DirectedGraph) {
    for sink in gn.sink_sccs() {
        for from in sink {
            for to in [from ^ 1, from ^ 4] {
                if !gn.has_link(from, to) {
                    gn.add_link(from, to);
                }
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for action in &self.actions {
            write!(f, "{}", action.to_char())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::D;

    fn wsls() -> Strategy {
        let mut actions = [C; NUM_STATES];
        for (i, slot) in actions.iter_mut().enumerate() {
            *slot = if (i & 1) == ((i >> 2) & 1) { C } else { D };
        }
        Strategy::new(actions)
    }

    fn tf2t() -> Strategy {
        let mut actions = [C; NUM_STATES];
        for (i, slot) in actions.iter_mut().enumerate() {
            *slot = if (i & 3) == 3 { D } else { C };
        }
        Strategy::new(actions)
    }

    #[test]
    fn round_trips_through_string() {
        let s = Strategy::from_str16("ccccddddccccdddd");
        assert_eq!(s.to_string(), "ccccddddccccdddd");
        assert_eq!(s, Strategy::from_str16(&s.to_string()));
        assert_eq!(s.action_at(&State::from_str4("cccc")), C);
        assert_eq!(s.action_at(&State::from_str4("dddd")), D);
    }

    #[test]
    fn set_action_overwrites_table() {
        let mut s = Strategy::all_c();
        s.set_action(&State::from_id(5), D);
        assert_eq!(s.action_at(&State::from_id(5)), D);
        assert_eq!(s.action_at(&State::from_id(0)), C);
    }

    #[test]
    fn alld_scenario() {
        let alld = Strategy::from_str16("dddddddddddddddd");
        assert!(alld.is_defensible());
        assert!(!alld.is_efficient_default().unwrap());
        assert!(!alld.is_efficient_topo());
        assert_eq!(alld.dests_of_itg(), [15; 16]);

        let stat = alld.stationary_state(0.001, None).unwrap();
        for (i, mass) in stat.iter().enumerate() {
            if i == 15 {
                assert!(*mass > 0.99);
            } else {
                assert!(*mass < 0.01);
            }
        }

        assert!(alld.is_distinguishable_default().unwrap());
        assert!(alld.is_distinguishable_topo());
    }

    #[test]
    fn allc_scenario() {
        let allc = Strategy::all_c();
        assert!(!allc.is_defensible());
        assert!(allc.is_efficient_default().unwrap());
        assert!(allc.is_efficient_topo());
        assert_eq!(allc.dests_of_itg(), [0; 16]);

        let stat = allc.stationary_state(0.001, None).unwrap();
        for (i, mass) in stat.iter().enumerate() {
            if i == 0 {
                assert!(*mass > 0.99);
            } else {
                assert!(*mass < 0.01);
            }
        }

        assert!(!allc.is_distinguishable_default().unwrap());
        assert!(!allc.is_distinguishable_topo());
    }

    #[test]
    fn tit_for_tat_scenario() {
        let tft = Strategy::from_str16("cdcdcdcdcdcdcdcd");
        assert!(tft.is_defensible());
        assert!(!tft.is_efficient_default().unwrap());
        assert!(!tft.is_efficient_topo());

        let allowed = [0u8, 6, 9, 15];
        for dest in tft.dests_of_itg() {
            assert!(allowed.contains(&dest));
        }

        let stat = tft.stationary_state(0.001, None).unwrap();
        for i in allowed {
            assert!((stat[i as usize] - 0.25).abs() < 0.01);
        }

        assert!(!tft.is_distinguishable_default().unwrap());
        assert!(!tft.is_distinguishable_topo());
    }

    #[test]
    fn win_stay_lose_shift_scenario() {
        let wsls = wsls();
        assert!(!wsls.is_defensible());
        assert!(wsls.is_efficient_default().unwrap());
        assert!(wsls.is_efficient_topo());
        assert_eq!(wsls.dests_of_itg(), [0; 16]);

        let stat = wsls.stationary_state(0.001, None).unwrap();
        assert!(stat[0] > 0.99);

        assert!(wsls.is_distinguishable_default().unwrap());
        assert!(wsls.is_distinguishable_topo());
    }

    #[test]
    fn tit_for_two_tats_scenario() {
        let tf2t = tf2t();
        assert!(!tf2t.is_defensible());
        assert!(tf2t.is_efficient_default().unwrap());
        assert!(tf2t.is_efficient_topo());

        let allowed = [0u8, 15];
        for dest in tf2t.dests_of_itg() {
            assert!(allowed.contains(&dest));
        }

        let stat = tf2t.stationary_state(0.001, None).unwrap();
        assert!(stat[0] > 0.99);

        assert!(!tf2t.is_distinguishable_default().unwrap());
        assert!(!tf2t.is_distinguishable_topo());
    }

    #[test]
    fn tft_atft_scenario() {
        let tft_atft = Strategy::from_str16("cdcddccdcdccdccd");
        assert!(tft_atft.is_defensible());
        assert!(tft_atft.is_efficient_default().unwrap());
        assert!(tft_atft.is_distinguishable_default().unwrap());
        assert!(tft_atft.is_distinguishable_topo());
    }

    #[test]
    fn cross_check_agrees_on_named_scenarios() {
        for strategy in [
            Strategy::from_str16("dddddddddddddddd"),
            Strategy::all_c(),
            Strategy::from_str16("cdcdcdcdcdcdcdcd"),
            wsls(),
            tf2t(),
            Strategy::from_str16("cdcddccdcdccdccd"),
        ] {
            strategy.assert_cross_check_consistent().unwrap();
        }
    }
}
