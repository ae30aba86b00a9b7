//! Per-thread simulation state machine: generates in-tree candidate moves,
//! drives the playout policy, detects terminal positions and heuristic
//! cutoffs, and converts scores into the win probabilities consumed by the
//! tree-search driver.

use std::sync::Arc;

use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::board::{Board, Color, Move};
use crate::policy::PlayoutPolicy;
use crate::safety::SafetyInfo;
use crate::score::{score_end_position, tromp_taylor_score, Owner};
use crate::stats::Statistics;

/// Heuristic parameters of the simulation engine.
#[derive(Clone, Copy, Debug)]
pub struct SimulationParams {
    /// Count a playout early as a win or loss once the stone difference on
    /// the board exceeds `mercy_threshold` of the board area.
    pub mercy_rule: bool,

    /// Fraction of the board area at which the mercy rule triggers.
    pub mercy_threshold: f32,

    /// Accumulate per-point ownership probabilities of terminal positions.
    pub territory_statistics: bool,

    /// Magnitude of the score-based result shaping. The plain win/loss
    /// result (1/0) is moved toward the middle by this amount and the score,
    /// normalized by the maximum score reachable on the board, is folded
    /// back in. This makes won and lost games still prefer moves that
    /// maximize the margin. Zero disables the shaping entirely.
    pub score_modification: f32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        SimulationParams {
            mercy_rule: true,
            mercy_threshold: 0.3,
            territory_statistics: false,
            score_modification: 0.02,
        }
    }
}

/// Maps a score (from the perspective of the side to move) into a win
/// probability in (0,1), shaded by the margin.
fn score_to_eval(score: f32, score_modification: f32, inv_max_score: f32) -> f32 {
    if score > 0.0 {
        (1.0 - score_modification) + score_modification * score * inv_max_score
    } else {
        score_modification + score_modification * score * inv_max_score
    }
}

/// Per-thread simulation state. Exactly one worker thread owns a state, its
/// working board, its policy, and its random source for the state's entire
/// lifetime; the only shared data (`SimulationParams`, `SafetyInfo`, the
/// root board) is read-only for the duration of the search.
pub struct SimulationState<P: PlayoutPolicy> {
    thread_id: usize,
    root: Arc<Board>,
    board: Board,
    params: Arc<SimulationParams>,
    safety: Arc<SafetyInfo>,

    in_playout: bool,
    mercy_triggered: bool,
    mercy_result: f32,
    mercy_threshold: i32,
    /// Difference of stones on the board, Black counting positive. Only
    /// maintained during the playout phase.
    stone_diff: i32,
    /// Passes played in a row in the playout phase, capped at 2.
    pass_moves_playout_phase: u32,
    /// Board move number at the root of the search.
    initial_move_number: usize,
    /// Inverse of the maximum score reachable on the current board size.
    inv_max_score: f32,

    territory: Vec<Statistics>,
    ownership_buf: Vec<Owner>,
    rng: Xoshiro256PlusPlus,
    policy: P,
}

impl<P: PlayoutPolicy> SimulationState<P> {
    /// Builds a fully wired state: board snapshot, shared parameters and
    /// safety data, and the policy, assembled in one step.
    pub fn new(
        thread_id: usize,
        root: Arc<Board>,
        params: Arc<SimulationParams>,
        safety: Arc<SafetyInfo>,
        policy: P,
        seed: u64,
    ) -> Self {
        let board = (*root).clone();
        let area = board.area();
        let mut state = SimulationState {
            thread_id,
            root,
            board,
            params,
            safety,
            in_playout: false,
            mercy_triggered: false,
            mercy_result: 0.0,
            mercy_threshold: 0,
            stone_diff: 0,
            pass_moves_playout_phase: 0,
            initial_move_number: 0,
            inv_max_score: 1.0,
            territory: vec![Statistics::new(); area],
            ownership_buf: Vec::new(),
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            policy,
        };
        state.start_search();
        state
    }

    pub fn thread_id(&self) -> usize {
        self.thread_id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Per-point ownership statistics accumulated over the terminal
    /// positions this thread evaluated. Meaningful only when territory
    /// statistics are enabled.
    pub fn territory_statistics(&self) -> &[Statistics] {
        &self.territory
    }

    /// Called once per search. Recomputes the size-derived constants so a
    /// board-size change between searches can never leave them stale, and
    /// clears the territory accumulators.
    pub fn start_search(&mut self) {
        let bd = &*self.root;
        let max_score = bd.area() as f32 + bd.rules().komi;
        self.inv_max_score = 1.0 / max_score;
        self.initial_move_number = bd.move_number();
        if self.params.territory_statistics {
            for s in &mut self.territory {
                s.clear();
            }
        }
    }

    /// Called when a new simulated game starts from the root. Resets the
    /// working board to the root position and the per-game counters.
    pub fn game_start(&mut self) {
        self.board.clone_from(&self.root);
        self.in_playout = false;
        self.pass_moves_playout_phase = 0;
        self.mercy_triggered = false;
        self.mercy_result = 0.0;
        self.mercy_threshold = (self.params.mercy_threshold * self.board.area() as f32) as i32;
    }

    /// In-tree candidate generation. Fills `moves` with every empty point
    /// that is not a simple eye for the side to move, not proven safe, and
    /// legal, followed by a pass; one random non-pass candidate is swapped
    /// to the front to undo the corner bias of board iteration order. An
    /// empty result means the position is terminal and should be evaluated.
    pub fn generate_all_moves(&mut self, moves: &mut Vec<Move>) {
        debug_assert!(!self.in_playout);
        debug_assert!(!self.board.rules().allow_suicide);
        moves.clear();
        let bd = &self.board;

        if bd.two_passes() {
            // A double pass is only trusted as a terminal position if the
            // rules capture dead stones before scoring, or if both passes
            // happened inside the search sequence. Otherwise play goes on,
            // so a pass that is only good under area scoring does not get
            // rewarded.
            if bd.rules().capture_dead || bd.move_number() >= self.initial_move_number + 2 {
                return;
            }
        }

        let to_play = bd.to_play();
        for p in bd.all_points() {
            if bd.is_empty(p)
                && !bd.is_simple_eye(p, to_play)
                && !self.safety.all_safe.contains(p)
                && bd.is_legal(p, to_play)
            {
                moves.push(Move::Play(p));
            }
        }
        // Full shuffling is not worth the cost; one random front swap is
        // enough to keep the first candidate from always being a corner.
        if moves.len() > 1 {
            let i = self.rng.random_range(0..moves.len());
            moves.swap(0, i);
        }
        moves.push(Move::Pass);
    }

    /// Applies an in-tree move.
    pub fn execute(&mut self, mv: Move) {
        debug_assert!(!self.in_playout);
        self.board.play_unchecked(mv);
    }

    /// Enters the playout phase. The stone differential is recomputed from
    /// the board's stone counts rather than maintained across phases, so it
    /// cannot drift.
    pub fn start_playout(&mut self) {
        self.in_playout = true;
        self.pass_moves_playout_phase = 0;
        self.mercy_triggered = false;
        self.stone_diff =
            self.board.stones(Color::Black) as i32 - self.board.stones(Color::White) as i32;
        self.policy.start_playout(&self.board);
    }

    /// Generates the next playout move, or `None` when the simulated game
    /// is over (mercy cutoff, or a pass after two passes were already
    /// recorded). Sets `skip_rave` for passes, which carry no positional
    /// signal for move-value statistics.
    pub fn generate_playout_move(&mut self, skip_rave: &mut bool) -> Option<Move> {
        debug_assert!(self.in_playout);
        if self.params.mercy_rule && self.check_mercy_rule() {
            return None;
        }
        let mv = self.policy.generate_move(&self.board);
        #[cfg(debug_assertions)]
        self.check_policy_contract(mv);
        if mv.is_pass() {
            *skip_rave = true;
            if self.pass_moves_playout_phase < 2 {
                self.pass_moves_playout_phase += 1;
            } else {
                return None;
            }
        } else {
            self.pass_moves_playout_phase = 0;
        }
        Some(mv)
    }

    /// Applies a playout move and maintains the stone differential. The
    /// side to move has already flipped when this updates, so captures are
    /// subtracted when Black is next to move (White just captured black
    /// stones) and added otherwise.
    pub fn execute_playout(&mut self, mv: Move) {
        debug_assert!(self.in_playout);
        self.board.play_unchecked(mv);
        let captured = self.board.captured_by_last_move() as i32;
        if self.board.to_play() == Color::Black {
            self.stone_diff -= captured;
        } else {
            self.stone_diff += captured;
        }
        self.policy.on_play(&self.board);
    }

    /// Leaves the playout phase.
    pub fn end_playout(&mut self) {
        self.in_playout = false;
        self.policy.end_playout();
    }

    /// Evaluates the current position as a win probability in [0,1] for the
    /// side to move. A mercy cutoff short-circuits to the latched result;
    /// otherwise the position is scored with Tromp-Taylor while fewer than
    /// two in-sequence passes occurred, and with the safety-aware end
    /// scorer after a genuine double pass.
    pub fn evaluate(&mut self) -> f32 {
        if self.params.mercy_rule && self.mercy_triggered {
            return self.mercy_result;
        }
        let komi = self.board.rules().komi;
        let want_territory = self.params.territory_statistics;
        let ownership = if want_territory {
            Some(&mut self.ownership_buf)
        } else {
            None
        };
        let mut score = if self.pass_moves_playout_phase < 2 {
            tromp_taylor_score(&self.board, komi, ownership)
        } else {
            score_end_position(&self.board, komi, &self.safety.safe, ownership)
        };
        if want_territory {
            for (p, owner) in self.ownership_buf.iter().enumerate() {
                let value = match owner {
                    Owner::Black => 1.0,
                    Owner::White => 0.0,
                    Owner::Neutral => 0.5,
                };
                self.territory[p].add(value);
            }
        }
        if self.board.to_play() != Color::Black {
            score = -score;
        }
        score_to_eval(score, self.params.score_modification, self.inv_max_score)
    }

    /// Latches the mercy result once the stone differential crosses the
    /// threshold. The result is keyed to the side to move, matching the
    /// perspective `evaluate` reports in.
    fn check_mercy_rule(&mut self) -> bool {
        debug_assert!(self.params.mercy_rule);
        debug_assert!(self.in_playout);
        if self.stone_diff >= self.mercy_threshold {
            self.mercy_triggered = true;
            self.mercy_result = if self.board.to_play() == Color::Black {
                1.0
            } else {
                0.0
            };
        } else if self.stone_diff <= -self.mercy_threshold {
            self.mercy_triggered = true;
            self.mercy_result = if self.board.to_play() == Color::White {
                1.0
            } else {
                0.0
            };
        } else {
            debug_assert!(!self.mercy_triggered);
        }
        self.mercy_triggered
    }

    /// Debug-build cross-check of the policy contract: a pass is accepted
    /// only when every point is occupied, proven safe, a self-atari, or not
    /// a playout candidate; a generated point must not be in a safe set.
    #[cfg(debug_assertions)]
    fn check_policy_contract(&self, mv: Move) {
        let bd = &self.board;
        match mv {
            Move::Pass => {
                let to_play = bd.to_play();
                for p in bd.all_points() {
                    debug_assert!(
                        bd.occupied(p)
                            || self.safety.safe.one_contains(p)
                            || bd.is_self_atari(p, to_play)
                            || !bd.is_playout_candidate(p, to_play),
                        "policy passed while {} was playable",
                        crate::board::point_name(p, bd.size())
                    );
                }
            }
            Move::Play(p) => {
                debug_assert!(!self.safety.safe.one_contains(p));
            }
        }
    }
}

impl<P: PlayoutPolicy> crate::uct::ThreadState for SimulationState<P> {
    fn start_search(&mut self) {
        SimulationState::start_search(self);
    }

    fn game_start(&mut self) {
        SimulationState::game_start(self);
    }

    fn generate_all_moves(&mut self, moves: &mut Vec<Move>) {
        SimulationState::generate_all_moves(self, moves);
    }

    fn execute(&mut self, mv: Move) {
        SimulationState::execute(self, mv);
    }

    fn start_playout(&mut self) {
        SimulationState::start_playout(self);
    }

    fn generate_playout_move(&mut self, skip_rave: &mut bool) -> Option<Move> {
        SimulationState::generate_playout_move(self, skip_rave)
    }

    fn execute_playout(&mut self, mv: Move) {
        SimulationState::execute_playout(self, mv);
    }

    fn end_playout(&mut self) {
        SimulationState::end_playout(self);
    }

    fn evaluate(&mut self) -> f32 {
        SimulationState::evaluate(self)
    }
}
