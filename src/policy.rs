//! The pluggable move generator driving the random playout phase.
//!
//! The contract on `generate_move` is hard: a policy must not return a pass
//! while any point outside the safe sets still satisfies
//! [`Board::is_playout_candidate`]. The simulation relies on it both for
//! termination of every playout and for the terminal position after two
//! passes being scorable without dead-stone analysis. Violations are caught
//! by a debug-build cross-check in the simulation state, not at runtime in
//! release builds.

use std::sync::Arc;

use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::board::{Board, Move, Point};
use crate::safety::SafetyInfo;

/// Playout move generator, one instance per simulation state, exclusively
/// owned by its worker thread. Lifecycle notifications let stateful
/// policies track the game incrementally; the defaults do nothing.
pub trait PlayoutPolicy: Send {
    /// Called when a playout phase begins.
    fn start_playout(&mut self, _bd: &Board) {}

    /// Called when a playout phase ends.
    fn end_playout(&mut self) {}

    /// Called after each playout move was executed on the board.
    fn on_play(&mut self, _bd: &Board) {}

    /// Generates the next playout move for the side to move.
    fn generate_move(&mut self, bd: &Board) -> Move;
}

/// Creates one fresh policy per worker thread.
pub trait PolicyFactory: Send + Sync {
    type Policy: PlayoutPolicy;

    fn create(&self, thread_id: usize, safety: Arc<SafetyInfo>) -> Self::Policy;
}

/// Uniformly random playout policy: picks among all legal non-eye points
/// outside the safe sets, and passes only when none remain. Honors the
/// policy contract by construction.
pub struct RandomPolicy {
    rng: Xoshiro256PlusPlus,
    safety: Arc<SafetyInfo>,
    candidates: Vec<Point>,
}

impl RandomPolicy {
    pub fn new(seed: u64, safety: Arc<SafetyInfo>) -> Self {
        RandomPolicy {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            safety,
            candidates: Vec::new(),
        }
    }
}

impl PlayoutPolicy for RandomPolicy {
    fn generate_move(&mut self, bd: &Board) -> Move {
        let to_play = bd.to_play();
        self.candidates.clear();
        for p in bd.all_points() {
            if !self.safety.safe.one_contains(p) && bd.is_playout_candidate(p, to_play) {
                self.candidates.push(p);
            }
        }
        if self.candidates.is_empty() {
            Move::Pass
        } else {
            let i = self.rng.random_range(0..self.candidates.len());
            Move::Play(self.candidates[i])
        }
    }
}

/// Factory for [`RandomPolicy`]; thread ids are folded into the base seed
/// so workers draw independent streams.
pub struct RandomPolicyFactory {
    seed: u64,
}

impl RandomPolicyFactory {
    pub fn new(seed: u64) -> Self {
        RandomPolicyFactory { seed }
    }
}

impl PolicyFactory for RandomPolicyFactory {
    type Policy = RandomPolicy;

    fn create(&self, thread_id: usize, safety: Arc<SafetyInfo>) -> RandomPolicy {
        let seed = self
            .seed
            .wrapping_add(0x9e37_79b9_7f4a_7c15u64.wrapping_mul(thread_id as u64 + 1));
        RandomPolicy::new(seed, safety)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Color, Rules};

    fn no_komi() -> Rules {
        Rules {
            komi: 0.0,
            ..Rules::default()
        }
    }

    fn contested(bd: &Board) -> Arc<SafetyInfo> {
        Arc::new(SafetyInfo::empty(bd.area()))
    }

    #[test]
    fn test_generates_legal_moves() {
        let bd = Board::new(5, no_komi());
        let mut policy = RandomPolicy::new(7, contested(&bd));
        for _ in 0..50 {
            match policy.generate_move(&bd) {
                Move::Play(p) => assert!(bd.is_legal(p, Color::Black)),
                Move::Pass => panic!("pass with an empty board"),
            }
        }
    }

    #[test]
    fn test_passes_when_only_eyes_remain() {
        // Both empty points are Black eyes; White has no legal move.
        let bd = Board::from_rows(
            &[
                "X.X", //
                "XXX",
                "X.X",
            ],
            no_komi(),
        );
        let mut policy = RandomPolicy::new(7, contested(&bd));
        assert_eq!(policy.generate_move(&bd), Move::Pass);
    }

    #[test]
    fn test_safe_points_excluded() {
        let bd = Board::new(3, no_komi());
        let mut safe = crate::safety::BwSet::new(bd.area());
        for p in 0..8 {
            safe.black.insert(p);
        }
        let info = Arc::new(SafetyInfo::from_safe_sets(bd.area(), safe));
        let mut policy = RandomPolicy::new(7, info);
        // Only point 8 is outside the safe sets.
        assert_eq!(policy.generate_move(&bd), Move::Play(8));
    }

    #[test]
    fn test_thread_seeds_differ() {
        let bd = Board::new(9, no_komi());
        let factory = RandomPolicyFactory::new(1);
        let mut a = factory.create(0, contested(&bd));
        let mut b = factory.create(1, contested(&bd));
        let first_a: Vec<Move> = (0..8).map(|_| a.generate_move(&bd)).collect();
        let first_b: Vec<Move> = (0..8).map(|_| b.generate_move(&bd)).collect();
        assert_ne!(first_a, first_b);
    }
}
