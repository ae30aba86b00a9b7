//! Parallel Monte-Carlo tree search for the game of Go.
//!
//! The crate is split into a game layer (board, scoring, safety sets), a
//! simulation layer (per-thread playout state and policies), and a search
//! layer (lock-light shared tree driven by a rayon thread pool). A
//! [`SearchController`] ties the layers together for one search session.

pub mod board;
pub mod controller;
pub mod diagnostics;
pub mod policy;
pub mod safety;
pub mod score;
pub mod simulation;
pub mod stats;
pub mod uct;

pub use board::{Board, BoardError, Color, Move, Point, Rules};
pub use controller::{SearchController, SearchSummary, StateFactory};
pub use policy::{PlayoutPolicy, PolicyFactory, RandomPolicy, RandomPolicyFactory};
pub use safety::{BwSet, NoSafetySolver, PointSet, SafetyInfo, SafetySolver};
pub use score::{score_end_position, tromp_taylor_score, Owner};
pub use simulation::{SimulationParams, SimulationState};
pub use stats::Statistics;
pub use uct::{MoveStats, SearchResult, UctConfig, UctSearch};
