//! Search-session orchestration: owns the simulation parameters, the
//! optional safety solver, the live-diagnostics settings, and the per-board
//! size defaults, and wires per-thread simulation states into the generic
//! tree search through a factory.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::board::Board;
use crate::diagnostics;
use crate::policy::PolicyFactory;
use crate::safety::{SafetyInfo, SafetySolver};
use crate::simulation::{SimulationParams, SimulationState};
use crate::stats::Statistics;
use crate::uct::{MoveStats, SearchResult, ThreadStateFactory, UctConfig, UctSearch};
use crate::Move;

/// Binds a fresh, fully wired [`SimulationState`] to each worker thread:
/// root-board snapshot, shared parameters and safety data, a new policy
/// instance, and a per-thread random seed. Ownership of the returned state
/// passes to the search driver.
pub struct StateFactory<PF: PolicyFactory> {
    root: Arc<Board>,
    params: Arc<SimulationParams>,
    safety: Arc<SafetyInfo>,
    policies: PF,
    seed: u64,
}

impl<PF: PolicyFactory> StateFactory<PF> {
    pub fn new(
        root: Arc<Board>,
        params: Arc<SimulationParams>,
        safety: Arc<SafetyInfo>,
        policies: PF,
        seed: u64,
    ) -> Self {
        StateFactory {
            root,
            params,
            safety,
            policies,
            seed,
        }
    }
}

impl<PF: PolicyFactory> ThreadStateFactory for StateFactory<PF> {
    type State = SimulationState<PF::Policy>;

    fn create(&self, thread_id: usize) -> Self::State {
        let policy = self.policies.create(thread_id, self.safety.clone());
        let seed = self
            .seed
            .wrapping_add(0x517c_c1b7_2722_0a95u64.wrapping_mul(thread_id as u64 + 1));
        SimulationState::new(
            thread_id,
            self.root.clone(),
            self.params.clone(),
            self.safety.clone(),
            policy,
            seed,
        )
    }
}

/// Summary of one finished search, wrapping the driver's result with
/// wall-clock throughput and the merged territory statistics.
#[derive(Clone, Debug)]
pub struct SearchSummary {
    pub best_move: Option<Move>,
    pub games: u64,
    pub playout_moves: u64,
    pub games_per_second: f64,
    pub root_stats: Vec<MoveStats>,
    /// Per-point ownership statistics merged over all worker threads.
    /// Empty unless territory statistics are enabled.
    pub territory: Vec<Statistics>,
}

/// Owns the search-wide configuration and the shared safety information,
/// and constructs per-thread simulation states for the tree-search driver.
/// Safety information is computed once at the start of every search, before
/// any worker reads it, and is read-only afterwards.
pub struct SearchController {
    params: SimulationParams,
    solver: Option<Box<dyn SafetySolver>>,
    live_stats: bool,
    live_interval: u64,
    seed: u64,
    uct: UctSearch,
}

impl SearchController {
    pub fn new(board_size: usize, params: SimulationParams) -> Self {
        SearchController::with_uct_config(params, Self::default_uct_config(board_size))
    }

    pub fn with_uct_config(params: SimulationParams, config: UctConfig) -> Self {
        SearchController {
            params,
            solver: None,
            live_stats: false,
            live_interval: 5000,
            seed: 1,
            uct: UctSearch::new(config),
        }
    }

    /// Search defaults tuned per board-size regime: small boards keep the
    /// UCB bias term, larger boards disable it.
    pub fn default_uct_config(board_size: usize) -> UctConfig {
        if board_size <= 13 {
            UctConfig {
                exploration: 0.02,
                ..UctConfig::default()
            }
        } else {
            UctConfig {
                exploration: 0.0,
                ..UctConfig::default()
            }
        }
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn uct_config(&self) -> &UctConfig {
        self.uct.config()
    }

    /// Installs a safety solver consulted at the start of every search.
    pub fn set_safety_solver(&mut self, solver: Box<dyn SafetySolver>) {
        self.solver = Some(solver);
    }

    /// Enables per-interval diagnostic output on the designated worker.
    pub fn set_live_stats(&mut self, enable: bool, interval: u64) {
        self.live_stats = enable;
        self.live_interval = interval.max(1);
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    /// Handle that ends the current search early at a game boundary.
    pub fn stop_handle(&self) -> Arc<std::sync::atomic::AtomicBool> {
        self.uct.stop_handle()
    }

    /// Evaluation to report for positions the search has not tried yet.
    /// Part of the controller's public boundary for embedders that query
    /// positions outside the tree; the driver itself orders unvisited
    /// children by `UctConfig::first_play_urgency`, not by this value.
    pub fn unknown_eval() -> f32 {
        0.5
    }

    /// Computes the shared safety information for a search rooted at
    /// `root`. Empty unless a solver is installed.
    pub fn on_start_search(&self, root: &Board) -> Arc<SafetyInfo> {
        if self.live_stats && !self.params.territory_statistics {
            warn!("live diagnostics need territory statistics enabled");
        }
        let info = match &self.solver {
            Some(solver) => {
                let safe = solver.find_safe_points(root);
                SafetyInfo::from_safe_sets(root.area(), safe)
            }
            None => SafetyInfo::empty(root.area()),
        };
        Arc::new(info)
    }

    /// Runs a search of `max_games` simulated games from `root`.
    pub fn search<PF: PolicyFactory>(
        &mut self,
        root: &Board,
        max_games: u64,
        policies: PF,
    ) -> SearchSummary {
        let safety = self.on_start_search(root);
        let root = Arc::new(root.clone());
        let factory = StateFactory::new(
            root.clone(),
            Arc::new(self.params),
            safety,
            policies,
            self.seed,
        );
        debug!(
            "searching {} games on a {}x{} board with {} threads",
            max_games,
            root.size(),
            root.size(),
            self.uct.config().num_threads
        );

        let live = self.live_stats && self.params.territory_statistics;
        let interval = self.live_interval;
        let want_territory = self.params.territory_statistics;
        let board_size = root.size();
        let merged = Mutex::new(vec![Statistics::new(); root.area()]);
        let started = Instant::now();
        let result: SearchResult = self.uct.search(
            &factory,
            max_games,
            |game, thread_id, state, view| {
                if live && thread_id == 0 && game % interval == 0 {
                    diagnostics::emit_live_status(
                        board_size,
                        state.territory_statistics(),
                        view,
                        game,
                        started.elapsed(),
                    );
                }
            },
            |_, state| {
                if want_territory {
                    let mut merged = merged.lock();
                    for (acc, thread_stats) in
                        merged.iter_mut().zip(state.territory_statistics())
                    {
                        acc.merge(thread_stats);
                    }
                }
            },
        );

        let elapsed = started.elapsed().as_secs_f64();
        SearchSummary {
            best_move: result.best_move,
            games: result.games,
            playout_moves: result.playout_moves,
            games_per_second: if elapsed > 0.0 {
                result.games as f64 / elapsed
            } else {
                0.0
            },
            root_stats: result.root_stats,
            territory: if want_territory {
                merged.into_inner()
            } else {
                Vec::new()
            },
        }
    }
}
