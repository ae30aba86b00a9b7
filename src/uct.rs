//! Generic parallel tree search. The driver knows nothing about Go: it
//! talks to the evaluator through [`ThreadState`], runs one simulation
//! state per worker thread, and consumes the win probability `evaluate`
//! returns.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::board::Move;

/// The evaluator plugin contract. One instance per worker thread; the
/// driver is the exclusive owner and calls the lifecycle methods in a fixed
/// order: `start_search` once, then per simulated game `game_start`,
/// in-tree `generate_all_moves`/`execute`, then `start_playout`,
/// `generate_playout_move`/`execute_playout` until `None`, `end_playout`,
/// and finally `evaluate`.
pub trait ThreadState: Send {
    fn start_search(&mut self);
    fn game_start(&mut self);
    /// Fills `moves` with the in-tree candidates; empty means the position
    /// is terminal and is evaluated directly.
    fn generate_all_moves(&mut self, moves: &mut Vec<Move>);
    fn execute(&mut self, mv: Move);
    fn start_playout(&mut self);
    /// `None` ends the simulated game. `skip_rave` marks plies that should
    /// not contribute to move-value statistics.
    fn generate_playout_move(&mut self, skip_rave: &mut bool) -> Option<Move>;
    fn execute_playout(&mut self, mv: Move);
    fn end_playout(&mut self);
    /// Win probability in [0,1] for the side to move in the current
    /// position.
    fn evaluate(&mut self) -> f32;
}

/// Constructs one thread state per worker. Construction must hand over a
/// completely wired state; the driver owns it afterwards.
pub trait ThreadStateFactory: Sync {
    type State: ThreadState;

    fn create(&self, thread_id: usize) -> Self::State;
}

/// Tuning knobs of the tree search.
#[derive(Clone, Copy, Debug)]
pub struct UctConfig {
    /// Bias (exploration) term constant of the UCB selection rule. Zero
    /// disables the bias term.
    pub exploration: f64,
    /// Value assigned to unvisited children during selection.
    pub first_play_urgency: f64,
    /// Number of visits a leaf needs before it is expanded.
    pub expand_threshold: u32,
    /// Worker threads. Zero picks the number of logical CPUs.
    pub num_threads: usize,
}

impl Default for UctConfig {
    fn default() -> Self {
        UctConfig {
            exploration: 0.02,
            first_play_urgency: f64::INFINITY,
            expand_threshold: 2,
            num_threads: 0,
        }
    }
}

/// A node in the search tree, shared across threads.
struct Node {
    /// Sum of rewards from the perspective of the player who moved into
    /// this node.
    value: Mutex<f64>,
    visits: AtomicU64,
    children: Mutex<HashMap<Move, Arc<Node>>>,
}

impl Node {
    fn new() -> Self {
        Node {
            value: Mutex::new(0.0),
            visits: AtomicU64::new(0),
            children: Mutex::new(HashMap::new()),
        }
    }

    /// UCB score used during selection.
    fn ucb(&self, parent_visits: u64, exploration: f64, first_play_urgency: f64) -> f64 {
        let visits = self.visits.load(Ordering::Relaxed);
        if visits == 0 {
            return first_play_urgency;
        }
        let mean = *self.value.lock() / visits as f64;
        if exploration == 0.0 {
            return mean;
        }
        let parent = (parent_visits.max(1)) as f64;
        mean + exploration * (parent.ln() / visits as f64).sqrt()
    }
}

/// Visit count and mean value of a root child.
#[derive(Clone, Copy, Debug)]
pub struct MoveStats {
    pub mv: Move,
    pub visits: u64,
    pub mean: f64,
}

/// Read-only view of the search tree handed to the per-iteration callback.
pub struct SearchView<'a> {
    root: &'a Node,
}

impl SearchView<'_> {
    /// Statistics of all root children.
    pub fn root_stats(&self) -> Vec<MoveStats> {
        let children = self.root.children.lock();
        children
            .iter()
            .map(|(mv, node)| {
                let visits = node.visits.load(Ordering::Relaxed);
                let mean = if visits == 0 {
                    0.0
                } else {
                    *node.value.lock() / visits as f64
                };
                MoveStats {
                    mv: *mv,
                    visits,
                    mean,
                }
            })
            .collect()
    }

    /// The most-visited root move.
    pub fn best_move(&self) -> Option<Move> {
        let children = self.root.children.lock();
        children
            .iter()
            .max_by_key(|(_, node)| node.visits.load(Ordering::Relaxed))
            .map(|(mv, _)| *mv)
    }
}

/// Outcome of a finished search.
#[derive(Clone, Debug)]
pub struct SearchResult {
    /// The most-visited root move, if any position was expanded.
    pub best_move: Option<Move>,
    /// Simulated games actually played.
    pub games: u64,
    /// Total playout moves across all games.
    pub playout_moves: u64,
    /// Playout plies flagged as carrying no move-value signal (passes).
    pub rave_skipped_plies: u64,
    /// Statistics of the root children at the end of the search.
    pub root_stats: Vec<MoveStats>,
}

/// The parallel search driver. Workers run independent simulated games
/// against a shared tree; tree statistics use a mutex per node and atomic
/// visit counters.
pub struct UctSearch {
    root: Arc<Node>,
    config: UctConfig,
    pool: ThreadPool,
    stop: Arc<AtomicBool>,
}

impl UctSearch {
    pub fn new(config: UctConfig) -> Self {
        let num_threads = if config.num_threads > 0 {
            config.num_threads
        } else {
            num_cpus::get()
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .unwrap();
        UctSearch {
            root: Arc::new(Node::new()),
            config: UctConfig {
                num_threads,
                ..config
            },
            pool,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &UctConfig {
        &self.config
    }

    /// Handle that ends the search early at the next game boundary.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Runs up to `max_games` simulated games across the worker pool.
    /// `on_iteration` fires once per finished game on the worker that
    /// played it, with that worker's state and a view of the tree;
    /// `on_thread_finish` fires once per worker when its loop ends, before
    /// the state is dropped, so per-thread accumulators can be read off.
    pub fn search<F, C, D>(
        &mut self,
        factory: &F,
        max_games: u64,
        on_iteration: C,
        on_thread_finish: D,
    ) -> SearchResult
    where
        F: ThreadStateFactory,
        C: Fn(u64, usize, &F::State, &SearchView<'_>) + Sync,
        D: Fn(usize, &F::State) + Sync,
    {
        self.root = Arc::new(Node::new());
        self.stop.store(false, Ordering::Relaxed);
        let games_started = AtomicU64::new(0);
        let games_finished = AtomicU64::new(0);
        let playout_moves = AtomicU64::new(0);
        let rave_skipped = AtomicU64::new(0);

        let root = &self.root;
        let config = self.config;
        let stop = &self.stop;
        let on_iteration = &on_iteration;
        let on_thread_finish = &on_thread_finish;
        self.pool.scope(|scope| {
            for thread_id in 0..config.num_threads {
                let games_started = &games_started;
                let games_finished = &games_finished;
                let playout_moves = &playout_moves;
                let rave_skipped = &rave_skipped;
                scope.spawn(move |_| {
                    let mut state = factory.create(thread_id);
                    state.start_search();
                    let mut moves = Vec::new();
                    loop {
                        if stop.load(Ordering::Relaxed) {
                            break;
                        }
                        let game = games_started.fetch_add(1, Ordering::Relaxed);
                        if game >= max_games {
                            break;
                        }
                        let (plies, skipped) =
                            Self::run_simulation(root, &config, &mut state, &mut moves);
                        playout_moves.fetch_add(plies, Ordering::Relaxed);
                        rave_skipped.fetch_add(skipped, Ordering::Relaxed);
                        let finished = games_finished.fetch_add(1, Ordering::Relaxed) + 1;
                        let view = SearchView {
                            root: root.as_ref(),
                        };
                        on_iteration(finished, thread_id, &state, &view);
                    }
                    on_thread_finish(thread_id, &state);
                });
            }
        });

        let view = SearchView {
            root: self.root.as_ref(),
        };
        SearchResult {
            best_move: view.best_move(),
            games: games_finished.load(Ordering::Relaxed),
            playout_moves: playout_moves.load(Ordering::Relaxed),
            rave_skipped_plies: rave_skipped.load(Ordering::Relaxed),
            root_stats: view.root_stats(),
        }
    }

    /// Plays one simulated game: selection and expansion through the tree,
    /// then a playout, then backpropagation. Returns the playout length and
    /// the number of rave-skipped plies.
    fn run_simulation<S: ThreadState>(
        root: &Arc<Node>,
        config: &UctConfig,
        state: &mut S,
        moves: &mut Vec<Move>,
    ) -> (u64, u64) {
        state.game_start();
        let mut path: Vec<Arc<Node>> = vec![root.clone()];
        let mut node = root.clone();
        let mut terminal_in_tree = false;

        loop {
            let visits = node.visits.load(Ordering::Relaxed);
            let mut expanded_now = false;
            {
                let mut children = node.children.lock();
                if children.is_empty() {
                    if visits < config.expand_threshold as u64 && path.len() > 1 {
                        // Young leaf: play out without expanding.
                        break;
                    }
                    state.generate_all_moves(moves);
                    if moves.is_empty() {
                        terminal_in_tree = true;
                        break;
                    }
                    for &mv in moves.iter() {
                        children.insert(mv, Arc::new(Node::new()));
                    }
                    expanded_now = true;
                }
            }
            let children = node.children.lock();
            let selected = children
                .iter()
                .max_by(|(_, a), (_, b)| {
                    let a = a.ucb(visits, config.exploration, config.first_play_urgency);
                    let b = b.ucb(visits, config.exploration, config.first_play_urgency);
                    a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(mv, child)| (*mv, child.clone()));
            drop(children);
            match selected {
                Some((mv, child)) => {
                    state.execute(mv);
                    path.push(child.clone());
                    node = child;
                    if expanded_now {
                        // Descend one ply past a fresh expansion, then
                        // hand over to the playout.
                        break;
                    }
                }
                None => break,
            }
        }

        let mut playout_plies = 0u64;
        let mut skipped = 0u64;
        if !terminal_in_tree {
            state.start_playout();
            loop {
                let mut skip_rave = false;
                match state.generate_playout_move(&mut skip_rave) {
                    Some(mv) => {
                        state.execute_playout(mv);
                        playout_plies += 1;
                        if skip_rave {
                            skipped += 1;
                        }
                    }
                    None => break,
                }
            }
            state.end_playout();
        }

        // The evaluation is for the side to move at the final position;
        // convert it to the leaf's side to move, then invert once per ply
        // walking back to the root. Each node accumulates the reward of the
        // player who moved into it.
        let mut eval = f64::from(state.evaluate());
        if playout_plies % 2 == 1 {
            eval = 1.0 - eval;
        }
        for n in path.iter().rev() {
            eval = 1.0 - eval;
            n.visits.fetch_add(1, Ordering::Relaxed);
            *n.value.lock() += eval;
        }
        (playout_plies, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// A two-armed bandit: move 0 always wins for the mover, move 1 always
    /// loses. No playout phase.
    struct BanditState {
        last: Option<Move>,
        depth: usize,
    }

    struct BanditFactory {
        created: AtomicUsize,
    }

    impl ThreadState for BanditState {
        fn start_search(&mut self) {}
        fn game_start(&mut self) {
            self.last = None;
            self.depth = 0;
        }
        fn generate_all_moves(&mut self, moves: &mut Vec<Move>) {
            moves.clear();
            if self.depth == 0 {
                moves.push(Move::Play(0));
                moves.push(Move::Play(1));
            }
        }
        fn execute(&mut self, mv: Move) {
            self.last = Some(mv);
            self.depth += 1;
        }
        fn start_playout(&mut self) {}
        fn generate_playout_move(&mut self, _skip_rave: &mut bool) -> Option<Move> {
            None
        }
        fn execute_playout(&mut self, _mv: Move) {}
        fn end_playout(&mut self) {}
        fn evaluate(&mut self) -> f32 {
            // After executing a move the "side to move" flips: a good move
            // for the mover is a bad position for the opponent to move in.
            match self.last {
                Some(Move::Play(0)) => 0.0,
                Some(Move::Play(1)) => 1.0,
                _ => 0.5,
            }
        }
    }

    impl ThreadStateFactory for BanditFactory {
        type State = BanditState;

        fn create(&self, _thread_id: usize) -> BanditState {
            self.created.fetch_add(1, Ordering::Relaxed);
            BanditState {
                last: None,
                depth: 0,
            }
        }
    }

    #[test]
    fn test_search_prefers_winning_move() {
        let mut search = UctSearch::new(UctConfig {
            exploration: 0.5,
            num_threads: 2,
            ..UctConfig::default()
        });
        let factory = BanditFactory {
            created: AtomicUsize::new(0),
        };
        let finished = AtomicUsize::new(0);
        let result = search.search(
            &factory,
            400,
            |_, _, _, _| {},
            |_, _| {
                finished.fetch_add(1, Ordering::Relaxed);
            },
        );
        assert_eq!(result.games, 400);
        // The finish hook fires once per worker.
        assert_eq!(finished.load(Ordering::Relaxed), 2);
        assert_eq!(result.best_move, Some(Move::Play(0)));
        // One state per worker thread.
        assert_eq!(factory.created.load(Ordering::Relaxed), 2);
        let total: u64 = result.root_stats.iter().map(|s| s.visits).sum();
        assert!(total > 0);
    }

    #[test]
    fn test_stop_handle_ends_search() {
        let mut search = UctSearch::new(UctConfig {
            num_threads: 2,
            ..UctConfig::default()
        });
        let stop = search.stop_handle();
        let factory = BanditFactory {
            created: AtomicUsize::new(0),
        };
        let result = search.search(
            &factory,
            u64::MAX,
            |game, _, _, _| {
                if game >= 100 {
                    stop.store(true, Ordering::Relaxed);
                }
            },
            |_, _| {},
        );
        assert!(result.games >= 100);
    }

    #[test]
    fn test_callback_sees_iterations() {
        let mut search = UctSearch::new(UctConfig {
            num_threads: 1,
            ..UctConfig::default()
        });
        let factory = BanditFactory {
            created: AtomicUsize::new(0),
        };
        let seen = AtomicU64::new(0);
        let result = search.search(
            &factory,
            50,
            |_, thread_id, _, view| {
                assert_eq!(thread_id, 0);
                assert!(view.best_move().is_some() || view.root_stats().is_empty());
                seen.fetch_add(1, Ordering::Relaxed);
            },
            |_, _| {},
        );
        assert_eq!(seen.load(Ordering::Relaxed), result.games);
    }
}
