//! Command-line front end: runs a Monte-Carlo search from an empty (or
//! self-played) position and prints the chosen move with search statistics.

use clap::Parser;
use colored::*;

use gomc::board::{move_name, Board, Move, Rules};
use gomc::diagnostics;
use gomc::policy::RandomPolicyFactory;
use gomc::simulation::SimulationParams;
use gomc::SearchController;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(short, long, default_value_t = 9, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(2..=19))]
    board_size: usize,

    #[clap(short, long, default_value_t = 7.5)]
    komi: f32,

    /// Simulated games per searched move.
    #[clap(short, long, default_value_t = 10000)]
    games: u64,

    /// Worker threads; 0 uses all available cores.
    #[clap(short, long, default_value_t = 0)]
    num_threads: usize,

    #[clap(short, long, default_value_t = 1)]
    seed: u64,

    /// UCB exploration bias; negative keeps the board-size default.
    #[clap(short = 'e', long, default_value_t = -1.0)]
    exploration: f64,

    #[clap(long, default_value_t = 0.02)]
    score_modification: f32,

    #[clap(long, action = clap::ArgAction::SetTrue)]
    no_mercy_rule: bool,

    #[clap(long, action = clap::ArgAction::SetTrue)]
    territory_stats: bool,

    /// Print live search status from one worker.
    #[clap(long, action = clap::ArgAction::SetTrue)]
    live_stats: bool,

    #[clap(long, default_value_t = 5000)]
    live_interval: u64,

    /// Play a full game, searching every move, instead of a single search.
    #[clap(long, action = clap::ArgAction::SetTrue)]
    self_play: bool,

    /// Moves shown in the per-move statistics table.
    #[clap(long, default_value_t = 10)]
    top_moves: usize,
}

fn build_controller(args: &Args) -> SearchController {
    let params = SimulationParams {
        mercy_rule: !args.no_mercy_rule,
        territory_statistics: args.territory_stats || args.live_stats,
        score_modification: args.score_modification,
        ..SimulationParams::default()
    };
    let mut config = SearchController::default_uct_config(args.board_size);
    if args.exploration >= 0.0 {
        config.exploration = args.exploration;
    }
    config.num_threads = args.num_threads;
    let mut controller = SearchController::with_uct_config(params, config);
    controller.set_seed(args.seed);
    controller.set_live_stats(args.live_stats, args.live_interval);
    controller
}

fn search_once(controller: &mut SearchController, board: &Board, args: &Args) -> Option<Move> {
    let summary = controller.search(board, args.games, RandomPolicyFactory::new(args.seed));
    eprintln!(
        "{}: {} games, {:.0} games/s, {} playout moves",
        "search".cyan(),
        summary.games,
        summary.games_per_second,
        summary.playout_moves
    );
    diagnostics::print_root_stats(board.size(), &summary.root_stats, args.top_moves);
    if args.territory_stats {
        eprintln!("territory:");
        eprint!("{}", diagnostics::territory_map(board.size(), &summary.territory));
    }
    summary.best_move
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let rules = Rules {
        komi: args.komi,
        ..Rules::default()
    };
    let mut board = Board::new(args.board_size, rules);
    let mut controller = build_controller(&args);

    if args.self_play {
        while !board.two_passes() {
            let mv = search_once(&mut controller, &board, &args).unwrap_or(Move::Pass);
            println!("{} {}", board.to_play(), move_name(mv, board.size()));
            if board.play(mv).is_err() {
                let _ = board.play(Move::Pass);
            }
            eprintln!("{}", board);
        }
        let score = gomc::score::tromp_taylor_score(&board, board.rules().komi, None);
        println!("score {:+.1}", score);
    } else {
        let mv = search_once(&mut controller, &board, &args).unwrap_or(Move::Pass);
        eprintln!("{}", board);
        println!("{}", move_name(mv, board.size()));
    }
}
