//! Terminal diagnostics: live status lines during a search and summary
//! output afterwards. Everything here goes to stderr so it never mixes
//! with machine-readable output on stdout.

use std::time::Duration;

use colored::*;

use crate::board::move_name;
use crate::stats::Statistics;
use crate::uct::{MoveStats, SearchView};
use crate::Move;

/// Renders the mean Black-ownership of every point as a character map.
/// `#`/`+` lean Black, `o`/`-` lean White, `.` is contested, space means
/// no playout reached a verdict for that point.
pub fn territory_map(board_size: usize, territory: &[Statistics]) -> String {
    let mut out = String::new();
    for row in (0..board_size).rev() {
        for col in 0..board_size {
            let st = &territory[row * board_size + col];
            let ch = if !st.is_defined() {
                ' '
            } else {
                match st.mean() {
                    m if m >= 0.8 => '#',
                    m if m >= 0.6 => '+',
                    m if m > 0.4 => '.',
                    m if m > 0.2 => '-',
                    _ => 'o',
                }
            };
            out.push(ch);
            out.push(' ');
        }
        out.push('\n');
    }
    out
}

/// One-line progress report plus a territory snapshot, printed by the
/// designated worker during a live search.
pub fn emit_live_status(
    board_size: usize,
    territory: &[Statistics],
    view: &SearchView<'_>,
    games: u64,
    elapsed: Duration,
) {
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 { games as f64 / secs } else { 0.0 };
    let best = view
        .best_move()
        .map(|mv| move_name(mv, board_size))
        .unwrap_or_else(|| "none".to_string());
    eprintln!(
        "{} {:>8} games  {:>8.0} games/s  best {}",
        "search".cyan(),
        games,
        rate,
        best.bold()
    );
    eprint!("{}", territory_map(board_size, territory));
}

/// Final per-move table for the root position, strongest moves first.
pub fn print_root_stats(board_size: usize, stats: &[MoveStats], limit: usize) {
    let mut sorted: Vec<&MoveStats> = stats.iter().collect();
    sorted.sort_by(|a, b| b.visits.cmp(&a.visits));
    eprintln!("{}", "move     visits     mean".dimmed());
    for st in sorted.iter().take(limit) {
        let line = format!(
            "{:<6} {:>8}   {:>6.3}",
            move_name(st.mv, board_size),
            st.visits,
            st.mean
        );
        if Some(st.mv) == stats_best(stats) {
            eprintln!("{}", line.green());
        } else {
            eprintln!("{}", line);
        }
    }
}

fn stats_best(stats: &[MoveStats]) -> Option<Move> {
    stats.iter().max_by_key(|st| st.visits).map(|st| st.mv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_territory_map_shape() {
        let mut territory = vec![Statistics::new(); 9];
        territory[0].add(1.0);
        territory[8].add(0.0);
        let map = territory_map(3, &territory);
        assert_eq!(map.lines().count(), 3);
        // Point 0 is the lower-left corner, rendered on the last line.
        assert!(map.lines().last().unwrap().starts_with('#'));
        assert!(map.lines().next().unwrap().trim_end().ends_with('o'));
    }

    #[test]
    fn test_territory_map_undefined_is_blank() {
        let territory = vec![Statistics::new(); 4];
        let map = territory_map(2, &territory);
        assert!(map.chars().all(|c| c == ' ' || c == '\n'));
    }

    #[test]
    fn test_stats_best_prefers_visits() {
        let stats = vec![
            MoveStats {
                mv: Move::Play(3),
                visits: 10,
                mean: 0.4,
            },
            MoveStats {
                mv: Move::Pass,
                visits: 30,
                mean: 0.2,
            },
        ];
        assert_eq!(stats_best(&stats), Some(Move::Pass));
    }
}
