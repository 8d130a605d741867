// Pursuit Module - One-ply lookahead AI that steers the pursuer toward its target
use log::debug;

use crate::collision::{is_blocked, CellSet};
use crate::pathfinding::find_path;
use crate::types::{manhattan_distance, Heading, Position};

pub const DEFAULT_LOOKAHEAD_DEPTH: usize = 3;

/// Heading returned when no candidate survives
pub const FALLBACK_HEADING: Heading = Heading::Down;

/// Re-plans from scratch every tick; nothing is carried between calls.
#[derive(Debug, Clone, Copy)]
pub struct PursuitAi {
    depth: usize,
}

impl Default for PursuitAi {
    fn default() -> Self {
        PursuitAi::new(DEFAULT_LOOKAHEAD_DEPTH)
    }
}

impl PursuitAi {
    pub fn new(depth: usize) -> Self {
        PursuitAi { depth: depth.max(1) }
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Pick the heading whose one-step-ahead cell has the best short-term plan to `target`.
    ///
    /// Candidates landing on a blocked cell are dropped, as are candidates with no
    /// path. Cells beyond the boundary are left for the round's bounds check. Ties
    /// go to the first heading in Up, Down, Left, Right order.
    pub fn choose_heading(&self, pursuer: Position, target: Position, size: i32, blocked: &[&dyn CellSet]) -> Heading {
        let mut best: Option<(Heading, i32)> = None;

        for heading in Heading::CARDINALS {
            let candidate = heading.next_position(pursuer);
            if is_blocked(candidate, blocked) {
                continue;
            }

            let path = find_path(candidate, target, size, blocked);
            if path.is_empty() {
                continue;
            }

            let score = self.score(&path, target);
            if best.map_or(true, |(_, best_score)| score < best_score) {
                best = Some((heading, score));
            }
        }

        match best {
            Some((heading, score)) => {
                debug!("Pursuit picked {:?} (score {})", heading, score);
                heading
            }
            None => {
                debug!("Pursuit has no viable candidate from {:?}, falling back to {:?}", pursuer, FALLBACK_HEADING);
                FALLBACK_HEADING
            }
        }
    }

    /// Sum of distances to `target` over the first `depth` steps of `path`
    fn score(&self, path: &[Position], target: Position) -> i32 {
        path.iter()
            .take(self.depth)
            .map(|&step| manhattan_distance(step, target))
            .sum()
    }
}
