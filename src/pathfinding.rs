// Pathfinding Module - A* over the 4-connected playable grid
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::collision::{is_blocked, is_out_of_bounds, CellSet};
use crate::types::{manhattan_distance, Position};

// A* node for pathfinding
#[derive(Clone, Eq, PartialEq)]
struct AStarNode {
    pos: Position,
    g_cost: i32,  // Cost from start
    h_cost: i32,  // Heuristic to goal
    seq: u64,     // Discovery order, breaks f-cost ties first-in first-out
}

impl AStarNode {
    fn f_cost(&self) -> i32 {
        self.g_cost + self.h_cost
    }
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        other
            .f_cost()
            .cmp(&self.f_cost())
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest 4-connected path from `start` to `goal` on a `size` x `size` grid.
///
/// Neighbours must be inside the boundary walls and outside every `blocked` set;
/// the goal itself is always enterable, since the cycle being chased sits on the
/// newest cell of its own trail. Returns the cells after `start` up to and
/// including `goal`, or an empty path when the goal is unreachable or already
/// reached.
pub fn find_path(start: Position, goal: Position, size: i32, blocked: &[&dyn CellSet]) -> Vec<Position> {
    if start == goal {
        return Vec::new();
    }

    let mut open_set = BinaryHeap::new();
    let mut closed_set = HashSet::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut g_score: HashMap<Position, i32> = HashMap::new();
    let mut seq = 0u64;

    g_score.insert(start, 0);
    open_set.push(AStarNode {
        pos: start,
        g_cost: 0,
        h_cost: manhattan_distance(start, goal),
        seq,
    });

    while let Some(current) = open_set.pop() {
        if current.pos == goal {
            return reconstruct_path(&came_from, start, goal);
        }

        if !closed_set.insert(current.pos) {
            continue;
        }

        for neighbor in current.pos.neighbors() {
            if closed_set.contains(&neighbor) || is_out_of_bounds(neighbor, size) {
                continue;
            }
            if neighbor != goal && is_blocked(neighbor, blocked) {
                continue;
            }

            let tentative_g = current.g_cost + 1;
            let improved = g_score.get(&neighbor).map_or(true, |&known| tentative_g < known);
            if !improved {
                continue;
            }

            came_from.insert(neighbor, current.pos);
            g_score.insert(neighbor, tentative_g);
            seq += 1;
            open_set.push(AStarNode {
                pos: neighbor,
                g_cost: tentative_g,
                h_cost: manhattan_distance(neighbor, goal),
                seq,
            });
        }
    }

    Vec::new() // No path found
}

fn reconstruct_path(came_from: &HashMap<Position, Position>, start: Position, goal: Position) -> Vec<Position> {
    let mut path = vec![goal];
    let mut pos = goal;
    while let Some(&parent) = came_from.get(&pos) {
        if parent == start {
            break;
        }
        path.push(parent);
        pos = parent;
    }
    path.reverse();
    path
}
