// Collision Module - Pure boundary and occupancy predicates
use std::collections::{HashMap, HashSet};

use crate::types::Position;

/// Anything that can answer "is this cell taken": obstacle maps, trails, ad hoc sets.
pub trait CellSet {
    fn contains_cell(&self, cell: Position) -> bool;
}

impl CellSet for HashSet<Position> {
    fn contains_cell(&self, cell: Position) -> bool {
        self.contains(&cell)
    }
}

impl<V> CellSet for HashMap<Position, V> {
    fn contains_cell(&self, cell: Position) -> bool {
        self.contains_key(&cell)
    }
}

/// True iff `cell` is a member of any of the given sets
pub fn is_blocked(cell: Position, sets: &[&dyn CellSet]) -> bool {
    sets.iter().any(|set| set.contains_cell(cell))
}

/// True iff `cell` touches or crosses the boundary wall of a `size` x `size` grid.
/// Playable cells are 1..size-1 on both axes.
pub fn is_out_of_bounds(cell: Position, size: i32) -> bool {
    cell.x < 1 || cell.x >= size - 1 || cell.y < 1 || cell.y >= size - 1
}
