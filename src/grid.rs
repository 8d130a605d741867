// Grid Module - Static board: size, implicit boundary walls and obstacle shapes
use log::{debug, warn};
use rand::Rng;
use std::collections::HashMap;

use crate::collision::{is_out_of_bounds, CellSet};
use crate::types::{Axis, Position};

// Obstacle shapes stamped onto the board at round start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleShape {
    Horizontal,  // 3 cells to the right of the anchor
    Vertical,    // 3 cells below the anchor
    LShape,      // 2 right + 2 down, sharing the anchor corner
}

impl ObstacleShape {
    fn random<R: Rng>(rng: &mut R) -> ObstacleShape {
        match rng.gen_range(0..3) {
            0 => ObstacleShape::Horizontal,
            1 => ObstacleShape::Vertical,
            _ => ObstacleShape::LShape,
        }
    }

    /// Constituent cells and their glyph axis. Later entries win on shared cells.
    pub fn cells(&self, anchor: Position) -> Vec<(Position, Axis)> {
        let Position { x, y } = anchor;
        match self {
            ObstacleShape::Horizontal => (0..3).map(|i| (Position::new(x + i, y), Axis::Horizontal)).collect(),
            ObstacleShape::Vertical => (0..3).map(|i| (Position::new(x, y + i), Axis::Vertical)).collect(),
            ObstacleShape::LShape => {
                let arm = (0..2).map(|i| (Position::new(x + i, y), Axis::Horizontal));
                let leg = (0..2).map(|i| (Position::new(x, y + i), Axis::Vertical));
                arm.chain(leg).collect()
            }
        }
    }
}

/// Immutable per-round board. Boundary cells are never stored: any cell with a
/// coordinate of 0 or size-1 is a wall.
#[derive(Debug, Clone)]
pub struct GridWorld {
    size: i32,
    obstacles: HashMap<Position, Axis>,
}

impl GridWorld {
    /// Empty board of `size` x `size` cells
    pub fn new(size: i32) -> Self {
        GridWorld { size, obstacles: HashMap::new() }
    }

    /// Board with `obstacle_count` independently placed shapes. Anchors are drawn
    /// from [1, size-5] on both axes so no shape reaches the boundary. Shapes may
    /// overlap each other and the spawn cells.
    pub fn generate<R: Rng>(size: i32, obstacle_count: usize, rng: &mut R) -> Self {
        let mut world = GridWorld::new(size);
        let max_anchor = size - 5;
        if max_anchor < 1 {
            warn!("Grid size {} too small for obstacles, skipping placement", size);
            return world;
        }

        for _ in 0..obstacle_count {
            let shape = ObstacleShape::random(rng);
            let anchor = Position::new(rng.gen_range(1..=max_anchor), rng.gen_range(1..=max_anchor));
            world.stamp(shape, anchor);
        }

        debug!("Placed {} obstacle shapes covering {} cells", obstacle_count, world.obstacles.len());
        world
    }

    /// Stamp one shape onto the board
    pub fn stamp(&mut self, shape: ObstacleShape, anchor: Position) {
        for (cell, axis) in shape.cells(anchor) {
            debug_assert!(!is_out_of_bounds(cell, self.size), "obstacle cell {:?} outside playable area", cell);
            self.obstacles.insert(cell, axis);
        }
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn obstacles(&self) -> &HashMap<Position, Axis> {
        &self.obstacles
    }

    pub fn is_out_of_bounds(&self, cell: Position) -> bool {
        is_out_of_bounds(cell, self.size)
    }

    /// Glyph axis for boundary cells; side walls take precedence at the corners
    pub fn wall_axis(&self, cell: Position) -> Option<Axis> {
        let last = self.size - 1;
        if cell.x == 0 || cell.x == last {
            Some(Axis::Vertical)
        } else if cell.y == 0 || cell.y == last {
            Some(Axis::Horizontal)
        } else {
            None
        }
    }
}

impl CellSet for GridWorld {
    fn contains_cell(&self, cell: Position) -> bool {
        self.obstacles.contains_key(&cell)
    }
}
