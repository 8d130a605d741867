// Shared types module - Cells, headings and exit reasons used across the game

// Exit reason - used by main to tell a menu quit from an interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    MenuQuit,     // User picked Q at the menu
    Interrupted,  // User pressed Ctrl+C (raw mode swallows SIGINT)
}

/// A grid cell. Row 0 is the top wall, y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    /// The four orthogonal neighbours, in Up, Down, Left, Right order
    pub fn neighbors(self) -> [Position; 4] {
        Heading::CARDINALS.map(|heading| heading.next_position(self))
    }
}

// Manhattan distance, used by the A* heuristic and the pursuit score
pub fn manhattan_distance(a: Position, b: Position) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Heading {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
}

impl Heading {
    /// Candidate order used wherever headings are enumerated
    pub const CARDINALS: [Heading; 4] = [Heading::Up, Heading::Down, Heading::Left, Heading::Right];

    /// Calculate next position from current position and heading
    pub fn next_position(&self, pos: Position) -> Position {
        match self {
            Heading::None => pos,
            Heading::Up => Position { x: pos.x, y: pos.y - 1 },
            Heading::Down => Position { x: pos.x, y: pos.y + 1 },
            Heading::Left => Position { x: pos.x - 1, y: pos.y },
            Heading::Right => Position { x: pos.x + 1, y: pos.y },
        }
    }

    pub fn opposite(&self) -> Heading {
        match self {
            Heading::None => Heading::None,
            Heading::Up => Heading::Down,
            Heading::Down => Heading::Up,
            Heading::Left => Heading::Right,
            Heading::Right => Heading::Left,
        }
    }

    /// Glyph axis for heads and trail segments. A stationary cycle is drawn upright.
    pub fn axis(&self) -> Axis {
        match self {
            Heading::Left | Heading::Right => Axis::Horizontal,
            Heading::None | Heading::Up | Heading::Down => Axis::Vertical,
        }
    }
}

// Orientation of a drawn segment; carries no meaning for the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}
