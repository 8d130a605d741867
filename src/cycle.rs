// Cycle Module - Per-combatant state: position, heading and bounded trail
use std::collections::VecDeque;

use crate::collision::CellSet;
use crate::types::{Axis, Heading, Position};

// One remembered cell of a trail, tagged with the axis it was crossed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailSegment {
    pub pos: Position,
    pub axis: Axis,
}

/// Oldest-first history of occupied cells with a fixed capacity (FIFO eviction)
#[derive(Debug, Clone)]
pub struct Trail {
    segments: VecDeque<TrailSegment>,
    capacity: usize,
}

impl Trail {
    pub fn with_capacity(capacity: usize) -> Self {
        Trail {
            segments: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a segment, evicting the oldest one once capacity is exceeded
    pub fn push(&mut self, segment: TrailSegment) {
        self.segments.push_back(segment);
        while self.segments.len() > self.capacity {
            self.segments.pop_front();
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrailSegment> {
        self.segments.iter()
    }

    #[cfg(test)]
    pub fn newest(&self) -> Option<&TrailSegment> {
        self.segments.back()
    }

    pub fn contains(&self, cell: Position) -> bool {
        self.segments.iter().any(|segment| segment.pos == cell)
    }
}

impl CellSet for Trail {
    fn contains_cell(&self, cell: Position) -> bool {
        self.contains(cell)
    }
}

/// A lightcycle. Fields are only mutated by the round after both survival checks.
#[derive(Debug, Clone)]
pub struct LightCycle {
    pos: Position,
    heading: Heading,
    trail: Trail,
}

impl LightCycle {
    pub fn new(pos: Position, heading: Heading, max_trail_length: usize) -> Self {
        LightCycle {
            pos,
            heading,
            trail: Trail::with_capacity(max_trail_length),
        }
    }

    pub fn pos(&self) -> Position {
        self.pos
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    /// Apply a requested heading. A 180 degree reversal while moving is ignored,
    /// as is a request to stop. Returns whether the heading changed.
    pub fn steer(&mut self, requested: Heading) -> bool {
        if requested == Heading::None || requested == self.heading {
            return false;
        }
        if self.heading != Heading::None && requested == self.heading.opposite() {
            return false;
        }
        self.heading = requested;
        true
    }

    /// Cell one unit along `heading`; does not move the cycle
    pub fn advance(&self, heading: Heading) -> Position {
        heading.next_position(self.pos)
    }

    /// Finalize a surviving move: take the new cell and record it on the trail
    pub fn commit(&mut self, pos: Position) {
        self.pos = pos;
        self.record_trail();
    }

    /// Report the fatal cell as the cycle's position without extending the trail
    pub fn crash_at(&mut self, pos: Position) {
        self.pos = pos;
    }

    fn record_trail(&mut self) {
        self.trail.push(TrailSegment {
            pos: self.pos,
            axis: self.heading.axis(),
        });
    }
}
