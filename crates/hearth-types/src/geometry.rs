//! Grid geometry: positions, directions, compass points, rectangles.
//!
//! Positions are pairs of non-negative integers; the world service enforces
//! the upper bounds. All arithmetic here is checked -- stepping off the
//! low edge of the grid yields `None` rather than wrapping.

use serde::{Deserialize, Serialize};

/// A cell coordinate on the world grid.
///
/// Ordered lexicographically on `(x, y)` so positions can be used as
/// deterministic map keys. The y axis grows southward: `North` is `y - 1`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Position {
    /// Column, 0-based from the west edge.
    pub x: u32,
    /// Row, 0-based from the north edge.
    pub y: u32,
}

impl Position {
    /// Create a position from raw coordinates.
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// The neighbouring position one step in `direction`, or `None` if the
    /// step would leave the non-negative quadrant. Upper bounds are the
    /// world service's concern.
    pub const fn step(self, direction: Direction) -> Option<Self> {
        let (x, y) = match direction {
            Direction::North => {
                let Some(y) = self.y.checked_sub(1) else {
                    return None;
                };
                (self.x, y)
            }
            Direction::South => {
                let Some(y) = self.y.checked_add(1) else {
                    return None;
                };
                (self.x, y)
            }
            Direction::West => {
                let Some(x) = self.x.checked_sub(1) else {
                    return None;
                };
                (x, self.y)
            }
            Direction::East => {
                let Some(x) = self.x.checked_add(1) else {
                    return None;
                };
                (x, self.y)
            }
        };
        Some(Self { x, y })
    }

    /// Chebyshev distance (maximum of axis deltas). Used for vision and
    /// cluster radii.
    pub const fn chebyshev(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy { dx } else { dy }
    }

    /// Manhattan distance (sum of axis deltas). Used as the A* heuristic.
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }

    /// The eight-way compass bucket pointing from `self` toward `other`,
    /// or `None` when the positions coincide.
    pub const fn compass_toward(self, other: Self) -> Option<CompassPoint> {
        let east = other.x > self.x;
        let west = other.x < self.x;
        let south = other.y > self.y;
        let north = other.y < self.y;
        match (north, south, east, west) {
            (true, _, false, false) => Some(CompassPoint::N),
            (true, _, true, _) => Some(CompassPoint::NE),
            (false, false, true, _) => Some(CompassPoint::E),
            (_, true, true, _) => Some(CompassPoint::SE),
            (_, true, false, false) => Some(CompassPoint::S),
            (_, true, _, true) => Some(CompassPoint::SW),
            (false, false, _, true) => Some(CompassPoint::W),
            (true, _, _, true) => Some(CompassPoint::NW),
            _ => None,
        }
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A cardinal movement direction. Movement deltas are ±1 on one axis.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward decreasing y.
    North,
    /// Toward increasing y.
    South,
    /// Toward increasing x.
    East,
    /// Toward decreasing x.
    West,
}

impl Direction {
    /// All four directions in a fixed deterministic order.
    pub const ALL: [Self; 4] = [Self::North, Self::South, Self::East, Self::West];

    /// The opposite direction (the mirror edge of a shared wall).
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
        };
        write!(f, "{s}")
    }
}

/// An eight-way compass bucket used by coarse presence sensing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompassPoint {
    /// Due north.
    N,
    /// North-east quadrant.
    NE,
    /// Due east.
    E,
    /// South-east quadrant.
    SE,
    /// Due south.
    S,
    /// South-west quadrant.
    SW,
    /// Due west.
    W,
    /// North-west quadrant.
    NW,
}

/// An inclusive axis-aligned rectangle of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    /// North-west corner (inclusive).
    pub min: Position,
    /// South-east corner (inclusive).
    pub max: Position,
}

impl Rect {
    /// Build the rectangle of cells within `radius` (Chebyshev) of `center`,
    /// clamped to a `width` × `height` world. Out-of-range cells never
    /// appear: the result always lies fully inside the world bounds.
    pub const fn clamped(center: Position, radius: u32, width: u32, height: u32) -> Self {
        let min = Position::new(
            center.x.saturating_sub(radius),
            center.y.saturating_sub(radius),
        );
        let max_x = match center.x.checked_add(radius) {
            Some(x) => x,
            None => u32::MAX,
        };
        let max_y = match center.y.checked_add(radius) {
            Some(y) => y,
            None => u32::MAX,
        };
        let max = Position::new(
            if max_x >= width { width.saturating_sub(1) } else { max_x },
            if max_y >= height { height.saturating_sub(1) } else { max_y },
        );
        Self { min, max }
    }

    /// Whether `pos` lies inside the rectangle.
    pub const fn contains(&self, pos: Position) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }

    /// Iterate the contained positions in row-major `(y, x)` order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let min = self.min;
        let max = self.max;
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| Position::new(x, y)))
    }
}
