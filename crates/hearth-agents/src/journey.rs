//! A* journey planning on the world grid.
//!
//! The navigable graph is the world service's `can_step` relation: cardinal
//! steps onto passable terrain through unwalled (or doored) edges. The
//! heuristic is Manhattan distance; ties are broken by lower `(y, x)` so
//! planning is fully deterministic.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use hearth_types::{Direction, Position};
use hearth_world::WorldGrid;

/// A* priority entry: `(f, y, x)` under `Reverse` for a min-heap. Lower
/// f-score wins; among equals, the lower `(y, x)` position.
type QueueEntry = Reverse<(u32, u32, u32)>;

/// Plan the shortest path from `from` to `to`, inclusive of both ends.
///
/// Returns `None` when the goal is unreachable, out of bounds, impassable,
/// or equal to the start. The returned path's successive positions differ
/// by one cardinal step and every step satisfies `can_step`.
pub fn plan_path(grid: &WorldGrid, from: Position, to: Position) -> Option<Vec<Position>> {
    if from == to || !grid.passable(to) || !grid.passable(from) {
        return None;
    }

    let mut open: BinaryHeap<QueueEntry> = BinaryHeap::new();
    let mut g_score: BTreeMap<Position, u32> = BTreeMap::new();
    let mut came_from: BTreeMap<Position, Position> = BTreeMap::new();
    // Positions are recovered from the queue entry's (y, x).
    g_score.insert(from, 0);
    open.push(Reverse((from.manhattan(to), from.y, from.x)));

    while let Some(Reverse((_, y, x))) = open.pop() {
        let current = Position::new(x, y);
        if current == to {
            return Some(reconstruct(&came_from, from, to));
        }
        let current_g = g_score.get(&current).copied().unwrap_or(u32::MAX);

        for direction in Direction::ALL {
            if !grid.can_step(current, direction) {
                continue;
            }
            let Some(next) = current.step(direction) else {
                continue;
            };
            let tentative = current_g.saturating_add(1);
            if tentative < g_score.get(&next).copied().unwrap_or(u32::MAX) {
                g_score.insert(next, tentative);
                came_from.insert(next, current);
                let f = tentative.saturating_add(next.manhattan(to));
                open.push(Reverse((f, next.y, next.x)));
            }
        }
    }

    None
}

fn reconstruct(
    came_from: &BTreeMap<Position, Position>,
    from: Position,
    to: Position,
) -> Vec<Position> {
    let mut path = vec![to];
    let mut current = to;
    while current != from {
        let Some(prev) = came_from.get(&current) else {
            break;
        };
        path.push(*prev);
        current = *prev;
    }
    path.reverse();
    path
}
