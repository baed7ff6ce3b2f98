//! Seeded starting-terrain generation.
//!
//! A one-shot producer used by `init`: scatters terrain patches over the
//! default grass plain and rings water with coast. Deterministic for a
//! given seed. The engine never calls this after initialisation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use hearth_types::{Position, Terrain};

use crate::error::WorldError;
use crate::grid::WorldGrid;

/// Rough fraction of the map covered by each scattered terrain, in
/// patches per 1024 cells.
const PATCHES_PER_KCELL: u32 = 3;

/// Generate terrain into a fresh grid of the given size.
///
/// Scatters irregular blobs of forest, stone, sand and hill, digs a lake,
/// and rings the water with coast. Cells not touched stay default grass
/// (and therefore unstored).
pub fn generate_terrain(width: u32, height: u32, seed: u64) -> Result<WorldGrid, WorldError> {
    let mut grid = WorldGrid::new(width, height);
    let mut rng = StdRng::seed_from_u64(seed);

    let area = width.saturating_mul(height);
    let patches = area.saturating_mul(PATCHES_PER_KCELL) / 1024;
    let patches = patches.max(1);

    for terrain in [Terrain::Forest, Terrain::Stone, Terrain::Sand, Terrain::Hill] {
        for _ in 0..patches {
            scatter_blob(&mut grid, &mut rng, terrain, 2..5)?;
        }
    }

    // One lake, coast-ringed.
    scatter_blob(&mut grid, &mut rng, Terrain::Water, 2..4)?;
    ring_water_with_coast(&mut grid)?;

    info!(width, height, seed, "terrain generated");
    Ok(grid)
}

/// Paint a rough blob of `terrain` at a random centre.
fn scatter_blob(
    grid: &mut WorldGrid,
    rng: &mut StdRng,
    terrain: Terrain,
    radius_range: core::ops::Range<u32>,
) -> Result<(), WorldError> {
    let width = grid.width();
    let height = grid.height();
    if width == 0 || height == 0 {
        return Ok(());
    }

    let cx = rng.random_range(0..width);
    let cy = rng.random_range(0..height);
    let radius = rng.random_range(radius_range);

    let min_x = cx.saturating_sub(radius);
    let min_y = cy.saturating_sub(radius);
    let max_x = cx.saturating_add(radius).min(width.saturating_sub(1));
    let max_y = cy.saturating_add(radius).min(height.saturating_sub(1));

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let pos = Position::new(x, y);
            // Chebyshev disc with ragged edges.
            let edge = pos.chebyshev(Position::new(cx, cy)) == radius;
            if edge && rng.random_range(0..3) == 0 {
                continue;
            }
            grid.set_terrain(pos, terrain)?;
        }
    }
    Ok(())
}

/// Turn every grass cell adjacent to water into coast.
fn ring_water_with_coast(grid: &mut WorldGrid) -> Result<(), WorldError> {
    let water: Vec<Position> = grid
        .stored_cells()
        .iter()
        .filter(|(_, cell)| cell.terrain == Terrain::Water)
        .map(|(pos, _)| *pos)
        .collect();

    for pos in water {
        for direction in hearth_types::Direction::ALL {
            let Some(next) = pos.step(direction) else {
                continue;
            };
            if !grid.in_bounds(next) {
                continue;
            }
            if grid.get_cell(next).terrain == Terrain::Grass {
                grid.set_terrain(next, Terrain::Coast)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic_for_a_seed() {
        let a = generate_terrain(48, 48, 7).ok();
        let b = generate_terrain(48, 48, 7).ok();
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let a = generate_terrain(48, 48, 7).ok();
        let b = generate_terrain(48, 48, 8).ok();
        assert_ne!(a, b);
    }

    #[test]
    fn water_is_ringed_with_coast() {
        let Some(grid) = generate_terrain(48, 48, 21).ok() else {
            assert!(false, "generation failed");
            return;
        };
        for (pos, cell) in grid.stored_cells() {
            if cell.terrain != Terrain::Water {
                continue;
            }
            for direction in hearth_types::Direction::ALL {
                let Some(next) = pos.step(direction) else {
                    continue;
                };
                if grid.in_bounds(next) {
                    let neighbour = grid.get_cell(next).terrain;
                    assert_ne!(neighbour, Terrain::Grass, "bare grass beside water at {next}");
                }
            }
        }
    }
}
