//! Geography for the Hearth simulation: the sparse grid, wall and door
//! placement, structure detection, named places, and vision helpers.
//!
//! The world service is a stateless façade over [`WorldGrid`]: every query
//! answers from the grid, nothing is cached. All wall mutations pass
//! through the grid's symmetric placement routine so the two sides of an
//! edge can never disagree.

pub mod error;
pub mod grid;
pub mod starting_world;
pub mod structure;
pub mod vision;
pub mod weather;

pub use error::WorldError;
pub use grid::WorldGrid;
pub use starting_world::generate_terrain;
pub use structure::{detect_enclosure, refresh_structures, StructureChange};
pub use vision::effective_vision;
pub use weather::WeatherSystem;
