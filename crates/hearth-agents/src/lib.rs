//! Agent state and the action engine for the Hearth simulation.
//!
//! This crate owns the roster (agents keyed by unique name), checked
//! inventory arithmetic, A* journey planning, coarse presence sensing, the
//! data-driven crafting recipe book, and the closed 27-action engine that
//! turns reasoner tool calls into events.
//!
//! # Modules
//!
//! - [`roster`] -- agent registry and the meeting ledger
//! - [`inventory`] -- stack and item operations, all checked
//! - [`journey`] -- A* path planning on the world grid
//! - [`sensing`] -- categorical presence readings
//! - [`crafting`] -- the recipe table and lookup
//! - [`state`] -- the full mutable simulation state and invariant sweep
//! - [`actions`] -- validation and execution of every action

pub mod actions;
pub mod crafting;
pub mod error;
pub mod inventory;
pub mod journey;
pub mod roster;
pub mod sensing;
pub mod state;

pub use actions::{ActionContext, ActionOutcome, execute_action};
pub use crafting::{Recipe, RecipeBook, RecipeOutput};
pub use error::AgentError;
pub use journey::plan_path;
pub use roster::Roster;
pub use state::{InvariantViolation, SimState};
