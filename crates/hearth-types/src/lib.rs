//! Shared type definitions for the Hearth simulation.
//!
//! This crate is the single source of truth for all types used across the
//! Hearth workspace. It holds pure immutable data only -- no I/O, no
//! services, no storage.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifier wrappers and the agent-name key
//! - [`geometry`] -- Grid positions, directions, compass points, rectangles
//! - [`world`] -- Terrain, cells, world objects, structures, world meta
//! - [`agent`] -- Resources, items, inventories, journeys, agent records
//! - [`social`] -- Invitations and conversations
//! - [`actions`] -- The closed 27-action vocabulary and action results
//! - [`events`] -- The event union covering every observable state change
//! - [`perception`] -- Perception payload delivered to agents each turn

pub mod actions;
pub mod agent;
pub mod events;
pub mod geometry;
pub mod ids;
pub mod perception;
pub mod social;
pub mod world;

// Re-export all public types at crate root for convenience.
pub use actions::{Action, ActionResult, CraftVerb, LookDirection, tool_schemas};
pub use agent::{Agent, Inventory, Item, Journey, ResourceKind};
pub use events::{Event, EventKind, InterruptReason, WakeReason};
pub use geometry::{CompassPoint, Direction, Position, Rect};
pub use ids::{AgentName, ConversationId, InvitationId, ItemId, ObjectId, StructureId};
pub use perception::{
    CellView, ConversationView, DistanceBucket, GridView, InvitationView, JourneyView, Perception,
    PresenceReading, SelfView, TurnView, VisibleAgent, VisibleObject,
};
pub use social::{Conversation, ConversationTurn, Invitation, InvitationStatus, Participant, Privacy};
pub use world::{Cell, NamedPlace, ObjectKind, Structure, Terrain, TimeOfDay, Weather, WorldMeta, WorldObject};
