//! Consent-based social state for the Hearth simulation.
//!
//! Agents talk only by consent: an invitation must be accepted, or a
//! public conversation joined by naming a visible participant. This crate
//! owns the invitation and conversation state machines; visibility checks
//! stay with the action engine (they need the world).
//!
//! # Invariants
//!
//! - An agent belongs to at most one active conversation at a time.
//! - A conversation ends when its last participant leaves; it never
//!   reopens.
//! - Records are never deleted -- invitations reach a terminal status and
//!   conversations gain an `ended_tick`.

pub mod error;
pub mod ledger;

pub use error::SocialError;
pub use ledger::{AcceptOutcome, SocialLedger};
