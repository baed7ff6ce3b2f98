//! The Hearth engine: the six-phase tick pipeline and everything that
//! orchestrates it.
//!
//! One [`Engine`] owns one world. Per tick it expires invitations, wakes
//! sleepers, schedules clusters, advances journeys, runs agent turns
//! against the external reasoner, and commits all accumulated events in a
//! single storage transaction. Cluster turns run concurrently on the
//! engine's single worker thread; the only suspension points are the
//! reasoner and narrator calls.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration
//! - [`reasoner`] -- the turn-taking oracle trait and the scripted stub
//! - [`narrator`] -- structured-result-to-prose trait and local fallback
//! - [`perception`] -- perception assembly and the meeting ledger
//! - [`scheduler`] -- acting set and cluster formation
//! - [`operator`] -- observer command queue
//! - [`tick`] -- the `tick_once` orchestrator
//! - [`runner`] -- the multi-tick run loop

pub mod config;
pub mod error;
pub mod narrator;
pub mod operator;
pub mod perception;
pub mod reasoner;
pub mod runner;
pub mod scheduler;
pub mod tick;

pub use config::EngineConfig;
pub use error::EngineError;
pub use narrator::{MessageNarrator, Narrator};
pub use operator::{CommandQueue, ObserverCommand};
pub use reasoner::{Reasoner, ReasonerError, ScriptedReasoner, TurnReply};
pub use tick::{Engine, TickOutcome};
