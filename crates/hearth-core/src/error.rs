//! Engine-level errors.

/// Errors that abort a tick or the whole run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Storage failed. Fatal to the tick: everything rolls back, the tick
    /// counter does not advance, and the caller decides whether to stop.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying database error.
        #[from]
        source: hearth_db::DbError,
    },

    /// The reasoner backend failed terminally (bad credentials, dead
    /// endpoint). Individual timeouts are handled in-tick; this is fatal
    /// to the run.
    #[error("terminal reasoner error: {message}")]
    ReasonerTerminal {
        /// What the backend reported.
        message: String,
    },

    /// An invariant sweep found an impossible state. The tick is aborted
    /// and the last committed state preserved.
    #[error("invariant violated: {source}")]
    Invariant {
        /// The violation found.
        #[from]
        source: hearth_agents::InvariantViolation,
    },

    /// A world operation failed outside an action handler.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: hearth_world::WorldError,
    },

    /// Configuration could not be loaded.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: crate::config::ConfigError,
    },
}
