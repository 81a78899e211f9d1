//! Error types for the simulation boundary.
//!
//! The engine itself has no recoverable failure modes: contract violations
//! (applying an illegal action, advancing by zero ticks, resolving a cast the
//! mana pool cannot pay for) panic. `SimError` covers the edges where input
//! arrives from outside the crate: configuration files, caller-supplied stats
//! and action indices coming through the Python bindings.

use thiserror::Error;

/// Errors surfaced at configuration and binding boundaries.
#[derive(Debug, Error)]
pub enum SimError {
    /// A stat multiplier was non-finite or not strictly positive.
    #[error("invalid stats: {0}")]
    InvalidStats(String),

    /// A raw attribute was below its level base value.
    #[error("invalid attributes: {0}")]
    InvalidAttributes(String),

    /// A run configuration could not be parsed.
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    /// An action was applied outside the current legal set.
    #[error("action {action} is not legal at tick {tick}")]
    IllegalAction {
        /// Debug name of the rejected action.
        action: String,
        /// Clock value at which it was rejected.
        tick: u64,
    },

    /// An action index did not name any action.
    #[error("unknown action index {0}")]
    UnknownAction(usize),
}

/// Convenience alias for results carrying a [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_action_message_names_action_and_tick() {
        let err = SimError::IllegalAction {
            action: "Fire4".to_string(),
            tick: 250,
        };
        assert_eq!(err.to_string(), "action Fire4 is not legal at tick 250");
    }

    #[test]
    fn config_errors_convert_from_serde() {
        let parse: std::result::Result<u64, _> = serde_json::from_str("not json");
        let err: SimError = parse.unwrap_err().into();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }
}
