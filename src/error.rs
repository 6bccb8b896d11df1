//! Error taxonomy for the simulation engine.

use thiserror::Error;

/// Boxed error returned by a [`crate::sim::handler::ConnectionHandler`].
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the engine, the data log, and the topology model.
#[derive(Debug, Error)]
pub enum SimError {
    /// A construction or run parameter is out of its allowed range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Constraint that was violated.
        reason: String,
    },

    /// An operation was invoked in a state that does not permit it.
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    /// An entity's attributes do not match the schema declared for its type.
    #[error("schema mismatch for {entity}: {reason}")]
    Schema {
        /// Entity description (`type/id` or connection type).
        entity: String,
        /// What did not match.
        reason: String,
    },

    /// A connection handler failed; the run is aborted.
    #[error("handler for `{connection_type}` failed at tick {tick}: {source}")]
    Handler {
        /// Connection type whose handler failed.
        connection_type: String,
        /// Tick at which the failure occurred.
        tick: u64,
        /// Error raised by the handler.
        source: HandlerError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl SimError {
    /// Shorthand for [`SimError::InvalidParameter`].
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`SimError::Schema`].
    pub fn schema(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for [`SimError::InvalidParameter`].
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, Self::InvalidParameter { .. })
    }

    /// Returns `true` for [`SimError::PreconditionViolation`].
    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, Self::PreconditionViolation(_))
    }
}

/// A type alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_message_names_field() {
        let err = SimError::invalid("timestep", "must be > 0");
        assert!(err.is_invalid_parameter());
        assert_eq!(err.to_string(), "invalid parameter `timestep`: must be > 0");
    }

    #[test]
    fn handler_error_keeps_source() {
        let err = SimError::Handler {
            connection_type: "aggregator_to_utility".into(),
            tick: 3,
            source: "boom".into(),
        };
        assert!(err.to_string().contains("tick 3"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
