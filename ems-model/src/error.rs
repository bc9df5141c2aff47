use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Invalid static parameters. Raised before any generation runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A mutation operator was applied without a valid donor or recipient station.
    #[error("infeasible mutation `{operator}`: {reason}")]
    InfeasibleMutation {
        operator: &'static str,
        reason: String,
    },

    /// The utilisation fixed-point solve ran out of iterations.
    #[error("utilisation solve did not converge after {iterations} iterations (residual {residual:e})")]
    NumericDivergence { iterations: usize, residual: f64 },

    /// Tensor dimensions disagree between inputs.
    #[error("shape mismatch for {what}: expected {expected}, found {found}")]
    InputShape {
        what: &'static str,
        expected: String,
        found: String,
    },
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn infeasible(operator: &'static str, reason: impl Into<String>) -> Self {
        Error::InfeasibleMutation {
            operator,
            reason: reason.into(),
        }
    }

    pub fn shape(what: &'static str, expected: impl std::fmt::Debug, found: impl std::fmt::Debug) -> Self {
        Error::InputShape {
            what,
            expected: format!("{:?}", expected),
            found: format!("{:?}", found),
        }
    }
}
