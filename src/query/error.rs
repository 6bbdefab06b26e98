//! Query builder error types
//!
//! Every failure is an argument check raised by the builder call that
//! received the bad value. Assembling the final expression cannot fail.

use thiserror::Error;

/// Errors raised by builder calls
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// An argument violated its constraint
    #[error("invalid argument '{param}': {constraint}")]
    InvalidArgument {
        /// Name of the offending parameter
        param: &'static str,
        /// The violated constraint
        constraint: &'static str,
    },
}

impl QueryError {
    /// Create an invalid-argument error
    pub fn invalid(param: &'static str, constraint: &'static str) -> Self {
        Self::InvalidArgument { param, constraint }
    }

    /// Name of the parameter that was rejected
    pub fn param(&self) -> &'static str {
        match self {
            Self::InvalidArgument { param, .. } => param,
        }
    }
}

/// Result type for builder calls
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::invalid("label", "must not be blank");
        assert_eq!(err.to_string(), "invalid argument 'label': must not be blank");
        assert_eq!(err.param(), "label");
    }
}
