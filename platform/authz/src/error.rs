use thiserror::Error;

use crate::entity::Kind;

/// Boxed error returned by fallible condition predicates.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A dynamic condition was neither null, an attribute object nor a predicate.
    #[error("Expected condition to be object or function, got {received}")]
    InvalidCondition { received: &'static str },

    #[error("a rule needs at least one action")]
    NoActions,

    /// A condition predicate failed. The predicate's own error is the source.
    #[error("condition predicate failed: {0}")]
    Condition(#[source] BoxError),

    #[error("Authorization error: {performer} cannot {action} {target}")]
    Unauthorized {
        performer: Kind,
        action: String,
        target: String,
    },
}

impl Error {
    /// Returns the predicate error carried by [`Error::Condition`], if any.
    pub fn predicate_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Error::Condition(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized { .. })
    }
}

/// Why `authorize` refused: a failing condition predicate, or a denial built
/// by the engine's error factory and carried as-is.
#[derive(Debug, Error)]
pub enum Denial<E> {
    #[error(transparent)]
    Condition(Error),

    #[error("{0}")]
    Denied(E),
}

impl<E> Denial<E> {
    /// The factory-built error, when no predicate failed.
    pub fn denied(&self) -> Option<&E> {
        match self {
            Denial::Denied(err) => Some(err),
            Denial::Condition(_) => None,
        }
    }

    pub fn into_denied(self) -> Option<E> {
        match self {
            Denial::Denied(err) => Some(err),
            Denial::Condition(_) => None,
        }
    }

    pub fn is_condition(&self) -> bool {
        matches!(self, Denial::Condition(_))
    }
}

impl From<Denial<Error>> for Error {
    fn from(value: Denial<Error>) -> Self {
        match value {
            Denial::Condition(err) | Denial::Denied(err) => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("lookup failed")]
    struct LookupFailed;

    #[test]
    fn invalid_condition_names_received_type() {
        let err = Error::InvalidCondition { received: "string" };
        assert_eq!(
            err.to_string(),
            "Expected condition to be object or function, got string"
        );
    }

    #[test]
    fn condition_error_keeps_predicate_error() {
        let err = Error::Condition(Box::new(LookupFailed));
        let inner = err.predicate_error().expect("predicate error present");
        assert!(inner.downcast_ref::<LookupFailed>().is_some());
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn unauthorized_message_carries_context() {
        let err = Error::Unauthorized {
            performer: Kind::new("User"),
            action: "delete".into(),
            target: "Product".into(),
        };
        assert!(err.is_unauthorized());
        assert_eq!(
            err.to_string(),
            "Authorization error: User cannot delete Product"
        );
    }

    #[test]
    fn denial_flattens_into_engine_error() {
        let denial: Denial<Error> = Denial::Denied(Error::Unauthorized {
            performer: Kind::new("User"),
            action: "read".into(),
            target: "Product".into(),
        });
        assert!(!denial.is_condition());
        assert!(Error::from(denial).is_unauthorized());

        let denial: Denial<String> = Denial::Condition(Error::Condition(Box::new(LookupFailed)));
        assert!(denial.is_condition());
        assert_eq!(denial.to_string(), "condition predicate failed: lookup failed");
        assert!(denial.into_denied().is_none());
    }
}
