//! Task outcomes and the opaque failure payload.
//!
//! A task settles at most once, with either [`Outcome::Success`] or
//! [`Outcome::Failure`]. Cancellation is not an outcome: a cancelled task simply
//! has none.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::error::TaskError;

/// The settled result of a [`Task`](crate::Task).
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<V> {
    Success(V),
    Failure(Failure),
}

impl<V> Outcome<V> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// The success value, if any.
    pub fn value(&self) -> Option<&V> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    /// The failure, if any.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<V, Failure> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(failure) => Err(failure),
        }
    }

    /// Transform the success value, forwarding a failure untouched.
    pub fn map<U, F: FnOnce(V) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failure(failure) => Outcome::Failure(failure),
        }
    }
}

impl<V> From<Result<V, Failure>> for Outcome<V> {
    fn from(result: Result<V, Failure>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(failure) => Outcome::Failure(failure),
        }
    }
}

/// Application-defined error carried by [`Outcome::Failure`].
///
/// Cloning is cheap and keeps the same underlying error instance, which is how a
/// failure travels unchanged down a chain. Two failures compare equal only when
/// they share that instance.
///
/// ```
/// use tasklane::Failure;
///
/// let failure = Failure::msg("login rejected");
/// let forwarded = failure.clone();
///
/// assert_eq!(failure, forwarded);
/// assert_ne!(failure, Failure::msg("login rejected"));
/// ```
#[derive(Clone)]
pub struct Failure(Arc<dyn Error + Send + Sync + 'static>);

impl Failure {
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Failure(Arc::new(error))
    }

    /// A failure holding only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Failure::new(Message(message.into()))
    }

    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.0
    }

    /// Attempt to view the payload as a concrete error type.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    /// True when both failures carry the same error instance.
    pub fn ptr_eq(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Failure {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl Error for Failure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

impl From<TaskError> for Failure {
    fn from(error: TaskError) -> Self {
        Failure::new(error)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Message(String);
