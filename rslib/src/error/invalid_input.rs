use snafu::{Backtrace, Snafu};

use super::{Result, StudyError};

/// General-purpose error for rejected input, surfaced as a bad request.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub), display("{message}"))]
pub struct InvalidInputError {
    pub message: String,
    #[snafu(source(false))]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub backtrace: Option<Backtrace>,
}

/// Returns early with an [StudyError::InvalidInput].
/// Takes a format string literal and an optional source error.
#[macro_export]
macro_rules! invalid_input {
    ($fmt:literal $(, $($arg:expr),* $(,)?)?) => {
        return core::result::Result::Err($crate::error::StudyError::from(
            $crate::error::InvalidInputError {
                message: format!($fmt $(, $($arg),*)*),
                source: None,
                backtrace: None,
            },
        ))
    };
    ($source:expr, $fmt:literal $(, $($arg:expr),* $(,)?)?) => {
        return core::result::Result::Err($crate::error::StudyError::from(
            $crate::error::InvalidInputError {
                message: format!($fmt $(, $($arg),*)*),
                source: Some(Box::new($source)),
                backtrace: None,
            },
        ))
    };
}

/// Converts `None` or an error into an [StudyError::InvalidInput] carrying
/// `message`.
pub trait OrInvalid {
    type Value;
    fn or_invalid(self, message: impl Into<String>) -> Result<Self::Value>;
}

impl<T> OrInvalid for Option<T> {
    type Value = T;

    fn or_invalid(self, message: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| {
            StudyError::from(InvalidInputError {
                message: message.into(),
                source: None,
                backtrace: None,
            })
        })
    }
}

impl<T, E: std::error::Error + Send + Sync + 'static> OrInvalid for Result<T, E> {
    type Value = T;

    fn or_invalid(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|err| {
            StudyError::from(InvalidInputError {
                message: message.into(),
                source: Some(Box::new(err)),
                backtrace: None,
            })
        })
    }
}
