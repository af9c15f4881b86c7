mod invalid_input;
mod network;

pub use invalid_input::{InvalidInputError, OrInvalid};
pub use network::{NetworkError, NetworkErrorKind};
use snafu::Snafu;

pub type Result<T, E = StudyError> = std::result::Result<T, E>;

/// Errors raised anywhere in the completion pipeline, from the proxy boundary
/// down to response extraction.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StudyError {
    #[snafu(display("method not allowed"))]
    MethodNotAllowed,
    #[snafu(context(false), display("{source}"))]
    InvalidInput { source: InvalidInputError },
    /// Missing credential or unusable configuration. The message is for the
    /// server log only; callers receive a generic one.
    #[snafu(display("configuration error: {message}"))]
    Configuration { message: String },
    #[snafu(display("upstream error {status}: {message}"))]
    Upstream { status: u16, message: String },
    #[snafu(display("{provider} returned no text"))]
    EmptyResponse { provider: &'static str },
    #[snafu(display("could not parse response: {message}"))]
    Parse { message: String },
    #[snafu(display("malformed content: {message}"))]
    MalformedContent { message: String },
    #[snafu(context(false), display("{source}"))]
    Network { source: NetworkError },
    #[snafu(display("a {kind} request is already in progress"))]
    InFlight { kind: &'static str },
    #[snafu(context(false), display("{source}"))]
    Io { source: std::io::Error },
}

impl StudyError {
    /// HTTP status reflecting the failure category.
    pub fn status(&self) -> u16 {
        match self {
            StudyError::MethodNotAllowed => 405,
            StudyError::InvalidInput { .. } => 400,
            StudyError::Configuration { .. } => 500,
            StudyError::Upstream { status, .. } => *status,
            StudyError::EmptyResponse { .. } => 502,
            StudyError::Parse { .. } | StudyError::MalformedContent { .. } => 422,
            StudyError::Network { source } => match source.kind {
                NetworkErrorKind::Timeout => 504,
                NetworkErrorKind::Offline | NetworkErrorKind::Other => 502,
            },
            StudyError::InFlight { .. } => 409,
            StudyError::Io { .. } => 500,
        }
    }

    /// Message safe to hand back to a remote caller.
    pub fn caller_message(&self) -> String {
        match self {
            StudyError::MethodNotAllowed => "Method Not Allowed. Use POST.".into(),
            StudyError::InvalidInput { source } => source.message.clone(),
            StudyError::Configuration { .. } => {
                "Server configuration error: API key missing.".into()
            }
            StudyError::Upstream { message, .. } => message.clone(),
            StudyError::EmptyResponse { provider } => format!("Empty response from {provider}."),
            StudyError::Parse { .. } | StudyError::MalformedContent { .. } => self.to_string(),
            StudyError::Network { source } => match source.kind {
                NetworkErrorKind::Timeout => "Timed out waiting for the AI provider.".into(),
                NetworkErrorKind::Offline | NetworkErrorKind::Other => {
                    format!("Failed to reach the AI provider: {}", source.info)
                }
            },
            StudyError::InFlight { .. } => self.to_string(),
            StudyError::Io { .. } => "Internal server error.".into(),
        }
    }

    /// True when the model answered but not in the requested shape.
    pub fn is_extraction_failure(&self) -> bool {
        matches!(
            self,
            StudyError::Parse { .. } | StudyError::MalformedContent { .. }
        )
    }
}
