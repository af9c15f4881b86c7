use snafu::Snafu;

use super::StudyError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub), display("{kind} network error: {info}"))]
pub struct NetworkError {
    pub info: String,
    pub kind: NetworkErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum NetworkErrorKind {
    Offline,
    Timeout,
    Other,
}

impl From<reqwest::Error> for StudyError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else if err.is_connect() {
            NetworkErrorKind::Offline
        } else {
            NetworkErrorKind::Other
        };
        // urls may carry query-string credentials for some providers
        let info = err.without_url().to_string();

        StudyError::Network {
            source: NetworkError { info, kind },
        }
    }
}
