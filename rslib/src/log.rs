use std::fs;
use std::path::Path;

use once_cell::sync::OnceCell;
use tracing::subscriber::set_global_default;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{OrInvalid, Result};

const DEFAULT_FILTER: &str = "info";

/// Installs the process-wide subscriber: stderr always, plus `path` when
/// given. `RUST_LOG` overrides the default filter. Later calls are no-ops.
pub fn set_global_logger(path: Option<&Path>) -> Result<()> {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_try_init(|| -> Result<()> {
        let file_layer = match path {
            Some(path) => Some(
                fmt::layer()
                    .with_writer(file_appender(path)?)
                    .with_ansi(false)
                    .with_target(false),
            ),
            None => None,
        };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let subscriber = tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .with(file_layer)
            .with(filter);
        set_global_default(subscriber).or_invalid("global subscriber already set")?;
        Ok(())
    })?;
    Ok(())
}

fn file_appender(path: &Path) -> Result<RollingFileAppender> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .or_invalid("log file path must end in a file name")?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .or_invalid("could not open log file")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_directory_like_path() {
        let err = file_appender(Path::new("/")).unwrap_err();
        assert_eq!(err.status(), 400);
    }
}
