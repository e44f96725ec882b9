//! Error types for guidedesk.

use thiserror::Error;

/// Library-level error.
///
/// The request dispatcher never returns this type: provider failures are
/// converted into fallback answers. It covers configuration and guide loading.
#[derive(Debug, Error)]
pub enum GuideError {
    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Guide fixture could not be interpreted.
    #[error("Guide error: {0}")]
    Guide(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GuideError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = GuideError::Config("missing model".into());
        assert_eq!(err.to_string(), "Configuration error: missing model");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: GuideError = io.into();
        assert!(matches!(err, GuideError::Io(_)));
        assert!(err.to_string().contains("gone"));
    }
}
