use thiserror::Error;

/// Errors raised by the I/O, walking and filter layers.
///
/// Tokenizers never fail: malformed content degrades to spaces or skipped
/// fields. Everything here is about getting bytes in and words out.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// File system I/O operation failed
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// File exceeds maximum allowed size
    #[error("file too large: {size} bytes (max: {max})")]
    FileTooLarge { size: u64, max: u64 },

    /// Directory walk or gitignore error
    #[error("walk error in '{path}': {source}")]
    Walk {
        path: String,
        #[source]
        source: ignore::Error,
    },

    /// Invalid CLI configuration value
    #[error("invalid {field}: {value} ({reason})")]
    ConfigInvalid { field: String, value: String, reason: String },

    /// External filter could not be run or exited unsuccessfully
    #[error("filter '{command}' failed: {reason}")]
    Filter { command: String, reason: String },

    /// JSON serialization error
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl From<ignore::Error> for ExtractError {
    fn from(source: ignore::Error) -> Self {
        Self::Walk { path: String::new(), source }
    }
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Exit codes for the CLI application.
///
/// Based on BSD sysexits.h conventions for meaningful exit statuses.
/// Use `ExitCode::into()` to convert to `std::process::ExitCode`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Successful execution
    Ok = 0,
    /// General software error (internal error, unexpected state)
    Software = 1,
    /// Invalid input data (bad configuration value)
    DataErr = 2,
    /// I/O error (file not found, permission denied on files)
    IoErr = 3,
    /// No input provided (missing required arguments)
    NoInput = 4,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}

impl ExtractError {
    /// Exit code the CLI reports for this error.
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Io { .. } | Self::FileTooLarge { .. } | Self::Walk { .. } => ExitCode::IoErr,
            Self::ConfigInvalid { .. } => ExitCode::DataErr,
            Self::Filter { .. } | Self::Json { .. } => ExitCode::Software,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        // Verify exit codes match BSD sysexits.h conventions
        assert_eq!(ExitCode::Ok as u8, 0);
        assert_eq!(ExitCode::Software as u8, 1);
        assert_eq!(ExitCode::DataErr as u8, 2);
        assert_eq!(ExitCode::IoErr as u8, 3);
        assert_eq!(ExitCode::NoInput as u8, 4);
    }

    #[test]
    fn test_extract_error_display() {
        let error = ExtractError::FileTooLarge { size: 2_000_000, max: 1_000_000 };
        let display = format!("{error}");
        assert!(display.contains("2000000"));
        assert!(display.contains("1000000"));
    }

    #[test]
    fn test_extract_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ExtractError = io_error.into();
        assert!(matches!(error, ExtractError::Io { .. }));
        assert_eq!(error.exit_code(), ExitCode::IoErr);
    }

    #[test]
    fn test_filter_error_display() {
        let error =
            ExtractError::Filter { command: "pdftotext".into(), reason: "exit status 1".into() };
        let display = format!("{error}");
        assert!(display.contains("pdftotext"));
        assert_eq!(error.exit_code(), ExitCode::Software);
    }

    #[test]
    fn test_config_error_is_data_err() {
        let error = ExtractError::ConfigInvalid {
            field: "ext".into(),
            value: "foo".into(),
            reason: "expected ext:format".into(),
        };
        assert_eq!(error.exit_code(), ExitCode::DataErr);
    }
}
