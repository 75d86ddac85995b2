//! Structured error handling with codes, context and recovery suggestions
//!
//! Every failure the resolver can report carries:
//! - An error code for programmatic handling
//! - Optional context describing what was being resolved
//! - An optional recovery suggestion
//! - A serializable report form for `--json` output

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // General errors (1xxx)
    Internal = 1001,

    // IO errors (2xxx)
    IoError = 2000,
    FileNotFound = 2001,
    PermissionDenied = 2002,
    MissingOptionalInput = 2005,

    // Configuration errors (3xxx)
    ConfigError = 3000,
    ConfigNotFound = 3001,
    ConfigParseError = 3002,
    InvalidConfigValue = 3004,
    RulesFileNotFound = 3005,
    UnknownVariant = 3006,

    // Signing errors (4xxx)
    CredentialsParseError = 4001,
    MissingCredentialKey = 4002,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a human-readable category
    pub fn category(&self) -> &'static str {
        match self.code() / 1000 {
            1 => "General",
            2 => "IO",
            3 => "Configuration",
            4 => "Signing",
            _ => "Unknown",
        }
    }

    /// Whether an error with this code must abort the build invocation
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ErrorCode::MissingOptionalInput)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// Main error type with rich context
#[derive(Error, Debug)]
pub struct Error {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional context
    pub context: Option<String>,
    /// Recovery suggestion
    pub suggestion: Option<String>,
    /// Source error
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, "\n  Context: {}", ctx)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl Error {
    /// Create a new error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            suggestion: None,
            source: None,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a recovery suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Convert to a serializable report
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code,
            code_str: self.code.to_string(),
            category: self.code.category().to_string(),
            message: self.message.clone(),
            context: self.context.clone(),
            suggestion: self.suggestion.clone(),
            source: self.source.as_ref().map(|e| e.to_string()),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.code.category() {
            "Configuration" => exit_codes::CONFIG_ERROR,
            "Signing" => exit_codes::SIGNING_ERROR,
            _ => exit_codes::FAILURE,
        }
    }

    // Convenience constructors

    pub fn missing_optional(path: impl AsRef<Path>) -> Self {
        Self::new(
            ErrorCode::MissingOptionalInput,
            format!("Optional input not found: {}", path.as_ref().display()),
        )
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    pub fn config_not_found(path: impl AsRef<Path>) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Configuration file not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Create a varsign.toml file or use --config to specify a path")
    }

    pub fn invalid_value(field: &str, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidConfigValue,
            format!("Invalid value for {}: {}", field, message.into()),
        )
    }

    pub fn rules_file_not_found(path: impl AsRef<Path>) -> Self {
        Self::new(
            ErrorCode::RulesFileNotFound,
            format!("Shrinker rules file not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Create the rules file or remove it from [shrink] in varsign.toml")
    }

    pub fn unknown_variant(name: &str) -> Self {
        Self::new(
            ErrorCode::UnknownVariant,
            format!("Unknown build variant: {}", name),
        )
        .with_suggestion("Use one of: debug, release")
    }

    pub fn credentials_parse(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::CredentialsParseError,
            format!(
                "Malformed signing credentials in {}: {}",
                path.as_ref().display(),
                message.into()
            ),
        )
        .with_suggestion("Fix the file or delete it to sign release builds with the debug key")
    }

    pub fn missing_credential_key(path: impl AsRef<Path>, key: &str) -> Self {
        Self::new(
            ErrorCode::MissingCredentialKey,
            format!(
                "Missing required key '{}' in {}",
                key,
                path.as_ref().display()
            ),
        )
        .with_suggestion("key.properties must define storeFile, storePassword, keyAlias and keyPassword")
    }

    /// Whether this error belongs to the credential parse family
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::CredentialsParseError | ErrorCode::MissingCredentialKey
        )
    }

    /// Whether this error belongs to the configuration family
    pub fn is_config_error(&self) -> bool {
        self.code.category() == "Configuration"
    }
}

/// Serializable error report for logging and JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub code_str: String,
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Exit codes for CLI commands
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const INSECURE_FALLBACK: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const SIGNING_ERROR: i32 = 4;
}

// Implement From for common error types

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            _ => ErrorCode::IoError,
        };
        Error::new(code, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorCode::Internal, format!("JSON error: {}", err)).with_source(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, format!("TOML parse error: {}", err))
            .with_source(err)
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::FileNotFound.to_string(), "E2001");
        assert_eq!(ErrorCode::CredentialsParseError.to_string(), "E4001");
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::IoError.category(), "IO");
        assert_eq!(ErrorCode::RulesFileNotFound.category(), "Configuration");
        assert_eq!(ErrorCode::MissingCredentialKey.category(), "Signing");
    }

    #[test]
    fn test_missing_optional_input_is_not_fatal() {
        assert!(!ErrorCode::MissingOptionalInput.is_fatal());
        assert!(ErrorCode::CredentialsParseError.is_fatal());
        assert!(ErrorCode::RulesFileNotFound.is_fatal());
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::rules_file_not_found("/app/proguard-rules.pro")
            .with_context("While resolving release");

        assert_eq!(err.code, ErrorCode::RulesFileNotFound);
        assert!(err.context.is_some());
        assert!(err.suggestion.is_some());
        assert!(err.is_config_error());
        assert!(!err.is_parse_error());
    }

    #[test]
    fn test_exit_codes_by_family() {
        assert_eq!(Error::unknown_variant("beta").exit_code(), exit_codes::CONFIG_ERROR);
        assert_eq!(
            Error::missing_credential_key("key.properties", "keyAlias").exit_code(),
            exit_codes::SIGNING_ERROR
        );
        let io = Error::from(std::io::Error::other("boom"));
        assert_eq!(io.code, ErrorCode::IoError);
        assert_eq!(io.exit_code(), exit_codes::FAILURE);
    }

    #[test]
    fn test_error_report_serialization() {
        let err = Error::credentials_parse("key.properties", "empty value for keyAlias")
            .with_context("Loading release credentials");

        let report = err.to_report();
        let json = serde_json::to_string(&report).unwrap();

        assert!(json.contains("E4001"));
        assert!(json.contains("Signing"));
        assert!(json.contains("CREDENTIALS_PARSE_ERROR"));
    }
}
