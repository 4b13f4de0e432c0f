//! Error handling for keyword-miner

use thiserror::Error;

/// Main error type for keyword-miner
#[derive(Error, Debug, Clone)]
pub enum KeywordMinerError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        status_code: Option<u16>,
        url: Option<String>,
    },

    #[error("Timeout error: {operation} timed out after {timeout_secs}s")]
    Timeout {
        operation: String,
        timeout_secs: u64,
    },

    #[error("Parse error: {message}")]
    Parse {
        message: String,
        content: Option<String>,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Store error: {message}")]
    Store {
        message: String,
        path: Option<String>,
    },

    #[error("Market data error ({provider}): {message}")]
    MarketData {
        provider: String,
        message: String,
        code: Option<String>,
    },

    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("CLI error: {message}")]
    Cli { message: String },
}

impl KeywordMinerError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(
        message: impl Into<String>,
        status_code: Option<u16>,
        url: Option<String>,
    ) -> Self {
        Self::Network {
            message: message.into(),
            status_code,
            url,
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_secs,
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>, content: Option<String>) -> Self {
        Self::Parse {
            message: message.into(),
            content,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store(message: impl Into<String>, path: Option<String>) -> Self {
        Self::Store {
            message: message.into(),
            path,
        }
    }

    /// Create a market data provider error
    pub fn market_data(
        provider: impl Into<String>,
        message: impl Into<String>,
        code: Option<String>,
    ) -> Self {
        Self::MarketData {
            provider: provider.into(),
            message: message.into(),
            code,
        }
    }

    /// Create an IO error
    pub fn io(message: impl Into<String>, path: Option<String>) -> Self {
        Self::Io {
            message: message.into(),
            path,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a CLI error
    pub fn cli(message: impl Into<String>) -> Self {
        Self::Cli {
            message: message.into(),
        }
    }

    /// Whether another attempt at the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } | Self::Parse { .. } => true,
            Self::MarketData { code, .. } => code.is_none(),
            _ => false,
        }
    }

    /// Short machine-friendly name of the error kind, used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Network { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::Parse { .. } => "parse",
            Self::Validation { .. } => "validation",
            Self::Store { .. } => "store",
            Self::MarketData { .. } => "market_data",
            Self::Io { .. } => "io",
            Self::Internal { .. } => "internal",
            Self::Cli { .. } => "cli",
        }
    }

    /// Get user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message } => {
                format!("❌ Configuration problem: {}\n💡 Check your .env file or environment variables", message)
            }
            Self::Network { message, status_code, .. } => {
                let status = status_code.map_or(String::new(), |c| format!(" ({})", c));
                format!("❌ Network error{}: {}\n💡 Check your internet connection", status, message)
            }
            Self::Timeout { operation, timeout_secs } => {
                format!("⏱️  Operation '{}' timed out after {}s\n💡 Try increasing REQUEST_TIMEOUT_SECS or lowering concurrency", operation, timeout_secs)
            }
            Self::Parse { message, .. } => {
                format!("❌ Parse error: {}\n💡 The suggest endpoint may have changed its format", message)
            }
            Self::Validation { message } => {
                format!("❌ Validation error: {}\n💡 Check your input format", message)
            }
            Self::Store { message, path } => {
                let path_info = path.as_ref().map_or(String::new(), |p| format!(" ({})", p));
                format!("❌ Store error{}: {}\n💡 Check STORE_PATH and file permissions", path_info, message)
            }
            Self::MarketData { provider, message, .. } => {
                format!("⚠️  Market data ({}) unavailable: {}\n💡 Scores fall back to estimates", provider, message)
            }
            Self::Io { message, path } => {
                let path_info = path.as_ref().map_or(String::new(), |p| format!(" ({})", p));
                format!("❌ File error{}: {}\n💡 Check file permissions and paths", path_info, message)
            }
            Self::Internal { message } => {
                format!("❌ Internal error: {}\n💡 This is a bug, please report it", message)
            }
            Self::Cli { message } => {
                format!("❌ Command error: {}\n💡 Use --help for usage information", message)
            }
        }
    }
}

/// Convert from common error types
impl From<reqwest::Error> for KeywordMinerError {
    fn from(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        let url = err.url().map(|u| u.to_string());

        // callers that know their configured timeout map timeouts themselves
        if err.is_timeout() {
            Self::network(format!("Request timed out: {}", err), status_code, url)
        } else if err.is_connect() {
            Self::network("Connection failed", status_code, url)
        } else if err.is_decode() {
            Self::parse(err.to_string(), None)
        } else {
            Self::network(err.to_string(), status_code, url)
        }
    }
}

impl From<serde_json::Error> for KeywordMinerError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.to_string(), None)
    }
}

impl From<std::io::Error> for KeywordMinerError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string(), None)
    }
}

impl From<tokio::time::error::Elapsed> for KeywordMinerError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::timeout("Operation", 10)
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, KeywordMinerError>;

/// Helper macros for common error patterns
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::KeywordMinerError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::KeywordMinerError::config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr) => {
        $crate::error::KeywordMinerError::validation($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::KeywordMinerError::validation(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::error::KeywordMinerError::internal($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::KeywordMinerError::internal(format!($fmt, $($arg)*))
    };
}
