//! Media Fetcher Library
//!
//! A session-scoped asynchronous media fetch service. Each accepted request
//! runs as its own job against an external fetching engine; callers poll
//! progress snapshots and retrieve the produced file, which is reclaimed
//! after a retention window.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;
pub mod server;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use constants::*;

    #[test]
    fn test_constants_accessible() {
        assert_eq!(DEFAULT_MAX_CONCURRENT, 4);
        assert_eq!(DEFAULT_PORT, 5000);
        assert_eq!(DEFAULT_HOST, "0.0.0.0");
        assert_eq!(env::ENGINE_BINARY, "YT_DLP_PATH");
    }

    #[test]
    fn test_error_types() {
        let app_error = AppError::from(errors::ServiceError::UnknownSession);
        assert_eq!(app_error.category(), "service");
        assert_eq!(app_error.to_string(), "Invalid or missing session ID");
    }
}
