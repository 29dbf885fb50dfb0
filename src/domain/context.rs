//! Error context extension trait
//!
//! Adds `.context()` and `.with_context()` to any `Result` whose error
//! converts into [`PortaError`], similar to `anyhow::Context` but keeping
//! the domain error type. I/O-class failures stay I/O class so retry
//! classification survives the added context.
//!
//! # Examples
//!
//! ```rust
//! use porta::domain::Result;
//! use porta::domain::context::ResultExt;
//!
//! fn read_file(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).context(format!("Failed to read file: {path}"))
//! }
//! ```

use crate::domain::errors::PortaError;
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;

    /// Add context to an error, computing it only on failure
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

fn wrap(context: impl std::fmt::Display, err: PortaError) -> PortaError {
    match err {
        PortaError::Io(message) => PortaError::Io(format!("{context}: {message}")),
        other if other.is_recoverable() => other,
        other => PortaError::Other(format!("{context}: {other}")),
    }
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<PortaError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| wrap(context, e.into()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| wrap(f(), e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_context_wraps_message() {
        let result: Result<()> = Err(PortaError::Configuration("Invalid config".to_string()));
        let err = result.context("Failed to load configuration").unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("Failed to load configuration"));
        assert!(msg.contains("Invalid config"));
    }

    #[test]
    fn test_context_keeps_io_recoverable() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let result: std::result::Result<(), std::io::Error> = Err(io);
        let err = result.context("Failed to stage payload").unwrap_err();

        assert!(err.is_recoverable());
        assert!(err.to_string().contains("Failed to stage payload"));
    }

    #[test]
    fn test_with_context_is_lazy() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();

        let result: Result<i32> = Ok(42);
        let value = result
            .with_context(|| {
                flag.store(true, Ordering::SeqCst);
                "never built"
            })
            .unwrap();

        assert_eq!(value, 42);
        assert!(!called.load(Ordering::SeqCst));
    }
}
