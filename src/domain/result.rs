//! Result type alias for Porta

use super::errors::PortaError;

/// Result type alias for Porta operations
///
/// # Examples
///
/// ```
/// use porta::domain::result::Result;
/// use porta::domain::errors::PortaError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(PortaError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, PortaError>;
