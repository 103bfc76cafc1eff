//! Result type alias for Sluice

use super::errors::SluiceError;

/// Result type alias for Sluice operations
///
/// # Examples
///
/// ```
/// use sluice::domain::result::Result;
/// use sluice::domain::errors::SluiceError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(SluiceError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, SluiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(SluiceError::Validation("test error".to_string()));
        assert!(result.is_err());
    }
}
