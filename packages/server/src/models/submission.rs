use crate::error::AppError;

/// Largest source blob we forward to the judge.
pub const MAX_SOURCE_BYTES: usize = 64 * 1024;

/// Validates the language id and source code shared by both submission paths.
pub fn validate_submission(language_id: i32, source_code: &str) -> Result<(), AppError> {
    if language_id <= 0 {
        return Err(AppError::Validation("languageId must be positive".into()));
    }
    if source_code.trim().is_empty() {
        return Err(AppError::Validation("sourceCode must not be empty".into()));
    }
    if source_code.len() > MAX_SOURCE_BYTES {
        return Err(AppError::Validation(format!(
            "sourceCode exceeds {} bytes",
            MAX_SOURCE_BYTES
        )));
    }
    Ok(())
}
