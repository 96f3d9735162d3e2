//! Domain operations shared by the HTTP handlers.
//!
//! Each function takes the acting [`Principal`](crate::access::Principal)
//! where permissions matter and returns stored models; handlers only shape
//! requests and responses.

pub mod assignment;
pub mod cars;
pub mod otp;
pub mod submissions;
pub mod test_drives;
pub mod users;

use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;

pub(crate) fn now_tz() -> DateTimeWithTimeZone {
    Utc::now().into()
}

/// Trims and rejects empty text.
pub(crate) fn required_text(value: &str, field: &str) -> crate::AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Like [`required_text`], but also refuses text longer than the column allows.
pub(crate) fn bounded_text(value: &str, field: &str, max_chars: usize) -> crate::AppResult<String> {
    let text = required_text(value, field)?;
    if text.chars().count() > max_chars {
        return Err(crate::AppError::BadRequest(format!(
            "{} must be at most {} characters",
            field, max_chars
        )));
    }
    Ok(text)
}

/// Trims and maps empty text to `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppError;

    #[test]
    fn bounded_text_counts_characters() {
        assert_eq!(bounded_text("  Camry ", "Model", 5).unwrap(), "Camry");
        assert!(matches!(bounded_text("Camry!", "Model", 5), Err(AppError::BadRequest(_))));
        // Multi-byte characters count once, as varchar does
        assert!(bounded_text("ÉÉÉÉÉ", "Model", 5).is_ok());
        assert!(matches!(bounded_text("   ", "Model", 5), Err(AppError::BadRequest(_))));
    }
}
