use validator::{ValidationError, ValidationErrors};

/// Single-field error for semantic checks the derive macro cannot express
/// (cross-field constraints like "correct_answer must be an option key").
pub fn field_error(field: &'static str, code: &'static str, message: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let mut error = ValidationError::new(code);
    error.message = Some(message.to_owned().into());
    errors.add(field, error);
    errors
}
