//! Field-level validation that reports every problem at once.
//!
//! [`FieldValidator`] accumulates [`FieldError`]s while a caller walks an
//! input; [`FieldValidator::finish`] turns the collection into a
//! [`ValidationResult`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type alias for validation results
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error with detailed field-level errors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
    pub context: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a single field error
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::new();
        err.add_field_error(field, message);
        err
    }

    /// Add a field-level error
    pub fn add_field_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Add a field error with code
    pub fn add_error_with_code(
        &mut self,
        field: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) {
        self.errors.push(FieldError::new(field, message).with_code(code));
    }

    /// Set validation context
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Get errors for a specific field
    pub fn field_errors(&self, field: &str) -> Vec<&FieldError> {
        self.errors.iter().filter(|e| e.field == field).collect()
    }

    /// Merge another validation error into this one
    pub fn merge(&mut self, other: ValidationError) {
        self.errors.extend(other.errors);
        if self.context.is_none() {
            self.context = other.context;
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{context}: ")?;
        }
        match self.errors.as_slice() {
            [] => write!(f, "Validation error with no specific field errors"),
            [single] => write!(f, "Validation failed: {}: {}", single.field, single.message),
            many => {
                write!(f, "Validation failed with {} errors: ", many.len())?;
                for (i, error) in many.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}: {}", error.field, error.message)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Individual field error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub code: Option<String>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into(), code: None }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Accumulates field errors while an input is checked.
#[derive(Debug, Default)]
pub struct FieldValidator {
    collected: ValidationError,
}

impl FieldValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a present, non-blank value. Returns the trimmed value when it
    /// passes so callers can continue parsing it.
    pub fn require<'a>(&mut self, field: &str, value: Option<&'a str>) -> Option<&'a str> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v),
            Some(_) => {
                self.collected.add_error_with_code(field, "must not be blank", "blank");
                None
            }
            None => {
                self.collected.add_error_with_code(field, "is required", "missing");
                None
            }
        }
    }

    /// Record `message` against `field` unless `condition` holds.
    pub fn check(&mut self, field: &str, condition: bool, message: impl Into<String>) {
        if !condition {
            self.collected.add_field_error(field, message);
        }
    }

    /// Record an unconditional error.
    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.collected.add_field_error(field, message);
    }

    pub fn has_errors(&self) -> bool {
        !self.collected.is_empty()
    }

    /// Finish validation, returning every collected error at once.
    pub fn finish(self) -> ValidationResult<()> {
        if self.collected.is_empty() {
            Ok(())
        } else {
            Err(self.collected)
        }
    }
}
