use std::borrow::Cow;

use rocket::serde::json::Json;
use tracing::instrument;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::{AppError, FieldErrors};

/// Partial-update payloads. An update with nothing in it is rejected.
pub trait Patch {
    fn is_empty(&self) -> bool;
}

fn collect_errors(prefix: &str, errors: &ValidationErrors, out: &mut FieldErrors) {
    for (field, kind) in errors.errors() {
        let key = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let messages = field_errors.iter().map(|error| {
                    error
                        .message
                        .clone()
                        .unwrap_or(Cow::Borrowed("Invalid value"))
                        .to_string()
                });
                out.entry(key).or_default().extend(messages);
            }
            ValidationErrorsKind::Struct(nested) => collect_errors(&key, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_errors(&format!("{}[{}]", key, index), nested, out);
                }
            }
        }
    }
}

/// Flattens validator output into `field -> messages`, nested fields as
/// `options[0].text`.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut out = FieldErrors::new();
    collect_errors("", errors, &mut out);
    out
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::InvalidFields(field_errors(&errors))
    }
}

pub trait JsonValidateExt<T> {
    fn validate_custom(self) -> Result<T, AppError>;
}

impl<T: Validate> JsonValidateExt<T> for Json<T> {
    #[instrument(skip_all)]
    fn validate_custom(self) -> Result<T, AppError> {
        let inner = self.into_inner();
        inner.validate()?;
        Ok(inner)
    }
}

pub trait JsonPatchExt<T> {
    fn validate_patch(self) -> Result<T, AppError>;
}

impl<T: Validate + Patch> JsonPatchExt<T> for Json<T> {
    #[instrument(skip_all)]
    fn validate_patch(self) -> Result<T, AppError> {
        let inner = self.validate_custom()?;
        if inner.is_empty() {
            return Err(AppError::Validation("No fields to update".to_string()));
        }
        Ok(inner)
    }
}
