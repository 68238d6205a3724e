use std::{fmt, sync::Arc};

use async_graphql::{Error, ErrorExtensions, Value};
use serde::Serialize;
use thiserror::Error;

/// Shared result type for CRM operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("insufficient permissions")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error("internal server error")]
    Internal(Arc<anyhow::Error>),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Validation(_) => "VALIDATION",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::Internal(Arc::new(err))
    }

    /// Single error attached to a named input field.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::default();
        errors.add(field, message);
        Self::Validation(errors)
    }

    /// Single error that belongs to the whole form rather than one field.
    pub fn form(message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::default();
        errors.add_form(message);
        Self::Validation(errors)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(value)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> Error {
        let mut err = Error::new(self.to_string());
        err = err.extend_with(|_err, e| {
            e.set("code", self.code());
        });
        if let ApiError::Validation(errors) = self {
            let fields = async_graphql::to_value(errors).unwrap_or(Value::Null);
            err = err.extend_with(move |_err, e| {
                e.set("fields", fields.clone());
            });
        }
        err
    }
}

/// Error surfaced on one input field, or on the form as a whole when
/// `field` is `None`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Option<String>,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: Some(field.to_string()),
            message: message.into(),
        });
    }

    pub fn add_form(&mut self, message: impl Into<String>) {
        self.0.push(FieldError {
            field: None,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |fe| fe.field.as_deref() == Some(field))
            .map(|fe| fe.message.as_str())
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> ApiResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for fe in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            match &fe.field {
                Some(field) => write!(f, "{field}: {}", fe.message)?,
                None => f.write_str(&fe.message)?,
            }
        }
        Ok(())
    }
}

/// Convert any error into a GraphQL error payload while hiding internals.
pub fn internal_error(err: impl Into<anyhow::Error>) -> Error {
    ApiError::internal(err.into()).extend()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_are_masked() {
        let err = internal_error(anyhow::anyhow!("boom"));
        assert_eq!(err.message, "internal server error");
        let extra = err.extensions.as_ref().and_then(|map| map.get("code"));
        let code = extra.cloned();
        assert_eq!(code, Some(Value::from("INTERNAL")));
    }

    #[test]
    fn validation_errors_carry_field_list() {
        let mut errors = ValidationErrors::default();
        errors.add("registration_id", "must contain exactly 15 digits");
        errors.add_form("choose exactly one client");
        let err = ApiError::Validation(errors).extend();

        let ext = err.extensions.as_ref().expect("extensions");
        assert_eq!(ext.get("code"), Some(&Value::from("VALIDATION")));
        let Some(Value::List(fields)) = ext.get("fields") else {
            panic!("fields missing");
        };
        assert_eq!(fields.len(), 2);
        assert!(err.message.contains("registration_id: must contain exactly 15 digits"));
    }

    #[test]
    fn forbidden_and_unauthenticated_codes_differ() {
        assert_eq!(ApiError::Forbidden.code(), "FORBIDDEN");
        assert_eq!(ApiError::Unauthenticated.code(), "UNAUTHENTICATED");
        assert_eq!(ApiError::NotFound("company").to_string(), "company not found");
    }
}
