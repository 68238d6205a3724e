//! CRM vertical slice.
//!
//! Requests carry a [`roles::Principal`]; every read goes through the
//! visibility rules in [`scope`] and the per-tier filter vocabulary in
//! [`filters`]. Writes go through [`records`] and, for opportunities, the
//! pricing and relation-tier rules in [`lifecycle`].

use platform_api::ApiError;
use sea_orm::DbErr;

pub mod auth;
pub mod dashboard;
pub mod filters;
pub mod lifecycle;
pub mod membership;
pub mod money;
pub mod records;
pub mod roles;
pub mod schema;
pub mod scope;
pub mod seed;
pub mod users;
pub mod validation;

pub use platform_api::{ApiResult, FieldError, ValidationErrors};

pub(crate) fn db_error(err: DbErr) -> ApiError {
    ApiError::internal(err.into())
}
