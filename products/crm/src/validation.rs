//! Input validation for record writes.
//!
//! Field checks collect into a [`ValidationErrors`] so a form reports every
//! problem at once. A draft that passes is wrapped in [`Validated`], which is
//! the only form the write paths accept.

use once_cell::sync::Lazy;
use platform_api::{ApiResult, ValidationErrors};
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use url::Url;
use uuid::Uuid;

use crate::db_error;

pub const NO_CLIENT: &str = "Please choose a client: an individual or a company.";
pub const TWO_CLIENTS: &str = "An opportunity cannot be linked to both an individual and a company.";

static REGISTRATION_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{15}$").expect("registration id pattern"));

/// A draft that went through its validation gate.
#[derive(Debug, Clone)]
pub struct Validated<T>(T);

impl<T> Validated<T> {
    pub(crate) fn new(inner: T) -> Self {
        Self(inner)
    }

    pub fn get(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Trims `value`, recording an error when it is blank or longer than `max`.
pub fn require_text(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, "This field is required.");
    } else if trimmed.chars().count() > max {
        errors.add(field, format!("Ensure this value has at most {max} characters."));
    }
    trimmed.to_string()
}

/// Optional free text; blank collapses to `None`.
pub fn optional_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Option<String> {
    let trimmed = value.map(str::trim).filter(|v| !v.is_empty())?;
    if trimmed.chars().count() > max {
        errors.add(field, format!("Ensure this value has at most {max} characters."));
    }
    Some(trimmed.to_string())
}

pub fn validate_registration_id(errors: &mut ValidationErrors, value: &str) -> String {
    let trimmed = value.trim();
    if !REGISTRATION_ID.is_match(trimmed) {
        errors.add(
            "registration_id",
            "The registration id must contain exactly 15 digits.",
        );
    }
    trimmed.to_string()
}

pub fn validate_email(errors: &mut ValidationErrors, field: &str, value: &str) -> String {
    let normalized = value.trim().to_lowercase();
    let valid = match normalized.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        errors.add(field, "Enter a valid email address.");
    }
    normalized
}

pub fn validate_phone(errors: &mut ValidationErrors, value: &str) -> String {
    let trimmed = value.trim();
    let digits = trimmed.chars().filter(char::is_ascii_digit).count();
    let allowed = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '.' | '(' | ')'));
    if trimmed.is_empty() {
        errors.add("phone", "This field is required.");
    } else if !allowed || !(6..=20).contains(&digits) {
        errors.add("phone", "Enter a valid phone number.");
    }
    trimmed.to_string()
}

pub fn validate_website(errors: &mut ValidationErrors, value: Option<&str>) -> Option<String> {
    let trimmed = value.map(str::trim).filter(|v| !v.is_empty())?;
    let valid = Url::parse(trimmed)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false);
    if !valid {
        errors.add("website", "Enter a valid URL.");
    }
    Some(trimmed.to_string())
}

/// Non-negative with at most two decimals; returns the amount in cents.
pub fn validate_price(errors: &mut ValidationErrors, value: Decimal) -> i64 {
    if value.is_sign_negative() && !value.is_zero() {
        errors.add("price", "Ensure this value is greater than or equal to 0.");
        return 0;
    }
    match crate::money::to_cents(value) {
        Some(cents) => cents,
        None => {
            errors.add("price", "Ensure that there are no more than 2 decimal places.");
            0
        }
    }
}

/// Exactly one of the two client references must be set.
pub fn validate_single_client(
    errors: &mut ValidationErrors,
    individual: Option<Uuid>,
    company: Option<Uuid>,
) {
    match (individual, company) {
        (None, None) => errors.add_form(NO_CLIENT),
        (Some(_), Some(_)) => errors.add_form(TWO_CLIENTS),
        _ => {}
    }
}

/// Flags `field` when another row already holds `value` in `column`. The row
/// being edited (`own_id`) is not counted.
pub async fn check_unique<E, C>(
    db: &C,
    errors: &mut ValidationErrors,
    field: &str,
    column: E::Column,
    id_column: E::Column,
    value: &str,
    own_id: Option<Uuid>,
) -> ApiResult<()>
where
    E: EntityTrait,
    E::Model: Sync,
    C: ConnectionTrait,
{
    if value.is_empty() {
        return Ok(());
    }
    let mut query = E::find().filter(column.eq(value));
    if let Some(id) = own_id {
        query = query.filter(id_column.ne(id));
    }
    let taken = query.count(db).await.map_err(db_error)? > 0;
    if taken {
        errors.add(field, "A record with this value already exists.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn registration_id_needs_fifteen_digits() {
        let mut errors = ValidationErrors::default();
        validate_registration_id(&mut errors, "000000000000001");
        assert!(errors.is_empty());

        validate_registration_id(&mut errors, "00000001");
        validate_registration_id(&mut errors, "00000000000000a");
        validate_registration_id(&mut errors, "0000000000000012");
        assert_eq!(errors.for_field("registration_id").count(), 3);
    }

    #[test]
    fn single_client_rule() {
        let mut errors = ValidationErrors::default();
        validate_single_client(&mut errors, Some(Uuid::new_v4()), None);
        validate_single_client(&mut errors, None, Some(Uuid::new_v4()));
        assert!(errors.is_empty());

        validate_single_client(&mut errors, None, None);
        validate_single_client(&mut errors, Some(Uuid::new_v4()), Some(Uuid::new_v4()));
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec![NO_CLIENT, TWO_CLIENTS]);
        assert!(errors.iter().all(|e| e.field.is_none()));
    }

    #[test]
    fn price_rules() {
        let mut errors = ValidationErrors::default();
        assert_eq!(validate_price(&mut errors, Decimal::from_str("1000.00").unwrap()), 100_000);
        assert_eq!(validate_price(&mut errors, Decimal::ZERO), 0);
        assert!(errors.is_empty());

        validate_price(&mut errors, Decimal::from_str("-1").unwrap());
        validate_price(&mut errors, Decimal::from_str("9.999").unwrap());
        assert_eq!(errors.for_field("price").count(), 2);
    }

    #[test]
    fn text_is_trimmed_and_bounded() {
        let mut errors = ValidationErrors::default();
        assert_eq!(require_text(&mut errors, "name", "  Web  ", 10), "Web");
        assert!(errors.is_empty());
        require_text(&mut errors, "name", "   ", 10);
        require_text(&mut errors, "name", "abcdefghijk", 10);
        assert_eq!(errors.for_field("name").count(), 2);
        assert_eq!(optional_text(&mut errors, "notes", Some("  "), 10), None);
    }

    #[test]
    fn contact_channels() {
        let mut errors = ValidationErrors::default();
        assert_eq!(validate_email(&mut errors, "email", " Ana@Example.COM "), "ana@example.com");
        validate_phone(&mut errors, "+212 6 12 34 56 78");
        validate_website(&mut errors, Some("https://example.com"));
        assert!(errors.is_empty());

        validate_email(&mut errors, "email", "nobody");
        validate_phone(&mut errors, "call me");
        validate_website(&mut errors, Some("example.com"));
        assert_eq!(errors.iter().count(), 3);
    }

    #[test]
    fn website_needs_a_web_host() {
        for accepted in ["http://atlas.ma", "https://www.example.com/contact?lang=fr"] {
            let mut errors = ValidationErrors::default();
            assert_eq!(validate_website(&mut errors, Some(accepted)).as_deref(), Some(accepted));
            assert!(errors.is_empty(), "{accepted}");
        }
        for rejected in ["https://", "http://not a url", "ftp://files.example.com", "mailto:a@b.ma"] {
            let mut errors = ValidationErrors::default();
            validate_website(&mut errors, Some(rejected));
            assert_eq!(errors.for_field("website").count(), 1, "{rejected}");
        }
        let mut errors = ValidationErrors::default();
        assert_eq!(validate_website(&mut errors, Some("   ")), None);
        assert!(errors.is_empty());
    }
}
