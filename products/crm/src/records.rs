//! Create, update and delete paths for catalogue and client records.
//!
//! Each write runs its tier gate, then its draft's validation gate, and only
//! then touches the store. Catalogue writes are for administrators; client
//! and opportunity writes for commercial users and above, within their row
//! visibility.

use chrono::{NaiveDate, Utc};
use entity::{
    category, company, individual_contact, opportunity, service, user, LeadSource, RelationTier,
};
use platform_api::{ApiError, ApiResult, ValidationErrors};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::db_error;
use crate::lifecycle::{self, ClientRef, LifecyclePolicy};
use crate::money;
use crate::roles::{require_administrator, require_commercial, require_manager, Principal};
use crate::scope::{find_visible, get_category, get_service};
use crate::validation::{
    check_unique, optional_text, require_text, validate_email, validate_phone, validate_price,
    validate_registration_id, validate_single_client, validate_website, Validated,
};

const NAME_MAX: usize = 200;
const SHORT_MAX: usize = 100;
const NOTES_MAX: usize = 10_000;
const INVALID_CHOICE: &str = "Select a valid choice.";

#[derive(Clone, Debug, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServiceDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    pub tariff_type: service::TariffType,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
pub struct ContactDraft {
    pub civility: individual_contact::Civility,
    pub last_name: String,
    pub first_name: String,
    pub birth_date: NaiveDate,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub source: Option<LeadSource>,
    #[serde(default)]
    pub notes: Option<String>,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CompanyDraft {
    pub legal_name: String,
    pub registration_id: String,
    pub legal_form: company::LegalForm,
    pub sector: company::Sector,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub website: Option<String>,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub primary_contact_id: Option<Uuid>,
    #[serde(default)]
    pub headcount: Option<company::Headcount>,
    #[serde(default)]
    pub source: Option<LeadSource>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OpportunityDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: opportunity::Status,
    /// Ignored while a service is linked: the service price wins.
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub individual_id: Option<Uuid>,
    #[serde(default)]
    pub company_id: Option<Uuid>,
    #[serde(default)]
    pub service_id: Option<Uuid>,
}

impl OpportunityDraft {
    pub fn amount_cents(&self) -> Option<i64> {
        self.amount.and_then(money::to_cents)
    }
}

/// Records whose owner can be reassigned.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OwnedRecord {
    Contact,
    Company,
    Opportunity,
}

fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

// ---------------------------------------------------------------------------
// Validation gates
// ---------------------------------------------------------------------------

pub async fn validate_category<C: ConnectionTrait>(
    db: &C,
    draft: CategoryDraft,
    own_id: Option<Uuid>,
) -> ApiResult<Validated<CategoryDraft>> {
    let mut errors = ValidationErrors::default();
    let name = require_text(&mut errors, "name", &draft.name, SHORT_MAX);
    let description = optional_text(&mut errors, "description", draft.description.as_deref(), NOTES_MAX);
    check_unique::<category::Entity, _>(
        db,
        &mut errors,
        "name",
        category::Column::Name,
        category::Column::Id,
        &name,
        own_id,
    )
    .await?;
    errors.into_result()?;
    Ok(Validated::new(CategoryDraft { name, description }))
}

pub async fn validate_service<C: ConnectionTrait>(
    db: &C,
    draft: ServiceDraft,
) -> ApiResult<Validated<ServiceDraft>> {
    let mut errors = ValidationErrors::default();
    let name = require_text(&mut errors, "name", &draft.name, NAME_MAX);
    let description = optional_text(&mut errors, "description", draft.description.as_deref(), NOTES_MAX);
    validate_price(&mut errors, draft.price);
    if let Some(category_id) = draft.category_id {
        let exists = category::Entity::find_by_id(category_id)
            .one(db)
            .await
            .map_err(db_error)?
            .is_some();
        if !exists {
            errors.add("category_id", INVALID_CHOICE);
        }
    }
    errors.into_result()?;
    Ok(Validated::new(ServiceDraft {
        name,
        description,
        ..draft
    }))
}

pub async fn validate_contact<C: ConnectionTrait>(
    db: &C,
    draft: ContactDraft,
    own_id: Option<Uuid>,
) -> ApiResult<Validated<ContactDraft>> {
    let mut errors = ValidationErrors::default();
    let last_name = require_text(&mut errors, "last_name", &draft.last_name, SHORT_MAX);
    let first_name = require_text(&mut errors, "first_name", &draft.first_name, SHORT_MAX);
    let email = validate_email(&mut errors, "email", &draft.email);
    let phone = validate_phone(&mut errors, &draft.phone);
    let address = require_text(&mut errors, "address", &draft.address, NOTES_MAX);
    let city = require_text(&mut errors, "city", &draft.city, SHORT_MAX);
    let postal_code = require_text(&mut errors, "postal_code", &draft.postal_code, 20);
    let country = require_text(&mut errors, "country", &draft.country, SHORT_MAX);
    let notes = optional_text(&mut errors, "notes", draft.notes.as_deref(), NOTES_MAX);
    if draft.birth_date > Utc::now().date_naive() {
        errors.add("birth_date", "The date of birth cannot be in the future.");
    }
    check_unique::<individual_contact::Entity, _>(
        db,
        &mut errors,
        "email",
        individual_contact::Column::Email,
        individual_contact::Column::Id,
        &email,
        own_id,
    )
    .await?;
    check_unique::<individual_contact::Entity, _>(
        db,
        &mut errors,
        "phone",
        individual_contact::Column::Phone,
        individual_contact::Column::Id,
        &phone,
        own_id,
    )
    .await?;
    errors.into_result()?;
    Ok(Validated::new(ContactDraft {
        last_name,
        first_name,
        email,
        phone,
        notes,
        address,
        city,
        postal_code,
        country,
        ..draft
    }))
}

pub async fn validate_company<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    draft: CompanyDraft,
    own_id: Option<Uuid>,
) -> ApiResult<Validated<CompanyDraft>> {
    let mut errors = ValidationErrors::default();
    let legal_name = require_text(&mut errors, "legal_name", &draft.legal_name, NAME_MAX);
    let registration_id = validate_registration_id(&mut errors, &draft.registration_id);
    let email = validate_email(&mut errors, "email", &draft.email);
    let phone = validate_phone(&mut errors, &draft.phone);
    let website = validate_website(&mut errors, draft.website.as_deref());
    let address = require_text(&mut errors, "address", &draft.address, NOTES_MAX);
    let city = require_text(&mut errors, "city", &draft.city, SHORT_MAX);
    let postal_code = require_text(&mut errors, "postal_code", &draft.postal_code, 20);
    let country = require_text(&mut errors, "country", &draft.country, SHORT_MAX);
    let notes = optional_text(&mut errors, "notes", draft.notes.as_deref(), NOTES_MAX);

    for (field, column, value) in [
        ("legal_name", company::Column::LegalName, &legal_name),
        ("registration_id", company::Column::RegistrationId, &registration_id),
        ("email", company::Column::Email, &email),
        ("phone", company::Column::Phone, &phone),
    ] {
        check_unique::<company::Entity, _>(db, &mut errors, field, column, company::Column::Id, value, own_id)
            .await?;
    }
    if let Some(contact_id) = draft.primary_contact_id {
        if !client_selectable::<individual_contact::Entity, _>(db, principal, contact_id).await? {
            errors.add("primary_contact_id", INVALID_CHOICE);
        }
    }
    errors.into_result()?;
    Ok(Validated::new(CompanyDraft {
        legal_name,
        registration_id,
        email,
        phone,
        website,
        address,
        city,
        postal_code,
        country,
        notes,
        ..draft
    }))
}

/// The exactly-one-client rule, name uniqueness, reference checks and, for
/// commercial users, ownership of the linked client.
pub async fn validate_opportunity<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    draft: OpportunityDraft,
    own_id: Option<Uuid>,
) -> ApiResult<Validated<OpportunityDraft>> {
    let mut errors = ValidationErrors::default();
    let name = require_text(&mut errors, "name", &draft.name, NAME_MAX);
    let description = optional_text(&mut errors, "description", draft.description.as_deref(), NOTES_MAX);
    validate_single_client(&mut errors, draft.individual_id, draft.company_id);
    if let Some(amount) = draft.amount {
        let mut amount_errors = ValidationErrors::default();
        validate_price(&mut amount_errors, amount);
        for e in amount_errors.iter() {
            errors.add("amount", e.message.clone());
        }
    }
    check_unique::<opportunity::Entity, _>(
        db,
        &mut errors,
        "name",
        opportunity::Column::Name,
        opportunity::Column::Id,
        &name,
        own_id,
    )
    .await?;
    if let Some(id) = draft.individual_id {
        if !client_selectable::<individual_contact::Entity, _>(db, principal, id).await? {
            errors.add("individual_id", INVALID_CHOICE);
        }
    }
    if let Some(id) = draft.company_id {
        if !client_selectable::<company::Entity, _>(db, principal, id).await? {
            errors.add("company_id", INVALID_CHOICE);
        }
    }
    if let Some(id) = draft.service_id {
        let exists = service::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(db_error)?
            .is_some();
        if !exists {
            errors.add("service_id", INVALID_CHOICE);
        }
    }
    errors.into_result()?;
    Ok(Validated::new(OpportunityDraft {
        name,
        description,
        ..draft
    }))
}

/// Commercial users may only pick clients they own.
async fn client_selectable<E, C>(db: &C, principal: &Principal, id: Uuid) -> ApiResult<bool>
where
    E: crate::scope::OwnedEntity,
    C: ConnectionTrait,
{
    match find_visible::<E, _>(db, principal, id, "client").await {
        Ok(_) => Ok(true),
        Err(ApiError::NotFound(_)) => Ok(false),
        Err(err) => Err(err),
    }
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

pub async fn create_category(
    db: &DatabaseConnection,
    principal: &Principal,
    draft: CategoryDraft,
) -> ApiResult<category::Model> {
    require_administrator(principal)?;
    let draft = validate_category(db, draft, None).await?.into_inner();
    let now = now();
    category::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(draft.name),
        description: Set(draft.description),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(db_error)
}

pub async fn update_category(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
    draft: CategoryDraft,
) -> ApiResult<category::Model> {
    require_administrator(principal)?;
    let existing = get_category(db, principal, id).await?;
    let draft = validate_category(db, draft, Some(id)).await?.into_inner();
    let mut active: category::ActiveModel = existing.into();
    active.name = Set(draft.name);
    active.description = Set(draft.description);
    active.updated_at = Set(now());
    active.update(db).await.map_err(db_error)
}

/// Services in the category are kept and lose their category.
pub async fn delete_category(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
) -> ApiResult<()> {
    require_administrator(principal)?;
    get_category(db, principal, id).await?;
    let txn = db.begin().await.map_err(db_error)?;
    service::Entity::update_many()
        .col_expr(service::Column::CategoryId, Expr::value(Option::<Uuid>::None))
        .filter(service::Column::CategoryId.eq(id))
        .exec(&txn)
        .await
        .map_err(db_error)?;
    category::Entity::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(db_error)?;
    txn.commit().await.map_err(db_error)?;
    info!(category_id = %id, "category deleted");
    Ok(())
}

pub async fn create_service(
    db: &DatabaseConnection,
    principal: &Principal,
    draft: ServiceDraft,
) -> ApiResult<service::Model> {
    require_administrator(principal)?;
    let draft = validate_service(db, draft).await?.into_inner();
    let now = now();
    service::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(draft.name),
        description: Set(draft.description),
        price_cents: Set(money::to_cents(draft.price).unwrap_or_default()),
        tariff_type: Set(draft.tariff_type),
        category_id: Set(draft.category_id),
        is_active: Set(draft.is_active),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(db_error)
}

/// Existing opportunities keep their amount until they are next saved.
pub async fn update_service(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
    draft: ServiceDraft,
) -> ApiResult<service::Model> {
    require_administrator(principal)?;
    let existing = get_service(db, principal, id).await?;
    let draft = validate_service(db, draft).await?.into_inner();
    let mut active: service::ActiveModel = existing.into();
    active.name = Set(draft.name);
    active.description = Set(draft.description);
    active.price_cents = Set(money::to_cents(draft.price).unwrap_or_default());
    active.tariff_type = Set(draft.tariff_type);
    active.category_id = Set(draft.category_id);
    active.is_active = Set(draft.is_active);
    active.updated_at = Set(now());
    active.update(db).await.map_err(db_error)
}

/// Linked opportunities are kept and lose their service reference; their
/// amount stays as last computed.
pub async fn delete_service(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
) -> ApiResult<()> {
    require_administrator(principal)?;
    get_service(db, principal, id).await?;
    let txn = db.begin().await.map_err(db_error)?;
    let detached = opportunity::Entity::update_many()
        .col_expr(opportunity::Column::ServiceId, Expr::value(Option::<Uuid>::None))
        .filter(opportunity::Column::ServiceId.eq(id))
        .exec(&txn)
        .await
        .map_err(db_error)?;
    service::Entity::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(db_error)?;
    txn.commit().await.map_err(db_error)?;
    info!(service_id = %id, detached = detached.rows_affected, "service deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

pub async fn create_contact(
    db: &DatabaseConnection,
    principal: &Principal,
    draft: ContactDraft,
) -> ApiResult<individual_contact::Model> {
    let current = require_commercial(principal)?;
    let draft = validate_contact(db, draft, None).await?.into_inner();
    let now = now();
    individual_contact::ActiveModel {
        id: Set(Uuid::new_v4()),
        civility: Set(draft.civility),
        last_name: Set(draft.last_name),
        first_name: Set(draft.first_name),
        birth_date: Set(draft.birth_date),
        email: Set(draft.email),
        phone: Set(draft.phone),
        source: Set(draft.source),
        notes: Set(draft.notes),
        address: Set(draft.address),
        city: Set(draft.city),
        postal_code: Set(draft.postal_code),
        country: Set(draft.country),
        owner_id: Set(Some(current.user_id)),
        relation_tier: Set(RelationTier::Prospect),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(db_error)
}

pub async fn update_contact(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
    draft: ContactDraft,
) -> ApiResult<individual_contact::Model> {
    require_commercial(principal)?;
    let existing =
        find_visible::<individual_contact::Entity, _>(db, principal, id, "contact").await?;
    let draft = validate_contact(db, draft, Some(id)).await?.into_inner();
    let mut active: individual_contact::ActiveModel = existing.into();
    active.civility = Set(draft.civility);
    active.last_name = Set(draft.last_name);
    active.first_name = Set(draft.first_name);
    active.birth_date = Set(draft.birth_date);
    active.email = Set(draft.email);
    active.phone = Set(draft.phone);
    active.source = Set(draft.source);
    active.notes = Set(draft.notes);
    active.address = Set(draft.address);
    active.city = Set(draft.city);
    active.postal_code = Set(draft.postal_code);
    active.country = Set(draft.country);
    active.updated_at = Set(now());
    active.update(db).await.map_err(db_error)
}

/// Removes the contact together with its opportunities. Companies naming it
/// as primary contact keep their row.
pub async fn delete_contact(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
) -> ApiResult<()> {
    require_commercial(principal)?;
    find_visible::<individual_contact::Entity, _>(db, principal, id, "contact").await?;
    let txn = db.begin().await.map_err(db_error)?;
    let removed = opportunity::Entity::delete_many()
        .filter(opportunity::Column::IndividualId.eq(id))
        .exec(&txn)
        .await
        .map_err(db_error)?;
    company::Entity::update_many()
        .col_expr(company::Column::PrimaryContactId, Expr::value(Option::<Uuid>::None))
        .filter(company::Column::PrimaryContactId.eq(id))
        .exec(&txn)
        .await
        .map_err(db_error)?;
    individual_contact::Entity::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(db_error)?;
    txn.commit().await.map_err(db_error)?;
    info!(contact_id = %id, opportunities = removed.rows_affected, "contact deleted");
    Ok(())
}

pub async fn create_company(
    db: &DatabaseConnection,
    principal: &Principal,
    draft: CompanyDraft,
) -> ApiResult<company::Model> {
    let current = require_commercial(principal)?;
    let draft = validate_company(db, principal, draft, None).await?.into_inner();
    let now = now();
    company::ActiveModel {
        id: Set(Uuid::new_v4()),
        legal_name: Set(draft.legal_name),
        registration_id: Set(draft.registration_id),
        legal_form: Set(draft.legal_form),
        sector: Set(draft.sector),
        email: Set(draft.email),
        phone: Set(draft.phone),
        website: Set(draft.website),
        address: Set(draft.address),
        city: Set(draft.city),
        postal_code: Set(draft.postal_code),
        country: Set(draft.country),
        primary_contact_id: Set(draft.primary_contact_id),
        headcount: Set(draft.headcount),
        source: Set(draft.source),
        notes: Set(draft.notes),
        owner_id: Set(Some(current.user_id)),
        account_tier: Set(RelationTier::Prospect),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(db_error)
}

pub async fn update_company(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
    draft: CompanyDraft,
) -> ApiResult<company::Model> {
    require_commercial(principal)?;
    let existing = find_visible::<company::Entity, _>(db, principal, id, "company").await?;
    let draft = validate_company(db, principal, draft, Some(id)).await?.into_inner();
    let mut active: company::ActiveModel = existing.into();
    active.legal_name = Set(draft.legal_name);
    active.registration_id = Set(draft.registration_id);
    active.legal_form = Set(draft.legal_form);
    active.sector = Set(draft.sector);
    active.email = Set(draft.email);
    active.phone = Set(draft.phone);
    active.website = Set(draft.website);
    active.address = Set(draft.address);
    active.city = Set(draft.city);
    active.postal_code = Set(draft.postal_code);
    active.country = Set(draft.country);
    active.primary_contact_id = Set(draft.primary_contact_id);
    active.headcount = Set(draft.headcount);
    active.source = Set(draft.source);
    active.notes = Set(draft.notes);
    active.updated_at = Set(now());
    active.update(db).await.map_err(db_error)
}

pub async fn delete_company(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
) -> ApiResult<()> {
    require_commercial(principal)?;
    find_visible::<company::Entity, _>(db, principal, id, "company").await?;
    let txn = db.begin().await.map_err(db_error)?;
    let removed = opportunity::Entity::delete_many()
        .filter(opportunity::Column::CompanyId.eq(id))
        .exec(&txn)
        .await
        .map_err(db_error)?;
    company::Entity::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(db_error)?;
    txn.commit().await.map_err(db_error)?;
    info!(company_id = %id, opportunities = removed.rows_affected, "company deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Opportunities
// ---------------------------------------------------------------------------

pub async fn create_opportunity(
    db: &DatabaseConnection,
    policy: LifecyclePolicy,
    principal: &Principal,
    draft: OpportunityDraft,
) -> ApiResult<opportunity::Model> {
    let current = require_commercial(principal)?;
    let owner = current.user_id;
    let validated = validate_opportunity(db, principal, draft, None).await?;
    lifecycle::save_opportunity(db, policy, validated, None, Some(owner)).await
}

pub async fn update_opportunity(
    db: &DatabaseConnection,
    policy: LifecyclePolicy,
    principal: &Principal,
    id: Uuid,
    draft: OpportunityDraft,
) -> ApiResult<opportunity::Model> {
    require_commercial(principal)?;
    let existing = find_visible::<opportunity::Entity, _>(db, principal, id, "opportunity").await?;
    let validated = validate_opportunity(db, principal, draft, Some(id)).await?;
    lifecycle::save_opportunity(db, policy, validated, Some(existing), None).await
}

pub async fn delete_opportunity(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
) -> ApiResult<()> {
    require_commercial(principal)?;
    find_visible::<opportunity::Entity, _>(db, principal, id, "opportunity").await?;
    opportunity::Entity::delete_by_id(id)
        .exec(db)
        .await
        .map_err(db_error)?;
    Ok(())
}

/// Re-run the tier rule for a client the caller can see.
pub async fn refresh_client_tier(
    db: &DatabaseConnection,
    principal: &Principal,
    client: ClientRef,
) -> ApiResult<RelationTier> {
    require_commercial(principal)?;
    match client {
        ClientRef::Individual(id) => {
            find_visible::<individual_contact::Entity, _>(db, principal, id, "contact").await?;
        }
        ClientRef::Company(id) => {
            find_visible::<company::Entity, _>(db, principal, id, "company").await?;
        }
    }
    lifecycle::refresh_relation_tier(db, client).await
}

/// Hand a record to another user, or clear its owner. Managers and above.
pub async fn reassign_owner(
    db: &DatabaseConnection,
    principal: &Principal,
    record: OwnedRecord,
    id: Uuid,
    owner: Option<Uuid>,
) -> ApiResult<()> {
    require_manager(principal)?;
    if let Some(owner_id) = owner {
        let active = user::Entity::find_by_id(owner_id)
            .one(db)
            .await
            .map_err(db_error)?
            .is_some_and(|u| u.is_active);
        if !active {
            return Err(ApiError::field("owner", INVALID_CHOICE));
        }
    }
    let now = now();
    let rows = match record {
        OwnedRecord::Contact => individual_contact::Entity::update_many()
            .col_expr(individual_contact::Column::OwnerId, Expr::value(owner))
            .col_expr(individual_contact::Column::UpdatedAt, Expr::value(now))
            .filter(individual_contact::Column::Id.eq(id))
            .exec(db)
            .await,
        OwnedRecord::Company => company::Entity::update_many()
            .col_expr(company::Column::OwnerId, Expr::value(owner))
            .col_expr(company::Column::UpdatedAt, Expr::value(now))
            .filter(company::Column::Id.eq(id))
            .exec(db)
            .await,
        OwnedRecord::Opportunity => opportunity::Entity::update_many()
            .col_expr(opportunity::Column::OwnerId, Expr::value(owner))
            .col_expr(opportunity::Column::UpdatedAt, Expr::value(now))
            .filter(opportunity::Column::Id.eq(id))
            .exec(db)
            .await,
    }
    .map_err(db_error)?
    .rows_affected;
    if rows == 0 {
        return Err(ApiError::NotFound("record"));
    }
    info!(?record, record_id = %id, owner = ?owner, "owner reassigned");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn opportunity_amount_is_read_in_cents() {
        let draft = OpportunityDraft {
            name: "Refonte".into(),
            description: None,
            status: opportunity::Status::Qualification,
            amount: Some(Decimal::from_str("1250.50").unwrap()),
            individual_id: None,
            company_id: None,
            service_id: None,
        };
        assert_eq!(draft.amount_cents(), Some(125_050));
    }

    #[test]
    fn service_draft_defaults_to_active() {
        let draft: ServiceDraft = serde_json::from_value(serde_json::json!({
            "name": "Hébergement",
            "price": "120.00",
            "tariff_type": "annual_subscription"
        }))
        .unwrap();
        assert!(draft.is_active);
        assert_eq!(draft.category_id, None);
    }
}
