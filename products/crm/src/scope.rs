//! Row visibility and scoped listings.
//!
//! Managers and administrators see every client and opportunity; commercial
//! users see only rows they own; principals without a tier see none.
//! Catalogue entities are visible to anyone signed in.

use entity::{category, company, individual_contact, opportunity, service};
use platform_api::{ApiError, ApiResult};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use serde::Serialize;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::db_error;
use crate::filters::{
    filter_vocabulary, CategoryFilter, CompanyFilter, ContactFilter, FilterField, ListFilter,
    OpportunityFilter, ServiceFilter,
};
use crate::roles::{
    is_commercial_or_above, is_manager_or_above, require_authenticated, require_commercial, tier_of, Principal,
};

const DEFAULT_PAGE: u64 = 50;
const MAX_PAGE: u64 = 200;

/// Entities carrying an owner column.
pub trait OwnedEntity: EntityTrait {
    fn id_column() -> Self::Column;
    fn owner_column() -> Self::Column;
}

impl OwnedEntity for individual_contact::Entity {
    fn id_column() -> Self::Column {
        individual_contact::Column::Id
    }

    fn owner_column() -> Self::Column {
        individual_contact::Column::OwnerId
    }
}

impl OwnedEntity for company::Entity {
    fn id_column() -> Self::Column {
        company::Column::Id
    }

    fn owner_column() -> Self::Column {
        company::Column::OwnerId
    }
}

impl OwnedEntity for opportunity::Entity {
    fn id_column() -> Self::Column {
        opportunity::Column::Id
    }

    fn owner_column() -> Self::Column {
        opportunity::Column::OwnerId
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Visibility {
    All,
    OwnedBy(Uuid),
    Nothing,
}

pub fn visibility(principal: &Principal) -> Visibility {
    match principal.user() {
        Some(_) if is_manager_or_above(principal) => Visibility::All,
        Some(user) if is_commercial_or_above(principal) => Visibility::OwnedBy(user.user_id),
        _ => Visibility::Nothing,
    }
}

/// Base query restricted to what `principal` may see.
pub fn scoped<E>(principal: &Principal) -> Select<E>
where
    E: OwnedEntity,
{
    match visibility(principal) {
        Visibility::All => E::find(),
        Visibility::OwnedBy(owner) => E::find().filter(E::owner_column().eq(owner)),
        Visibility::Nothing => E::find().filter(Expr::val(1).eq(0)),
    }
}

/// Fetch one owned row, treating rows outside the caller's scope as missing.
pub async fn find_visible<E, C>(
    db: &C,
    principal: &Principal,
    id: Uuid,
    label: &'static str,
) -> ApiResult<E::Model>
where
    E: OwnedEntity,
    C: ConnectionTrait,
{
    scoped::<E>(principal)
        .filter(E::id_column().eq(id))
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or(ApiError::NotFound(label))
}

/// Optional limit/offset window.
#[derive(Clone, Copy, Debug, Default)]
pub struct Page {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Page {
    fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE)
    }

    fn offset(&self) -> u64 {
        self.offset.unwrap_or(0)
    }
}

/// One page of a scoped, filtered list, with the total match count and the
/// filter vocabulary the caller is allowed to use.
#[derive(Clone, Debug, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub filters: Vec<FilterField>,
    pub can_see_owner: bool,
}

impl<T> Listing<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        Listing {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            filters: self.filters,
            can_see_owner: self.can_see_owner,
        }
    }
}

async fn run_listing<E, F, C>(
    db: &C,
    principal: &Principal,
    base: Select<E>,
    filter: &F,
    page: Page,
) -> ApiResult<Listing<E::Model>>
where
    E: EntityTrait,
    E::Model: Sync,
    F: ListFilter,
    C: ConnectionTrait,
{
    let tier = tier_of(principal);
    let query = base.filter(filter.condition(tier));
    let total = query.clone().count(db).await.map_err(db_error)?;
    let items = query
        .limit(page.limit())
        .offset(page.offset())
        .all(db)
        .await
        .map_err(db_error)?;
    Ok(Listing {
        items,
        total,
        filters: filter_vocabulary(F::KIND, tier),
        can_see_owner: is_manager_or_above(principal),
    })
}

pub async fn list_categories<C>(
    db: &C,
    principal: &Principal,
    filter: &CategoryFilter,
    page: Page,
) -> ApiResult<Listing<category::Model>>
where
    C: ConnectionTrait,
{
    require_authenticated(principal)?;
    let span = info_span!("crm.categories.list", tier = ?tier_of(principal));
    let base = category::Entity::find().order_by_asc(category::Column::Name);
    run_listing(db, principal, base, filter, page)
        .instrument(span)
        .await
}

pub async fn list_services<C>(
    db: &C,
    principal: &Principal,
    filter: &ServiceFilter,
    page: Page,
) -> ApiResult<Listing<service::Model>>
where
    C: ConnectionTrait,
{
    require_authenticated(principal)?;
    let span = info_span!(
        "crm.services.list",
        tier = ?tier_of(principal),
        has_name = filter.name.is_some(),
        active = ?filter.active
    );
    let base = service::Entity::find()
        .order_by_asc(service::Column::Name)
        .order_by_asc(service::Column::Id);
    run_listing(db, principal, base, filter, page)
        .instrument(span)
        .await
}

pub async fn list_contacts<C>(
    db: &C,
    principal: &Principal,
    filter: &ContactFilter,
    page: Page,
) -> ApiResult<Listing<individual_contact::Model>>
where
    C: ConnectionTrait,
{
    require_commercial(principal)?;
    let span = info_span!("crm.contacts.list", tier = ?tier_of(principal));
    let base = scoped::<individual_contact::Entity>(principal)
        .order_by_asc(individual_contact::Column::LastName)
        .order_by_asc(individual_contact::Column::FirstName);
    run_listing(db, principal, base, filter, page)
        .instrument(span)
        .await
}

pub async fn list_companies<C>(
    db: &C,
    principal: &Principal,
    filter: &CompanyFilter,
    page: Page,
) -> ApiResult<Listing<company::Model>>
where
    C: ConnectionTrait,
{
    require_commercial(principal)?;
    let span = info_span!("crm.companies.list", tier = ?tier_of(principal));
    let base = scoped::<company::Entity>(principal).order_by_asc(company::Column::LegalName);
    run_listing(db, principal, base, filter, page)
        .instrument(span)
        .await
}

pub async fn list_opportunities<C>(
    db: &C,
    principal: &Principal,
    filter: &OpportunityFilter,
    page: Page,
) -> ApiResult<Listing<opportunity::Model>>
where
    C: ConnectionTrait,
{
    require_commercial(principal)?;
    let span = info_span!(
        "crm.opportunities.list",
        tier = ?tier_of(principal),
        status = ?filter.status
    );
    let base = scoped::<opportunity::Entity>(principal)
        .order_by_desc(opportunity::Column::CreatedAt)
        .order_by_desc(opportunity::Column::Id);
    run_listing(db, principal, base, filter, page)
        .instrument(span)
        .await
}

pub async fn get_contact<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    id: Uuid,
) -> ApiResult<individual_contact::Model> {
    require_commercial(principal)?;
    find_visible::<individual_contact::Entity, _>(db, principal, id, "contact").await
}

pub async fn get_company<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    id: Uuid,
) -> ApiResult<company::Model> {
    require_commercial(principal)?;
    find_visible::<company::Entity, _>(db, principal, id, "company").await
}

pub async fn get_opportunity<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    id: Uuid,
) -> ApiResult<opportunity::Model> {
    require_commercial(principal)?;
    find_visible::<opportunity::Entity, _>(db, principal, id, "opportunity").await
}

pub async fn get_service<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    id: Uuid,
) -> ApiResult<service::Model> {
    require_authenticated(principal)?;
    service::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or(ApiError::NotFound("service"))
}

pub async fn get_category<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    id: Uuid,
) -> ApiResult<category::Model> {
    require_authenticated(principal)?;
    category::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or(ApiError::NotFound("category"))
}
