//! GraphQL object, enum and input types.
//!
//! Output nodes also derive `Serialize` so the HTTP JSON pages render the
//! same shapes the schema exposes.

use async_graphql::{Enum, InputObject, OutputType, SimpleObject, ID};
use chrono::{DateTime, NaiveDate, Utc};
use entity::{category, company, individual_contact, opportunity, service, user};
use platform_api::{ApiError, ApiResult};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::dashboard::{Dashboard, SalesCount, StatusCount};
use crate::filters::{
    CategoryFilter, CompanyFilter, ContactFilter, FilterField, OpportunityFilter, ServiceFilter,
};
use crate::money::from_cents;
use crate::records::{CategoryDraft, CompanyDraft, ContactDraft, OpportunityDraft, ServiceDraft};
use crate::roles::CurrentUser;
use crate::scope::Listing;

const INVALID_CHOICE: &str = "Select a valid choice.";

/// Parse an operation argument id. A malformed id cannot match any row.
pub(crate) fn parse_uuid(id: &ID, label: &'static str) -> ApiResult<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| ApiError::NotFound(label))
}

/// Parse a reference carried inside an input; malformed ids are field errors.
fn parse_ref(field: &str, id: Option<&ID>) -> ApiResult<Option<Uuid>> {
    id.map(|id| Uuid::parse_str(id.as_str()).map_err(|_| ApiError::field(field, INVALID_CHOICE)))
        .transpose()
}

fn id_of(id: Uuid) -> ID {
    ID::from(id.to_string())
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[graphql(remote = "crate::roles::Tier")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Commercial,
    Manager,
    Administrator,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[graphql(remote = "entity::user::Role")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Administrator,
    Manager,
    Commercial,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[graphql(remote = "entity::opportunity::Status")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpportunityStatus {
    Qualification,
    Negotiation,
    Won,
    Lost,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[graphql(remote = "entity::service::TariffType")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TariffType {
    MonthlySubscription,
    OneTime,
    AnnualSubscription,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[graphql(remote = "entity::RelationTier")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationTier {
    Prospect,
    Client,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[graphql(remote = "entity::LeadSource")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadSource {
    Phone,
    Web,
    Referral,
    TradeShow,
    Social,
    Other,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[graphql(remote = "entity::individual_contact::Civility")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Civility {
    Mr,
    Mrs,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[graphql(remote = "entity::company::LegalForm")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LegalForm {
    Sarl,
    Eurl,
    Sas,
    Sasu,
    Sa,
    Snc,
    Scs,
    Sca,
    Gie,
    MicroEnterprise,
    Association,
    Cooperative,
    Sci,
    Scp,
    AutoEntrepreneur,
    Other,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[graphql(remote = "entity::company::Sector")]
pub enum Sector {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[graphql(remote = "entity::company::Headcount")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Headcount {
    Micro,
    Small,
    Medium,
    Large,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[graphql(remote = "crate::filters::EntityKind")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Category,
    Service,
    IndividualContact,
    Company,
    Opportunity,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[graphql(remote = "crate::filters::FilterKind")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterKind {
    Text,
    Choice,
    Boolean,
    DateRange,
    Reference,
    Owner,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[graphql(remote = "crate::records::OwnedRecord")]
pub enum OwnedRecordKind {
    Contact,
    Company,
    Opportunity,
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClientKind {
    Individual,
    Company,
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, SimpleObject, Serialize)]
#[graphql(name = "User")]
#[serde(rename_all = "camelCase")]
pub struct UserNode {
    pub id: ID,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub is_superuser: bool,
    pub is_active: bool,
}

impl From<user::Model> for UserNode {
    fn from(model: user::Model) -> Self {
        Self {
            id: id_of(model.id),
            username: model.username,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            role: model.role.into(),
            is_superuser: model.is_superuser,
            is_active: model.is_active,
        }
    }
}

/// The signed-in principal as the client sees it.
#[derive(Clone, Debug, SimpleObject, Serialize)]
#[graphql(name = "Me")]
#[serde(rename_all = "camelCase")]
pub struct MeNode {
    pub id: ID,
    pub username: String,
    pub is_superuser: bool,
    pub tier: Option<Tier>,
    pub groups: Vec<Tier>,
}

impl MeNode {
    pub fn new(user: &CurrentUser, tier: Option<crate::roles::Tier>) -> Self {
        Self {
            id: id_of(user.user_id),
            username: user.username.clone(),
            is_superuser: user.is_superuser,
            tier: tier.map(Into::into),
            groups: user.groups.iter().copied().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
#[graphql(name = "Category")]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    pub id: ID,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<category::Model> for CategoryNode {
    fn from(model: category::Model) -> Self {
        Self {
            id: id_of(model.id),
            name: model.name,
            description: model.description,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
#[graphql(name = "Service")]
#[serde(rename_all = "camelCase")]
pub struct ServiceNode {
    pub id: ID,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub tariff_type: TariffType,
    pub category_id: Option<ID>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<service::Model> for ServiceNode {
    fn from(model: service::Model) -> Self {
        Self {
            id: id_of(model.id),
            name: model.name,
            description: model.description,
            price: from_cents(model.price_cents),
            tariff_type: model.tariff_type.into(),
            category_id: model.category_id.map(id_of),
            is_active: model.is_active,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
#[graphql(name = "Contact")]
#[serde(rename_all = "camelCase")]
pub struct ContactNode {
    pub id: ID,
    pub civility: Civility,
    pub last_name: String,
    pub first_name: String,
    pub birth_date: NaiveDate,
    pub email: String,
    pub phone: String,
    pub source: Option<LeadSource>,
    pub notes: Option<String>,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub owner_id: Option<ID>,
    pub relation_tier: RelationTier,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<individual_contact::Model> for ContactNode {
    fn from(model: individual_contact::Model) -> Self {
        Self {
            id: id_of(model.id),
            civility: model.civility.into(),
            last_name: model.last_name,
            first_name: model.first_name,
            birth_date: model.birth_date,
            email: model.email,
            phone: model.phone,
            source: model.source.map(Into::into),
            notes: model.notes,
            address: model.address,
            city: model.city,
            postal_code: model.postal_code,
            country: model.country,
            owner_id: model.owner_id.map(id_of),
            relation_tier: model.relation_tier.into(),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
#[graphql(name = "Company")]
#[serde(rename_all = "camelCase")]
pub struct CompanyNode {
    pub id: ID,
    pub legal_name: String,
    pub registration_id: String,
    pub legal_form: LegalForm,
    pub sector: Sector,
    pub email: String,
    pub phone: String,
    pub website: Option<String>,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub primary_contact_id: Option<ID>,
    pub headcount: Option<Headcount>,
    pub source: Option<LeadSource>,
    pub notes: Option<String>,
    pub owner_id: Option<ID>,
    pub account_tier: RelationTier,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<company::Model> for CompanyNode {
    fn from(model: company::Model) -> Self {
        Self {
            id: id_of(model.id),
            legal_name: model.legal_name,
            registration_id: model.registration_id,
            legal_form: model.legal_form.into(),
            sector: model.sector.into(),
            email: model.email,
            phone: model.phone,
            website: model.website,
            address: model.address,
            city: model.city,
            postal_code: model.postal_code,
            country: model.country,
            primary_contact_id: model.primary_contact_id.map(id_of),
            headcount: model.headcount.map(Into::into),
            source: model.source.map(Into::into),
            notes: model.notes,
            owner_id: model.owner_id.map(id_of),
            account_tier: model.account_tier.into(),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
#[graphql(name = "Opportunity")]
#[serde(rename_all = "camelCase")]
pub struct OpportunityNode {
    pub id: ID,
    pub name: String,
    pub description: Option<String>,
    pub status: OpportunityStatus,
    pub amount: Option<Decimal>,
    pub owner_id: Option<ID>,
    pub individual_id: Option<ID>,
    pub company_id: Option<ID>,
    pub service_id: Option<ID>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<opportunity::Model> for OpportunityNode {
    fn from(model: opportunity::Model) -> Self {
        Self {
            id: id_of(model.id),
            name: model.name,
            description: model.description,
            status: model.status.into(),
            amount: model.amount_cents.map(from_cents),
            owner_id: model.owner_id.map(id_of),
            individual_id: model.individual_id.map(id_of),
            company_id: model.company_id.map(id_of),
            service_id: model.service_id.map(id_of),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
#[graphql(name = "FilterField")]
#[serde(rename_all = "camelCase")]
pub struct FilterFieldNode {
    pub key: String,
    pub kind: FilterKind,
    pub min_tier: Option<Tier>,
}

impl From<FilterField> for FilterFieldNode {
    fn from(field: FilterField) -> Self {
        Self {
            key: field.key.to_string(),
            kind: field.kind.into(),
            min_tier: field.min_tier.map(Into::into),
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
#[graphql(concrete(name = "CategoryPage", params(CategoryNode)))]
#[graphql(concrete(name = "ServicePage", params(ServiceNode)))]
#[graphql(concrete(name = "ContactPage", params(ContactNode)))]
#[graphql(concrete(name = "CompanyPage", params(CompanyNode)))]
#[graphql(concrete(name = "OpportunityPage", params(OpportunityNode)))]
#[serde(rename_all = "camelCase")]
pub struct PageNode<T: OutputType> {
    pub items: Vec<T>,
    pub total: u64,
    pub filters: Vec<FilterFieldNode>,
    pub can_see_owner: bool,
}

impl<M, T> From<Listing<M>> for PageNode<T>
where
    T: OutputType + From<M>,
{
    fn from(listing: Listing<M>) -> Self {
        let listing = listing.map(T::from);
        Self {
            items: listing.items,
            total: listing.total,
            filters: listing.filters.into_iter().map(Into::into).collect(),
            can_see_owner: listing.can_see_owner,
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
#[graphql(name = "StatusCount")]
#[serde(rename_all = "camelCase")]
pub struct StatusCountNode {
    pub status: OpportunityStatus,
    pub count: u64,
    pub color: String,
}

impl From<StatusCount> for StatusCountNode {
    fn from(row: StatusCount) -> Self {
        Self {
            status: row.status.into(),
            count: row.count,
            color: row.color.to_string(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
#[graphql(name = "SalesCount")]
#[serde(rename_all = "camelCase")]
pub struct SalesCountNode {
    pub label: Option<String>,
    pub sale_count: u64,
}

impl From<SalesCount> for SalesCountNode {
    fn from(row: SalesCount) -> Self {
        Self {
            label: row.label,
            sale_count: row.sale_count,
        }
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
#[graphql(name = "Dashboard")]
#[serde(rename_all = "camelCase")]
pub struct DashboardNode {
    pub total_count: u64,
    pub pipeline_total: Decimal,
    pub revenue_total: Decimal,
    pub conversion_rate: Decimal,
    pub status_breakdown: Vec<StatusCountNode>,
    pub recent: Vec<OpportunityNode>,
    pub client_count: u64,
    pub manager_view: bool,
    pub is_administrator: bool,
    pub services_sold: Vec<SalesCountNode>,
    pub services_sold_by_category: Vec<SalesCountNode>,
}

impl From<Dashboard> for DashboardNode {
    fn from(dashboard: Dashboard) -> Self {
        let summary = dashboard.summary;
        Self {
            total_count: summary.total_count,
            pipeline_total: summary.pipeline_total,
            revenue_total: summary.revenue_total,
            conversion_rate: summary.conversion_rate,
            status_breakdown: summary.status_breakdown.into_iter().map(Into::into).collect(),
            recent: summary.recent.into_iter().map(Into::into).collect(),
            client_count: dashboard.client_count,
            manager_view: dashboard.manager_view,
            is_administrator: dashboard.is_administrator,
            services_sold: dashboard.services_sold.into_iter().map(Into::into).collect(),
            services_sold_by_category: dashboard
                .services_sold_by_category
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct LoginPayload {
    pub token: String,
    pub user: UserNode,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct UserPayload {
    pub user: UserNode,
    /// False when the role group was missing and the user has no group.
    pub group_synced: bool,
}

// ---------------------------------------------------------------------------
// Filter inputs
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, InputObject)]
pub struct DateRangeInput {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

fn range(input: Option<DateRangeInput>) -> (Option<NaiveDate>, Option<NaiveDate>) {
    input.map(|r| (r.from, r.to)).unwrap_or_default()
}

#[derive(Clone, Debug, Default, InputObject)]
pub struct CategoryFilterInput {
    pub name: Option<String>,
    pub created: Option<DateRangeInput>,
    pub updated: Option<DateRangeInput>,
}

impl From<CategoryFilterInput> for CategoryFilter {
    fn from(input: CategoryFilterInput) -> Self {
        let (created_from, created_to) = range(input.created);
        let (updated_from, updated_to) = range(input.updated);
        Self {
            name: input.name,
            created_from,
            created_to,
            updated_from,
            updated_to,
        }
    }
}

#[derive(Clone, Debug, Default, InputObject)]
pub struct ServiceFilterInput {
    pub name: Option<String>,
    pub category: Option<ID>,
    pub tariff_type: Option<TariffType>,
    pub active: Option<bool>,
    pub created: Option<DateRangeInput>,
    pub updated: Option<DateRangeInput>,
}

impl TryFrom<ServiceFilterInput> for ServiceFilter {
    type Error = ApiError;

    fn try_from(input: ServiceFilterInput) -> ApiResult<Self> {
        let (created_from, created_to) = range(input.created);
        let (updated_from, updated_to) = range(input.updated);
        Ok(Self {
            name: input.name,
            category: parse_ref("category", input.category.as_ref())?,
            tariff_type: input.tariff_type.map(Into::into),
            active: input.active,
            created_from,
            created_to,
            updated_from,
            updated_to,
        })
    }
}

#[derive(Clone, Debug, Default, InputObject)]
pub struct ContactFilterInput {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub civility: Option<Civility>,
    pub relation: Option<RelationTier>,
    pub owner: Option<ID>,
    pub created: Option<DateRangeInput>,
    pub updated: Option<DateRangeInput>,
}

impl TryFrom<ContactFilterInput> for ContactFilter {
    type Error = ApiError;

    fn try_from(input: ContactFilterInput) -> ApiResult<Self> {
        let (created_from, created_to) = range(input.created);
        let (updated_from, updated_to) = range(input.updated);
        Ok(Self {
            last_name: input.last_name,
            first_name: input.first_name,
            civility: input.civility.map(Into::into),
            relation: input.relation.map(Into::into),
            owner: parse_ref("owner", input.owner.as_ref())?,
            created_from,
            created_to,
            updated_from,
            updated_to,
        })
    }
}

#[derive(Clone, Debug, Default, InputObject)]
pub struct CompanyFilterInput {
    pub legal_name: Option<String>,
    pub registration_id: Option<String>,
    pub legal_form: Option<LegalForm>,
    pub sector: Option<Sector>,
    pub account_tier: Option<RelationTier>,
    pub headcount: Option<Headcount>,
    pub owner: Option<ID>,
    pub created: Option<DateRangeInput>,
    pub updated: Option<DateRangeInput>,
}

impl TryFrom<CompanyFilterInput> for CompanyFilter {
    type Error = ApiError;

    fn try_from(input: CompanyFilterInput) -> ApiResult<Self> {
        let (created_from, created_to) = range(input.created);
        let (updated_from, updated_to) = range(input.updated);
        Ok(Self {
            legal_name: input.legal_name,
            registration_id: input.registration_id,
            legal_form: input.legal_form.map(Into::into),
            sector: input.sector.map(Into::into),
            account_tier: input.account_tier.map(Into::into),
            headcount: input.headcount.map(Into::into),
            owner: parse_ref("owner", input.owner.as_ref())?,
            created_from,
            created_to,
            updated_from,
            updated_to,
        })
    }
}

#[derive(Clone, Debug, Default, InputObject)]
pub struct OpportunityFilterInput {
    pub name: Option<String>,
    pub status: Option<OpportunityStatus>,
    pub owner: Option<ID>,
    pub individual: Option<ID>,
    pub company: Option<ID>,
    pub service: Option<ID>,
    pub created: Option<DateRangeInput>,
    pub updated: Option<DateRangeInput>,
}

impl TryFrom<OpportunityFilterInput> for OpportunityFilter {
    type Error = ApiError;

    fn try_from(input: OpportunityFilterInput) -> ApiResult<Self> {
        let (created_from, created_to) = range(input.created);
        let (updated_from, updated_to) = range(input.updated);
        Ok(Self {
            name: input.name,
            status: input.status.map(Into::into),
            owner: parse_ref("owner", input.owner.as_ref())?,
            individual: parse_ref("individual", input.individual.as_ref())?,
            company: parse_ref("company", input.company.as_ref())?,
            service: parse_ref("service", input.service.as_ref())?,
            created_from,
            created_to,
            updated_from,
            updated_to,
        })
    }
}

// ---------------------------------------------------------------------------
// Record inputs
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, InputObject)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
}

impl From<CategoryInput> for CategoryDraft {
    fn from(input: CategoryInput) -> Self {
        Self {
            name: input.name,
            description: input.description,
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct ServiceInput {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub tariff_type: TariffType,
    pub category_id: Option<ID>,
    #[graphql(default = true)]
    pub is_active: bool,
}

impl TryFrom<ServiceInput> for ServiceDraft {
    type Error = ApiError;

    fn try_from(input: ServiceInput) -> ApiResult<Self> {
        Ok(Self {
            name: input.name,
            description: input.description,
            price: input.price,
            tariff_type: input.tariff_type.into(),
            category_id: parse_ref("category_id", input.category_id.as_ref())?,
            is_active: input.is_active,
        })
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct ContactInput {
    pub civility: Civility,
    pub last_name: String,
    pub first_name: String,
    pub birth_date: NaiveDate,
    pub email: String,
    pub phone: String,
    pub source: Option<LeadSource>,
    pub notes: Option<String>,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl From<ContactInput> for ContactDraft {
    fn from(input: ContactInput) -> Self {
        Self {
            civility: input.civility.into(),
            last_name: input.last_name,
            first_name: input.first_name,
            birth_date: input.birth_date,
            email: input.email,
            phone: input.phone,
            source: input.source.map(Into::into),
            notes: input.notes,
            address: input.address,
            city: input.city,
            postal_code: input.postal_code,
            country: input.country,
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct CompanyInput {
    pub legal_name: String,
    pub registration_id: String,
    pub legal_form: LegalForm,
    pub sector: Sector,
    pub email: String,
    pub phone: String,
    pub website: Option<String>,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub primary_contact_id: Option<ID>,
    pub headcount: Option<Headcount>,
    pub source: Option<LeadSource>,
    pub notes: Option<String>,
}

impl TryFrom<CompanyInput> for CompanyDraft {
    type Error = ApiError;

    fn try_from(input: CompanyInput) -> ApiResult<Self> {
        Ok(Self {
            primary_contact_id: parse_ref("primary_contact_id", input.primary_contact_id.as_ref())?,
            legal_name: input.legal_name,
            registration_id: input.registration_id,
            legal_form: input.legal_form.into(),
            sector: input.sector.into(),
            email: input.email,
            phone: input.phone,
            website: input.website,
            address: input.address,
            city: input.city,
            postal_code: input.postal_code,
            country: input.country,
            headcount: input.headcount.map(Into::into),
            source: input.source.map(Into::into),
            notes: input.notes,
        })
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct OpportunityInput {
    pub name: String,
    pub description: Option<String>,
    pub status: OpportunityStatus,
    pub amount: Option<Decimal>,
    pub individual_id: Option<ID>,
    pub company_id: Option<ID>,
    pub service_id: Option<ID>,
}

impl TryFrom<OpportunityInput> for OpportunityDraft {
    type Error = ApiError;

    fn try_from(input: OpportunityInput) -> ApiResult<Self> {
        Ok(Self {
            individual_id: parse_ref("individual_id", input.individual_id.as_ref())?,
            company_id: parse_ref("company_id", input.company_id.as_ref())?,
            service_id: parse_ref("service_id", input.service_id.as_ref())?,
            name: input.name,
            description: input.description,
            status: input.status.into(),
            amount: input.amount,
        })
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct NewUserInput {
    pub username: String,
    pub password: String,
    #[graphql(default)]
    pub first_name: String,
    #[graphql(default)]
    pub last_name: String,
    pub email: Option<String>,
    pub role: UserRole,
    #[graphql(default)]
    pub is_superuser: bool,
}

impl From<NewUserInput> for crate::users::NewUser {
    fn from(input: NewUserInput) -> Self {
        Self {
            username: input.username,
            password: input.password,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            role: input.role.into(),
            is_superuser: input.is_superuser,
        }
    }
}
