//! Filter vocabulary and list-filter conditions.
//!
//! Which filter parameters a principal may use is a static table keyed by
//! entity and tier. Parameters outside the caller's vocabulary are dropped
//! before any condition is built, so a commercial user cannot express an
//! owner filter at all.

use std::{fmt::Display, str::FromStr};

use chrono::{NaiveDate, NaiveTime};
use entity::{category, company, individual_contact, opportunity, service, RelationTier};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{ColumnTrait, Condition, Value};
use serde::de::{self, DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::roles::Tier;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Category,
    Service,
    IndividualContact,
    Company,
    Opportunity,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Text,
    Choice,
    Boolean,
    DateRange,
    Reference,
    Owner,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FilterField {
    pub key: &'static str,
    pub kind: FilterKind,
    /// Lowest tier allowed to use the field; `None` means any signed-in user.
    pub min_tier: Option<Tier>,
}

const fn field(key: &'static str, kind: FilterKind, min_tier: Option<Tier>) -> FilterField {
    FilterField {
        key,
        kind,
        min_tier,
    }
}

const ANY: Option<Tier> = None;
const MANAGER: Option<Tier> = Some(Tier::Manager);
const ADMIN: Option<Tier> = Some(Tier::Administrator);

const CATEGORY_FIELDS: &[FilterField] = &[
    field("name", FilterKind::Text, ANY),
    field("created", FilterKind::DateRange, ADMIN),
    field("updated", FilterKind::DateRange, ADMIN),
];

const SERVICE_FIELDS: &[FilterField] = &[
    field("name", FilterKind::Text, ANY),
    field("category", FilterKind::Reference, ANY),
    field("tariff_type", FilterKind::Choice, ANY),
    field("active", FilterKind::Boolean, ANY),
    field("created", FilterKind::DateRange, ADMIN),
    field("updated", FilterKind::DateRange, ADMIN),
];

const CONTACT_FIELDS: &[FilterField] = &[
    field("last_name", FilterKind::Text, ANY),
    field("first_name", FilterKind::Text, ANY),
    field("civility", FilterKind::Choice, ANY),
    field("relation", FilterKind::Choice, ANY),
    field("owner", FilterKind::Owner, MANAGER),
    field("created", FilterKind::DateRange, ANY),
    field("updated", FilterKind::DateRange, ANY),
];

const COMPANY_FIELDS: &[FilterField] = &[
    field("legal_name", FilterKind::Text, ANY),
    field("registration_id", FilterKind::Text, ANY),
    field("legal_form", FilterKind::Choice, ANY),
    field("sector", FilterKind::Choice, ANY),
    field("account_tier", FilterKind::Choice, ANY),
    field("headcount", FilterKind::Choice, ANY),
    field("owner", FilterKind::Owner, MANAGER),
    field("created", FilterKind::DateRange, ANY),
    field("updated", FilterKind::DateRange, ANY),
];

const OPPORTUNITY_FIELDS: &[FilterField] = &[
    field("name", FilterKind::Text, ANY),
    field("status", FilterKind::Choice, ANY),
    field("owner", FilterKind::Owner, MANAGER),
    field("individual", FilterKind::Reference, ANY),
    field("company", FilterKind::Reference, ANY),
    field("service", FilterKind::Reference, ANY),
    field("created", FilterKind::DateRange, ANY),
    field("updated", FilterKind::DateRange, ANY),
];

fn table(kind: EntityKind) -> &'static [FilterField] {
    match kind {
        EntityKind::Category => CATEGORY_FIELDS,
        EntityKind::Service => SERVICE_FIELDS,
        EntityKind::IndividualContact => CONTACT_FIELDS,
        EntityKind::Company => COMPANY_FIELDS,
        EntityKind::Opportunity => OPPORTUNITY_FIELDS,
    }
}

impl FilterField {
    fn available_to(&self, tier: Option<Tier>) -> bool {
        match self.min_tier {
            None => true,
            Some(min) => tier >= Some(min),
        }
    }
}

/// Filter fields the given tier may use for `kind`.
pub fn filter_vocabulary(kind: EntityKind, tier: Option<Tier>) -> Vec<FilterField> {
    table(kind)
        .iter()
        .filter(|f| f.available_to(tier))
        .copied()
        .collect()
}

pub fn permits(kind: EntityKind, key: &str, tier: Option<Tier>) -> bool {
    table(kind)
        .iter()
        .any(|f| f.key == key && f.available_to(tier))
}

/// A list filter that knows how to narrow its entity's query.
pub trait ListFilter {
    const KIND: EntityKind;

    fn condition(&self, tier: Option<Tier>) -> Condition;
}

/// Accumulates the parameters a tier is permitted to use.
struct Narrowing {
    kind: EntityKind,
    tier: Option<Tier>,
    condition: Condition,
}

impl Narrowing {
    fn new(kind: EntityKind, tier: Option<Tier>) -> Self {
        Self {
            kind,
            tier,
            condition: Condition::all(),
        }
    }

    fn allowed(&self, key: &str) -> bool {
        let ok = permits(self.kind, key, self.tier);
        if !ok {
            debug!(entity = ?self.kind, key, "filter parameter outside vocabulary ignored");
        }
        ok
    }

    fn text<C>(mut self, key: &str, column: C, value: Option<&String>) -> Self
    where
        C: ColumnTrait,
    {
        let Some(value) = value.map(|v| v.trim()).filter(|v| !v.is_empty()) else {
            return self;
        };
        if self.allowed(key) {
            let pattern = format!("%{}%", escape_like(&value.to_lowercase()));
            let lowered = Expr::expr(Func::lower(Expr::col(column)));
            self.condition = self
                .condition
                .add(lowered.like(LikeExpr::new(pattern).escape('\\')));
        }
        self
    }

    fn exact<C, V>(mut self, key: &str, column: C, value: Option<V>) -> Self
    where
        C: ColumnTrait,
        V: Into<Value>,
    {
        let Some(value) = value else {
            return self;
        };
        if self.allowed(key) {
            self.condition = self.condition.add(column.eq(value));
        }
        self
    }

    fn date_range<C>(mut self, key: &str, column: C, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self
    where
        C: ColumnTrait,
    {
        if from.is_none() && to.is_none() {
            return self;
        }
        if !self.allowed(key) {
            return self;
        }
        if let Some(from) = from {
            self.condition = self.condition.add(column.gte(start_of_day(from)));
        }
        // Inclusive upper bound: everything before the next midnight.
        if let Some(next) = to.and_then(|to| to.succ_opt()) {
            self.condition = self.condition.add(column.lt(start_of_day(next)));
        }
        self
    }

    fn finish(self) -> Condition {
        self.condition
    }
}

/// Makes LIKE metacharacters in user input match literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn start_of_day(date: NaiveDate) -> DateTimeWithTimeZone {
    date.and_time(NaiveTime::MIN).and_utc().into()
}

/// Blank query-string values mean "no filter".
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => {
            let de: de::value::StrDeserializer<'_, D::Error> = value.into_deserializer();
            T::deserialize(de).map(Some)
        }
    }
}

fn parsed_or_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

/// Accepts `true/false`, `1/0`, `yes/no`, `on/off`; blank means unset.
fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
    }
    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Bool(value)) => Ok(Some(value)),
        Some(Raw::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            other => Err(de::Error::custom(format!("invalid boolean `{other}`"))),
        },
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CategoryFilter {
    pub name: Option<String>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub created_from: Option<NaiveDate>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub created_to: Option<NaiveDate>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub updated_from: Option<NaiveDate>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub updated_to: Option<NaiveDate>,
}

impl ListFilter for CategoryFilter {
    const KIND: EntityKind = EntityKind::Category;

    fn condition(&self, tier: Option<Tier>) -> Condition {
        Narrowing::new(Self::KIND, tier)
            .text("name", category::Column::Name, self.name.as_ref())
            .date_range("created", category::Column::CreatedAt, self.created_from, self.created_to)
            .date_range("updated", category::Column::UpdatedAt, self.updated_from, self.updated_to)
            .finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServiceFilter {
    pub name: Option<String>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub category: Option<Uuid>,
    #[serde(deserialize_with = "blank_as_none")]
    pub tariff_type: Option<service::TariffType>,
    #[serde(deserialize_with = "flag")]
    pub active: Option<bool>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub created_from: Option<NaiveDate>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub created_to: Option<NaiveDate>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub updated_from: Option<NaiveDate>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub updated_to: Option<NaiveDate>,
}

impl ListFilter for ServiceFilter {
    const KIND: EntityKind = EntityKind::Service;

    fn condition(&self, tier: Option<Tier>) -> Condition {
        Narrowing::new(Self::KIND, tier)
            .text("name", service::Column::Name, self.name.as_ref())
            .exact("category", service::Column::CategoryId, self.category)
            .exact("tariff_type", service::Column::TariffType, self.tariff_type)
            .exact("active", service::Column::IsActive, self.active)
            .date_range("created", service::Column::CreatedAt, self.created_from, self.created_to)
            .date_range("updated", service::Column::UpdatedAt, self.updated_from, self.updated_to)
            .finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactFilter {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub civility: Option<individual_contact::Civility>,
    #[serde(deserialize_with = "blank_as_none")]
    pub relation: Option<RelationTier>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub owner: Option<Uuid>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub created_from: Option<NaiveDate>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub created_to: Option<NaiveDate>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub updated_from: Option<NaiveDate>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub updated_to: Option<NaiveDate>,
}

impl ListFilter for ContactFilter {
    const KIND: EntityKind = EntityKind::IndividualContact;

    fn condition(&self, tier: Option<Tier>) -> Condition {
        use individual_contact::Column;
        Narrowing::new(Self::KIND, tier)
            .text("last_name", Column::LastName, self.last_name.as_ref())
            .text("first_name", Column::FirstName, self.first_name.as_ref())
            .exact("civility", Column::Civility, self.civility)
            .exact("relation", Column::RelationTier, self.relation)
            .exact("owner", Column::OwnerId, self.owner)
            .date_range("created", Column::CreatedAt, self.created_from, self.created_to)
            .date_range("updated", Column::UpdatedAt, self.updated_from, self.updated_to)
            .finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompanyFilter {
    pub legal_name: Option<String>,
    pub registration_id: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub legal_form: Option<company::LegalForm>,
    #[serde(deserialize_with = "blank_as_none")]
    pub sector: Option<company::Sector>,
    #[serde(deserialize_with = "blank_as_none")]
    pub account_tier: Option<RelationTier>,
    #[serde(deserialize_with = "blank_as_none")]
    pub headcount: Option<company::Headcount>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub owner: Option<Uuid>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub created_from: Option<NaiveDate>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub created_to: Option<NaiveDate>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub updated_from: Option<NaiveDate>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub updated_to: Option<NaiveDate>,
}

impl ListFilter for CompanyFilter {
    const KIND: EntityKind = EntityKind::Company;

    fn condition(&self, tier: Option<Tier>) -> Condition {
        use company::Column;
        Narrowing::new(Self::KIND, tier)
            .text("legal_name", Column::LegalName, self.legal_name.as_ref())
            .text("registration_id", Column::RegistrationId, self.registration_id.as_ref())
            .exact("legal_form", Column::LegalForm, self.legal_form)
            .exact("sector", Column::Sector, self.sector)
            .exact("account_tier", Column::AccountTier, self.account_tier)
            .exact("headcount", Column::Headcount, self.headcount)
            .exact("owner", Column::OwnerId, self.owner)
            .date_range("created", Column::CreatedAt, self.created_from, self.created_to)
            .date_range("updated", Column::UpdatedAt, self.updated_from, self.updated_to)
            .finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OpportunityFilter {
    pub name: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub status: Option<opportunity::Status>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub owner: Option<Uuid>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub individual: Option<Uuid>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub company: Option<Uuid>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub service: Option<Uuid>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub created_from: Option<NaiveDate>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub created_to: Option<NaiveDate>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub updated_from: Option<NaiveDate>,
    #[serde(deserialize_with = "parsed_or_none")]
    pub updated_to: Option<NaiveDate>,
}

impl ListFilter for OpportunityFilter {
    const KIND: EntityKind = EntityKind::Opportunity;

    fn condition(&self, tier: Option<Tier>) -> Condition {
        use opportunity::Column;
        Narrowing::new(Self::KIND, tier)
            .text("name", Column::Name, self.name.as_ref())
            .exact("status", Column::Status, self.status)
            .exact("owner", Column::OwnerId, self.owner)
            .exact("individual", Column::IndividualId, self.individual)
            .exact("company", Column::CompanyId, self.company)
            .exact("service", Column::ServiceId, self.service)
            .date_range("created", Column::CreatedAt, self.created_from, self.created_to)
            .date_range("updated", Column::UpdatedAt, self.updated_from, self.updated_to)
            .finish()
    }
}
