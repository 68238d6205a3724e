use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{LeadSource, RelationTier};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "company")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub legal_name: String,
    /// National company identifier, exactly fifteen digits.
    #[sea_orm(unique)]
    pub registration_id: String,
    pub legal_form: LegalForm,
    pub sector: Sector,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub phone: String,
    pub website: Option<String>,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub primary_contact_id: Option<Uuid>,
    pub headcount: Option<Headcount>,
    pub source: Option<LeadSource>,
    pub notes: Option<String>,
    #[sea_orm(indexed)]
    pub owner_id: Option<Uuid>,
    pub account_tier: RelationTier,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Owner,
    #[sea_orm(
        belongs_to = "super::individual_contact::Entity",
        from = "Column::PrimaryContactId",
        to = "super::individual_contact::Column::Id",
        on_delete = "SetNull"
    )]
    PrimaryContact,
    #[sea_orm(has_many = "super::opportunity::Entity")]
    Opportunity,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::opportunity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Opportunity.def()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
pub enum LegalForm {
    #[sea_orm(string_value = "SARL")]
    #[serde(rename = "SARL")]
    Sarl,
    #[sea_orm(string_value = "EURL")]
    #[serde(rename = "EURL")]
    Eurl,
    #[sea_orm(string_value = "SAS")]
    #[serde(rename = "SAS")]
    Sas,
    #[sea_orm(string_value = "SASU")]
    #[serde(rename = "SASU")]
    Sasu,
    #[sea_orm(string_value = "SA")]
    #[serde(rename = "SA")]
    Sa,
    #[sea_orm(string_value = "SNC")]
    #[serde(rename = "SNC")]
    Snc,
    #[sea_orm(string_value = "SCS")]
    #[serde(rename = "SCS")]
    Scs,
    #[sea_orm(string_value = "SCA")]
    #[serde(rename = "SCA")]
    Sca,
    #[sea_orm(string_value = "GIE")]
    #[serde(rename = "GIE")]
    Gie,
    #[sea_orm(string_value = "MICRO")]
    #[serde(rename = "MICRO")]
    MicroEnterprise,
    #[sea_orm(string_value = "ASSOCIATION")]
    #[serde(rename = "ASSOCIATION")]
    Association,
    #[sea_orm(string_value = "COOPERATIVE")]
    #[serde(rename = "COOPERATIVE")]
    Cooperative,
    #[sea_orm(string_value = "SCI")]
    #[serde(rename = "SCI")]
    Sci,
    #[sea_orm(string_value = "SCP")]
    #[serde(rename = "SCP")]
    Scp,
    #[sea_orm(string_value = "AUTO_ENTREPRENEUR")]
    #[serde(rename = "AUTO_ENTREPRENEUR")]
    AutoEntrepreneur,
    #[sea_orm(string_value = "OTHER")]
    #[serde(rename = "OTHER")]
    Other,
}

/// Activity section from the national nomenclature.
#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(1))")]
pub enum Sector {
    #[sea_orm(string_value = "A")]
    A,
    #[sea_orm(string_value = "B")]
    B,
    #[sea_orm(string_value = "C")]
    C,
    #[sea_orm(string_value = "D")]
    D,
    #[sea_orm(string_value = "E")]
    E,
    #[sea_orm(string_value = "F")]
    F,
    #[sea_orm(string_value = "G")]
    G,
    #[sea_orm(string_value = "H")]
    H,
    #[sea_orm(string_value = "I")]
    I,
    #[sea_orm(string_value = "J")]
    J,
    #[sea_orm(string_value = "K")]
    K,
    #[sea_orm(string_value = "L")]
    L,
    #[sea_orm(string_value = "M")]
    M,
    #[sea_orm(string_value = "N")]
    N,
    #[sea_orm(string_value = "O")]
    O,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(Some(10))")]
#[serde(rename_all = "snake_case")]
pub enum Headcount {
    #[sea_orm(string_value = "micro")]
    Micro,
    #[sea_orm(string_value = "small")]
    Small,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "large")]
    Large,
}

impl ActiveModelBehavior for ActiveModel {}
