use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{LeadSource, RelationTier};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "individual_contact")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub civility: Civility,
    #[sea_orm(indexed)]
    pub last_name: String,
    pub first_name: String,
    pub birth_date: Date,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub phone: String,
    pub source: Option<LeadSource>,
    pub notes: Option<String>,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    #[sea_orm(indexed)]
    pub owner_id: Option<Uuid>,
    pub relation_tier: RelationTier,
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
#[sea_orm(rs_type = "String", db_type = "String(Some(8))")]
#[serde(rename_all = "snake_case")]
pub enum Civility {
    #[sea_orm(string_value = "mr")]
    Mr,
    #[sea_orm(string_value = "mrs")]
    Mrs,
}

impl ActiveModelBehavior for ActiveModel {}
